//! Interactive editors and the input events which drive them
//!
//! The windowing host translates its native events into calls on an
//! [`EventListener`].  Coordinates are in window pixels with the origin at
//! the bottom-left corner, matching [`Viewport`].
//!
//! [`EguiInput`] does this translation for an `egui` host, which reports
//! positions in points from the top-left corner.
use nalgebra::{Point2, Vector2};

use crate::render::{Gpu, View, Viewport};

mod scene_editor;
pub use scene_editor::SceneEditor;

/// Mouse button identifier
#[derive(Copy, Clone, Debug, Eq, PartialEq, strum::Display)]
pub enum MouseButton {
    /// Primary button
    Left,
    /// Secondary button
    Right,
    /// Middle button (or wheel click)
    Middle,
}

/// What happened to a button or key
#[derive(Copy, Clone, Debug, Eq, PartialEq, strum::Display)]
pub enum Action {
    /// Pressed down
    Press,
    /// Released
    Release,
    /// Held down long enough to auto-repeat
    Repeat,
}

/// Modifier keys held during an event
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Modifiers {
    /// Either Shift key
    pub shift: bool,
    /// Control (or Command, on macOS)
    pub ctrl: bool,
    /// Alt (or Option)
    pub alt: bool,
}

/// Keys which editors respond to
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Key {
    /// The `F` key
    F,
    /// The `R` key
    R,
    /// The Home key
    Home,
    /// The Escape key
    Escape,
    /// Any other key
    Other,
}

/// Receiver for input events from the windowing host
///
/// Every method defaults to ignoring its event.
pub trait EventListener {
    /// A mouse button was pressed or released
    fn mouse_button(
        &mut self,
        _button: MouseButton,
        _action: Action,
        _mods: Modifiers,
    ) {
    }

    /// The cursor moved to a new position (in window coordinates)
    fn mouse_move(&mut self, _pos: Vector2<f32>) {}

    /// The scroll wheel moved; `+Y` scrolls up
    fn mouse_scroll(&mut self, _delta: Vector2<f32>) {}

    /// A key changed state
    fn key(
        &mut self,
        _key: Key,
        _scancode: i32,
        _action: Action,
        _mods: Modifiers,
    ) {
    }

    /// A character was typed
    fn character(&mut self, _c: char) {}

    /// The region of the window owned by this listener changed
    fn set_viewport(&mut self, _viewport: Viewport) {}
}

/// An interactive workspace with its own camera and content
pub trait Editor: EventListener {
    /// Returns a name for display
    fn name(&self) -> &str;

    /// Returns the editor's current view
    fn view(&self) -> &View;

    /// Draws the editor's content into its viewport
    fn render(&mut self, gpu: &mut dyn Gpu);

    /// Draws the editor's toolbar
    fn do_toolbar(&mut self, ui: &mut egui::Ui);

    /// Releases GPU resources; called on the GPU thread before dropping
    fn release(&mut self, _gpu: &mut dyn Gpu) {}
}

/// Translates `egui` input events into [`EventListener`] calls
///
/// `egui` positions are in points, from the top-left of the window; the
/// listener expects pixels from the bottom-left.  The translator keeps the
/// information needed to convert between them.
#[derive(Copy, Clone, Debug)]
pub struct EguiInput {
    pixels_per_point: f32,
    window_height_px: f32,
    /// Scroll distance (in points) which counts as one wheel step
    pub points_per_scroll_step: f32,
}

impl EguiInput {
    /// Builds a translator for a window of the given height (in pixels)
    pub fn new(pixels_per_point: f32, window_height_px: f32) -> Self {
        Self {
            pixels_per_point,
            window_height_px,
            points_per_scroll_step: 50.0,
        }
    }

    /// Converts an `egui` position into window coordinates
    pub fn to_window(&self, pos: egui::Pos2) -> Point2<f32> {
        Point2::new(
            pos.x * self.pixels_per_point,
            self.window_height_px - pos.y * self.pixels_per_point,
        )
    }

    /// Converts an `egui` rectangle into a viewport
    pub fn viewport(&self, rect: egui::Rect) -> Viewport {
        let lo = self.to_window(rect.left_bottom());
        let hi = self.to_window(rect.right_top());
        Viewport::new(
            lo.x.round() as i32,
            lo.y.round() as i32,
            (hi.x - lo.x).round() as i32,
            (hi.y - lo.y).round() as i32,
        )
    }

    /// Forwards every relevant event to the listener
    pub fn forward(
        &self,
        events: &[egui::Event],
        listener: &mut dyn EventListener,
    ) {
        for e in events {
            self.forward_one(e, listener);
        }
    }

    fn forward_one(&self, e: &egui::Event, listener: &mut dyn EventListener) {
        match e {
            egui::Event::PointerMoved(pos) => {
                listener.mouse_move(self.to_window(*pos).coords);
            }
            egui::Event::PointerButton {
                pos,
                button,
                pressed,
                modifiers,
            } => {
                let button = match button {
                    egui::PointerButton::Primary => MouseButton::Left,
                    egui::PointerButton::Secondary => MouseButton::Right,
                    egui::PointerButton::Middle => MouseButton::Middle,
                    _ => return,
                };
                let action = if *pressed {
                    Action::Press
                } else {
                    Action::Release
                };
                listener.mouse_move(self.to_window(*pos).coords);
                listener.mouse_button(button, action, mods(modifiers));
            }
            egui::Event::MouseWheel { unit, delta, .. } => {
                let steps = match unit {
                    egui::MouseWheelUnit::Line => *delta,
                    egui::MouseWheelUnit::Point => {
                        *delta / self.points_per_scroll_step
                    }
                    egui::MouseWheelUnit::Page => *delta * 10.0,
                };
                listener.mouse_scroll(Vector2::new(steps.x, steps.y));
            }
            egui::Event::Key {
                key,
                pressed,
                repeat,
                modifiers,
                ..
            } => {
                let k = match key {
                    egui::Key::F => Key::F,
                    egui::Key::R => Key::R,
                    egui::Key::Home => Key::Home,
                    egui::Key::Escape => Key::Escape,
                    _ => Key::Other,
                };
                let action = match (*pressed, *repeat) {
                    (false, _) => Action::Release,
                    (true, false) => Action::Press,
                    (true, true) => Action::Repeat,
                };
                listener.key(k, 0, action, mods(modifiers));
            }
            egui::Event::Text(s) => {
                for c in s.chars() {
                    listener.character(c);
                }
            }
            _ => (),
        }
    }
}

fn mods(m: &egui::Modifiers) -> Modifiers {
    Modifiers {
        shift: m.shift,
        ctrl: m.ctrl || m.command,
        alt: m.alt,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Default)]
    struct Log(Vec<String>);

    impl EventListener for Log {
        fn mouse_button(&mut self, b: MouseButton, a: Action, m: Modifiers) {
            self.0.push(format!("button {b} {a} {}", m.shift));
        }
        fn mouse_move(&mut self, pos: Vector2<f32>) {
            self.0.push(format!("move {} {}", pos.x, pos.y));
        }
        fn mouse_scroll(&mut self, delta: Vector2<f32>) {
            self.0.push(format!("scroll {}", delta.y));
        }
        fn key(&mut self, key: Key, _s: i32, a: Action, _m: Modifiers) {
            self.0.push(format!("key {key:?} {a}"));
        }
        fn character(&mut self, c: char) {
            self.0.push(format!("char {c}"));
        }
    }

    #[test]
    fn test_coordinate_flip() {
        let input = EguiInput::new(2.0, 600.0);
        assert_eq!(
            input.to_window(egui::pos2(0.0, 0.0)),
            Point2::new(0.0, 600.0)
        );
        assert_eq!(
            input.to_window(egui::pos2(10.0, 300.0)),
            Point2::new(20.0, 0.0)
        );
        let vp = input.viewport(egui::Rect::from_min_max(
            egui::pos2(10.0, 20.0),
            egui::pos2(110.0, 270.0),
        ));
        assert_eq!(vp, Viewport::new(20, 60, 200, 500));
    }

    #[test]
    fn test_forward_events() {
        let input = EguiInput::new(1.0, 100.0);
        let mut log = Log::default();
        input.forward(
            &[
                egui::Event::PointerMoved(egui::pos2(5.0, 10.0)),
                egui::Event::PointerButton {
                    pos: egui::pos2(5.0, 10.0),
                    button: egui::PointerButton::Primary,
                    pressed: true,
                    modifiers: egui::Modifiers::SHIFT,
                },
                egui::Event::MouseWheel {
                    unit: egui::MouseWheelUnit::Line,
                    delta: egui::vec2(0.0, 2.0),
                    modifiers: egui::Modifiers::NONE,
                },
                egui::Event::Text("hi".to_owned()),
                egui::Event::Copy,
            ],
            &mut log,
        );
        assert_eq!(
            log.0,
            [
                "move 5 90",
                "move 5 90",
                "button Left Press true",
                "scroll 2",
                "char h",
                "char i",
            ]
        );
    }
}
