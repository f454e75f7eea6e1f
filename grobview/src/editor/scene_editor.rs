use log::debug;
use nalgebra::{Point2, Vector2, Vector3};

use super::{Action, Editor, EventListener, Key, Modifiers, MouseButton};
use crate::{
    Config,
    render::{ArcBall, Camera, Gpu, View, Viewport},
    scene::Node,
};

/// Editor which shows a scene tree through an orbiting camera
///
/// - Left drag rotates the scene with an [`ArcBall`]
/// - Right drag pans
/// - Scrolling zooms
/// - `F` frames the whole scene; Home resets the view
pub struct SceneEditor {
    root: Node,
    view: View,
    arcball: ArcBall,
    cursor: Point2<f32>,
    pan: Option<Point2<f32>>,
    background: [f32; 4],
}

impl SceneEditor {
    /// Builds an editor with an empty scene
    pub fn new(config: &Config) -> Self {
        let viewport = Viewport::default();
        Self {
            root: Node::new("Scene"),
            view: View::new(
                Camera::default(),
                viewport,
                config.clip,
                config.fov,
            ),
            arcball: ArcBall::new(viewport),
            cursor: Point2::origin(),
            pan: None,
            background: config.background,
        }
    }

    /// Returns the root of the scene tree
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Returns the root of the scene tree, mutably
    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    /// Returns the camera
    pub fn camera(&self) -> &Camera {
        self.view.camera()
    }

    /// Checks whether a drag (rotate or pan) is in progress
    pub fn is_dragging(&self) -> bool {
        self.arcball.is_dragging() || self.pan.is_some()
    }

    /// Points the camera at the whole scene
    ///
    /// Does nothing if the scene is empty.
    pub fn frame_all(&mut self) {
        if let Some(b) = self.root.bounding_box() {
            let fov = self.view.fov();
            self.view.camera_mut().frame(&b, fov);
            debug!("framed scene at {:?}", b.center());
        }
    }

    /// Resets the camera rotation, then frames the scene
    pub fn reset_view(&mut self) {
        *self.view.camera_mut() = Camera::default();
        self.arcball.end_drag();
        self.arcball.set_rotation(nalgebra::UnitQuaternion::identity());
        self.frame_all();
    }

    /// Returns the world-space distance covered by one pixel at the target
    fn pixel_size(&self) -> f32 {
        let height = self.view.viewport().height.max(1) as f32;
        let distance = self.view.camera().scale().z;
        2.0 * distance * (self.view.fov() / 2.0).tan() / height
    }

    /// Draws the scene tree panel
    pub fn do_scene_panel(&mut self, ui: &mut egui::Ui) {
        self.root.do_imgui(ui);
    }
}

impl EventListener for SceneEditor {
    fn mouse_button(
        &mut self,
        button: MouseButton,
        action: Action,
        _mods: Modifiers,
    ) {
        let inside = self.view.viewport().contains(self.cursor);
        match (button, action) {
            (MouseButton::Left, Action::Press) if inside => {
                self.arcball
                    .set_rotation(self.view.camera().rotation().inverse());
                self.arcball.begin_drag(self.cursor);
            }
            (MouseButton::Left, Action::Release) => self.arcball.end_drag(),
            (MouseButton::Right, Action::Press) if inside => {
                self.pan = Some(self.cursor);
            }
            (MouseButton::Right, Action::Release) => self.pan = None,
            _ => (),
        }
    }

    fn mouse_move(&mut self, pos: Vector2<f32>) {
        self.cursor = Point2::from(pos);
        if self.arcball.drag_to(self.cursor) {
            let q = self.arcball.rotation().inverse();
            self.view.camera_mut().set_rotation(q);
        }
        if let Some(prev) = self.pan {
            let d = (self.cursor - prev) * self.pixel_size();
            let camera = self.view.camera_mut();
            let dt: Vector3<f32> = camera.right() * -d.x + camera.up() * -d.y;
            camera.translate(dt);
            self.pan = Some(self.cursor);
        }
    }

    fn mouse_scroll(&mut self, delta: Vector2<f32>) {
        if delta.y != 0.0 {
            self.view.camera_mut().zoom(0.9f32.powf(delta.y));
        }
    }

    fn key(
        &mut self,
        key: Key,
        _scancode: i32,
        action: Action,
        _mods: Modifiers,
    ) {
        if action != Action::Press {
            return;
        }
        match key {
            Key::F => self.frame_all(),
            Key::Home => self.reset_view(),
            Key::Escape => {
                self.arcball.end_drag();
                self.pan = None;
            }
            _ => (),
        }
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.view.set_viewport(viewport);
        self.arcball.set_viewport(viewport);
    }
}

impl Editor for SceneEditor {
    fn name(&self) -> &str {
        "Scene"
    }

    fn view(&self) -> &View {
        &self.view
    }

    fn render(&mut self, gpu: &mut dyn Gpu) {
        gpu.set_depth_test(true);
        gpu.clear(Some(self.background), true);
        self.root.render(&self.view, gpu);
        gpu.set_depth_test(false);
    }

    fn do_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Frame all").on_hover_text("F").clicked() {
                self.frame_all();
            }
            if ui.button("Reset view").on_hover_text("Home").clicked() {
                self.reset_view();
            }
        });
    }

    fn release(&mut self, gpu: &mut dyn Gpu) {
        self.root.release(gpu);
    }
}
