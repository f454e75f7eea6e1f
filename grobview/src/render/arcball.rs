//! Sphere-projection rotation controller
use nalgebra::{Point2, UnitQuaternion, Vector3};

use super::Viewport;

/// Turns mouse drags into rotations
///
/// Points are projected onto a unit sphere inscribed in the viewport (points
/// outside the sphere land on its silhouette), and each drag segment becomes
/// the rotation between the projected start and end points.  The rotation is
/// relative to the one held when the drag began, so the result doesn't
/// depend on how many intermediate mouse events arrive.
#[derive(Copy, Clone, Debug)]
pub struct ArcBall {
    viewport: Viewport,
    rotation: UnitQuaternion<f32>,
    drag: Option<Drag>,
}

#[derive(Copy, Clone, Debug)]
struct Drag {
    start: Vector3<f32>,
    initial: UnitQuaternion<f32>,
}

impl ArcBall {
    /// Builds an arcball for the given viewport, with no rotation
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            rotation: UnitQuaternion::identity(),
            drag: None,
        }
    }

    /// Updates the viewport (e.g. when the window is resized)
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Returns the accumulated rotation
    pub fn rotation(&self) -> UnitQuaternion<f32> {
        self.rotation
    }

    /// Overrides the accumulated rotation
    pub fn set_rotation(&mut self, q: UnitQuaternion<f32>) {
        self.rotation = UnitQuaternion::new_normalize(q.into_inner());
        if let Some(d) = &mut self.drag {
            d.initial = self.rotation;
        }
    }

    /// Checks whether a drag is in progress
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Projects a window-space point onto the arcball sphere
    fn project(&self, p: Point2<f32>) -> Vector3<f32> {
        let vp = &self.viewport;
        let r = 0.5 * vp.width.min(vp.height).max(1) as f32;
        let v = (p - vp.center()) / r;
        let d2 = v.norm_squared();
        if d2 <= 1.0 {
            Vector3::new(v.x, v.y, (1.0 - d2).sqrt())
        } else {
            let v = v / d2.sqrt();
            Vector3::new(v.x, v.y, 0.0)
        }
    }

    /// Starts a drag at the given point
    pub fn begin_drag(&mut self, p: Point2<f32>) {
        self.drag = Some(Drag {
            start: self.project(p),
            initial: self.rotation,
        });
    }

    /// Continues a drag, returning `true` if the rotation changed
    ///
    /// Does nothing if no drag is in progress.
    pub fn drag_to(&mut self, p: Point2<f32>) -> bool {
        let Some(d) = self.drag else {
            return false;
        };
        let end = self.project(p);
        let delta = UnitQuaternion::rotation_between(&d.start, &end)
            .unwrap_or_else(UnitQuaternion::identity);
        let next =
            UnitQuaternion::new_normalize((delta * d.initial).into_inner());
        let changed = next != self.rotation;
        self.rotation = next;
        changed
    }

    /// Ends the current drag, keeping the accumulated rotation
    pub fn end_drag(&mut self) {
        self.drag = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn ball() -> ArcBall {
        ArcBall::new(Viewport::new(0, 0, 200, 100))
    }

    #[test]
    fn test_projection() {
        let a = ball();
        assert_relative_eq!(a.project(Point2::new(100.0, 50.0)), Vector3::z());
        assert_relative_eq!(a.project(Point2::new(150.0, 50.0)), Vector3::x());
        // Outside the sphere, points land on the silhouette
        assert_relative_eq!(a.project(Point2::new(100.0, 0.0)), -Vector3::y());
        assert_relative_eq!(a.project(Point2::new(200.0, 50.0)), Vector3::x());
    }

    #[test]
    fn test_drag_rotates_about_y() {
        let mut a = ball();
        assert!(!a.drag_to(Point2::new(10.0, 10.0)));
        a.begin_drag(Point2::new(100.0, 50.0));
        assert!(a.is_dragging());
        assert!(a.drag_to(Point2::new(150.0, 50.0)));
        a.end_drag();

        // Dragging from the center to the right edge is a quarter turn
        let q = a.rotation();
        assert_relative_eq!(q * Vector3::z(), Vector3::x(), epsilon = 1e-6);
        let quarter = std::f32::consts::FRAC_PI_2;
        assert_relative_eq!(q.angle(), quarter, epsilon = 1e-5);
    }

    #[test]
    fn test_drag_is_path_independent() {
        let mut a = ball();
        a.begin_drag(Point2::new(90.0, 40.0));
        for i in 0..100 {
            let t = i as f32;
            a.drag_to(Point2::new(90.0 + t * 0.3, 40.0 + t * 0.2));
        }
        a.drag_to(Point2::new(120.0, 60.0));
        let mut b = ball();
        b.begin_drag(Point2::new(90.0, 40.0));
        b.drag_to(Point2::new(120.0, 60.0));
        assert_relative_eq!(a.rotation(), b.rotation(), epsilon = 1e-6);
    }

    #[test]
    fn test_rotation_stays_unit() {
        let mut a = ball();
        for i in 0..1000 {
            let t = i as f32 * 0.1;
            a.begin_drag(Point2::new(100.0 + t.cos() * 20.0, 50.0));
            a.drag_to(Point2::new(100.0, 50.0 + t.sin() * 20.0));
            a.end_drag();
        }
        assert!((a.rotation().norm() - 1.0).abs() < 1e-5);
    }
}
