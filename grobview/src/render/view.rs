//! Viewports and the combined view/projection pipeline
use nalgebra::{Matrix4, Perspective3, Point2, Point3, Vector2};
use serde::{Deserialize, Serialize};

use super::{Camera, Gpu};

/// Integer rectangle in window coordinates
///
/// Window coordinates have their origin at the bottom-left corner, with `+Y`
/// pointing up (matching the GPU's convention).
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
pub struct Viewport {
    /// Left edge
    pub x: i32,
    /// Bottom edge
    pub y: i32,
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
}

impl Viewport {
    /// Builds a new viewport
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns `width / height`, or 1 for a degenerate viewport
    pub fn aspect_ratio(&self) -> f32 {
        if self.height <= 0 || self.width <= 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Returns the viewport's center, in window coordinates
    pub fn center(&self) -> Point2<f32> {
        Point2::new(
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    /// Checks whether a point (in window coordinates) is inside the viewport
    pub fn contains(&self, p: Point2<f32>) -> bool {
        p.x >= self.x as f32
            && p.y >= self.y as f32
            && p.x < (self.x + self.width) as f32
            && p.y < (self.y + self.height) as f32
    }
}

/// Everything needed to turn world coordinates into pixels
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct View {
    camera: Camera,
    viewport: Viewport,
    clip: Vector2<f32>,
    fov: f32,
}

impl View {
    /// Builds a view
    ///
    /// `clip` holds the near and far clip distances; `fov` is the vertical
    /// field of view in radians.
    pub fn new(
        camera: Camera,
        viewport: Viewport,
        clip: Vector2<f32>,
        fov: f32,
    ) -> Self {
        Self {
            camera,
            viewport,
            clip,
            fov,
        }
    }

    /// Returns the camera
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Returns the camera, mutably
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Returns the viewport
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Sets the viewport
    pub fn set_viewport(&mut self, vp: Viewport) {
        self.viewport = vp;
    }

    /// Returns the near and far clip distances
    pub fn clip(&self) -> Vector2<f32> {
        self.clip
    }

    /// Sets the near and far clip distances
    pub fn set_clip(&mut self, clip: Vector2<f32>) {
        self.clip = clip;
    }

    /// Returns the vertical field of view, in radians
    pub fn fov(&self) -> f32 {
        self.fov
    }

    /// Returns the eye-to-clip transform
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Perspective3::new(
            self.viewport.aspect_ratio(),
            self.fov,
            self.clip.x,
            self.clip.y,
        )
        .to_homogeneous()
    }

    /// Returns the combined world-to-clip transform
    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.camera.view_matrix()
    }

    /// Maps a world-space point into window coordinates
    ///
    /// The returned `z` is the depth, in `[0, 1]` between the clip planes.
    pub fn project(&self, p: &Point3<f32>) -> Point3<f32> {
        let ndc = self.view_projection().transform_point(p);
        let vp = &self.viewport;
        Point3::new(
            vp.x as f32 + (ndc.x + 1.0) / 2.0 * vp.width as f32,
            vp.y as f32 + (ndc.y + 1.0) / 2.0 * vp.height as f32,
            (ndc.z + 1.0) / 2.0,
        )
    }

    /// Maps a point in window coordinates (plus depth) back into world space
    ///
    /// Returns `None` if the view is degenerate.
    pub fn unproject(&self, p: &Point3<f32>) -> Option<Point3<f32>> {
        let vp = &self.viewport;
        let ndc = Point3::new(
            (p.x - vp.x as f32) / vp.width as f32 * 2.0 - 1.0,
            (p.y - vp.y as f32) / vp.height as f32 * 2.0 - 1.0,
            p.z * 2.0 - 1.0,
        );
        let inv = self.view_projection().try_inverse()?;
        Some(inv.transform_point(&ndc))
    }

    /// Reads the depth buffer under a pixel
    ///
    /// Returns `None` if the pixel is outside the viewport or the GPU can't
    /// read it back.
    pub fn depth_at_screen_coord(
        &self,
        gpu: &mut dyn Gpu,
        p: Point2<i32>,
    ) -> Option<f32> {
        if !self.viewport.contains(p.cast()) {
            return None;
        }
        gpu.read_depth(p.x, p.y)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::render::gpu::recording::RecordingGpu;
    use approx::assert_relative_eq;
    use nalgebra::{UnitQuaternion, Vector3};

    fn view() -> View {
        let camera = Camera::new(
            Vector3::new(4.0, 4.0, 4.0),
            UnitQuaternion::from_euler_angles(0.3, -0.2, 0.1),
            Vector3::new(0.5, 0.0, -1.0),
        );
        View::new(
            camera,
            Viewport::new(10, 20, 640, 480),
            Vector2::new(0.1, 100.0),
            std::f32::consts::FRAC_PI_4,
        )
    }

    #[test]
    fn test_viewport() {
        let vp = Viewport::new(10, 20, 640, 480);
        assert_relative_eq!(vp.aspect_ratio(), 4.0 / 3.0);
        assert_eq!(vp.center(), Point2::new(330.0, 260.0));
        assert!(vp.contains(Point2::new(10.0, 20.0)));
        assert!(!vp.contains(Point2::new(650.0, 20.0)));
        assert_eq!(Viewport::default().aspect_ratio(), 1.0);
    }

    #[test]
    fn test_target_projects_to_center() {
        let v = view();
        let p = v.project(&v.camera().to());
        assert_relative_eq!(p.x, 330.0, epsilon = 1e-3);
        assert_relative_eq!(p.y, 260.0, epsilon = 1e-3);
        assert!(p.z > 0.0 && p.z < 1.0);
    }

    #[test]
    fn test_project_unproject() {
        let v = view();
        for p in [
            Point3::new(10.0, 20.0, 0.0),
            Point3::new(330.0, 260.0, 0.5),
            Point3::new(600.0, 100.0, 0.9),
            Point3::new(649.0, 499.0, 0.25),
        ] {
            let world = v.unproject(&p).unwrap();
            let back = v.project(&world);
            assert_relative_eq!(back, p, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_depth_at_screen_coord() {
        let v = view();
        let mut gpu = RecordingGpu {
            depth: Some(0.5),
            ..Default::default()
        };
        assert_eq!(v.depth_at_screen_coord(&mut gpu, Point2::new(0, 0)), None);
        assert_eq!(
            v.depth_at_screen_coord(&mut gpu, Point2::new(100, 100)),
            Some(0.5)
        );
        assert_eq!(gpu.calls, ["read_depth 100 100"]);
    }
}
