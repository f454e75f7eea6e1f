//! Orbiting camera
use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::BoundingBox;

/// Camera which looks at a target point from a scaled distance
///
/// The camera is built from three parts: a per-axis `scale`, a `rotation`,
/// and a `translation`.  The translation is the point being looked at;
/// the eye sits at `translation - forward ∘ scale`, so the scale acts as a
/// per-axis distance from the target.
///
/// ```
/// # use grobview::render::Camera;
/// # use nalgebra::{Point3, Vector3};
/// let c = Camera::default();
/// assert_eq!(c.forward(), Vector3::new(0.0, 0.0, -1.0));
/// assert_eq!(c.from(), Point3::new(0.0, 0.0, 1.0));
/// assert_eq!(c.to(), Point3::origin());
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    scale: Vector3<f32>,
    rotation: UnitQuaternion<f32>,
    translation: Vector3<f32>,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            scale: Vector3::new(1.0, 1.0, 1.0),
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }
}

/// Renormalizes a quaternion, discarding accumulated drift
fn renormalize(q: UnitQuaternion<f32>) -> UnitQuaternion<f32> {
    UnitQuaternion::new_normalize(q.into_inner())
}

impl Camera {
    /// Builds a camera from its components
    pub fn new(
        scale: Vector3<f32>,
        rotation: UnitQuaternion<f32>,
        translation: Vector3<f32>,
    ) -> Self {
        Self {
            scale,
            rotation: renormalize(rotation),
            translation,
        }
    }

    /// Returns the per-axis scale
    pub fn scale(&self) -> Vector3<f32> {
        self.scale
    }

    /// Sets the per-axis scale
    pub fn set_scale(&mut self, scale: Vector3<f32>) {
        self.scale = scale;
    }

    /// Returns the rotation
    pub fn rotation(&self) -> UnitQuaternion<f32> {
        self.rotation
    }

    /// Sets the rotation
    pub fn set_rotation(&mut self, q: UnitQuaternion<f32>) {
        self.rotation = renormalize(q);
    }

    /// Applies an additional rotation on top of the current one
    pub fn rotate(&mut self, q: UnitQuaternion<f32>) {
        self.rotation = renormalize(q * self.rotation);
    }

    /// Returns the translation (i.e. the look-at target)
    pub fn translation(&self) -> Vector3<f32> {
        self.translation
    }

    /// Sets the translation
    pub fn set_translation(&mut self, t: Vector3<f32>) {
        self.translation = t;
    }

    /// Moves the camera and its target by the given offset
    pub fn translate(&mut self, dt: Vector3<f32>) {
        self.translation += dt;
    }

    /// Multiplies the scale by the given factor
    ///
    /// Factors below 1 move the eye closer to the target.
    pub fn zoom(&mut self, amount: f32) {
        self.scale *= amount;
    }

    /// Returns the camera's local `+X` axis in world space
    pub fn right(&self) -> Vector3<f32> {
        self.rotation * Vector3::x()
    }

    /// Returns the camera's local `+Y` axis in world space
    pub fn up(&self) -> Vector3<f32> {
        self.rotation * Vector3::y()
    }

    /// Returns the viewing direction (the camera's local `-Z` axis)
    pub fn forward(&self) -> Vector3<f32> {
        self.rotation * -Vector3::z()
    }

    /// Returns the eye position
    pub fn from(&self) -> Point3<f32> {
        let offset = self.forward().component_mul(&self.scale);
        Point3::from(self.translation - offset)
    }

    /// Returns the look-at target
    pub fn to(&self) -> Point3<f32> {
        Point3::from(self.translation)
    }

    /// Returns the world-to-eye transform
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.from(), &self.to(), &self.up())
    }

    /// Centers the camera on a bounding box, keeping the current rotation
    ///
    /// The eye distance is chosen so that the whole box fits in a view with
    /// the given vertical field of view (in radians).
    pub fn frame(&mut self, bbox: &BoundingBox, fov: f32) {
        let radius = (bbox.diagonal() / 2.0).max(f32::EPSILON);
        let distance = radius / (fov / 2.0).sin().max(f32::EPSILON);
        self.translation = bbox.center().coords;
        self.scale = Vector3::repeat(distance);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_basis_follows_rotation() {
        let mut c = Camera::default();
        c.set_rotation(UnitQuaternion::from_euler_angles(
            0.0,
            std::f32::consts::FRAC_PI_2,
            0.0,
        ));
        // A quarter turn about +Y takes -Z to -X
        assert_relative_eq!(c.forward(), -Vector3::x(), epsilon = 1e-6);
        assert_relative_eq!(c.up(), Vector3::y(), epsilon = 1e-6);
        assert_relative_eq!(c.right(), -Vector3::z(), epsilon = 1e-6);
    }

    #[test]
    fn test_eye_position() {
        let c = Camera::new(
            Vector3::new(2.0, 2.0, 5.0),
            UnitQuaternion::identity(),
            Vector3::new(1.0, 0.0, 0.0),
        );
        assert_eq!(c.from(), Point3::new(1.0, 0.0, 5.0));
        assert_eq!(c.to(), Point3::new(1.0, 0.0, 0.0));

        // The target lands on the eye's -Z axis
        let p = c.view_matrix().transform_point(&c.to());
        assert_relative_eq!(p, Point3::new(0.0, 0.0, -5.0), epsilon = 1e-6);
    }

    #[test]
    fn test_rotation_stays_unit() {
        let mut c = Camera::default();
        let step = UnitQuaternion::from_euler_angles(0.013, 0.029, -0.007);
        for _ in 0..10_000 {
            c.rotate(step);
        }
        assert!((c.rotation().norm() - 1.0).abs() < 1e-5);

        c.set_rotation(UnitQuaternion::new_unchecked(
            nalgebra::Quaternion::new(2.0, 0.0, 0.0, 0.0),
        ));
        assert!((c.rotation().norm() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_frame() {
        let mut c = Camera::default();
        let b = BoundingBox::new(
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(3.0, 1.0, 1.0),
        );
        c.frame(&b, std::f32::consts::FRAC_PI_2);
        assert_eq!(c.to(), Point3::new(1.0, 0.0, 0.0));
        let d = (c.from() - c.to()).norm();
        assert!(d > b.diagonal() / 2.0);
    }
}
