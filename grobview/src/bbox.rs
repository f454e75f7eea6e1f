//! Axis-aligned bounding boxes
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in 3D
///
/// A box always contains at least one point; "no bounds" is represented as
/// `Option<BoundingBox>::None` by the functions which produce boxes.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    min: Point3<f32>,
    max: Point3<f32>,
}

impl BoundingBox {
    /// Builds the smallest box containing both corners
    pub fn new(a: Point3<f32>, b: Point3<f32>) -> Self {
        Self {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }

    /// Builds a box which contains a single point
    pub fn from_point(p: Point3<f32>) -> Self {
        Self { min: p, max: p }
    }

    /// Builds the smallest box containing every point, or `None` if the
    /// iterator is empty
    pub fn from_points<I: IntoIterator<Item = Point3<f32>>>(
        pts: I,
    ) -> Option<Self> {
        let mut iter = pts.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self::from_point(first), |b, p| b.extend(p)))
    }

    /// Returns the minimum corner
    pub fn min(&self) -> Point3<f32> {
        self.min
    }

    /// Returns the maximum corner
    pub fn max(&self) -> Point3<f32> {
        self.max
    }

    /// Returns the center of the box
    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Returns the extent of the box along each axis
    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Returns the length of the box's diagonal
    pub fn diagonal(&self) -> f32 {
        self.size().norm()
    }

    /// Returns a box grown to include the given point
    pub fn extend(self, p: Point3<f32>) -> Self {
        Self {
            min: self.min.inf(&p),
            max: self.max.sup(&p),
        }
    }

    /// Returns the smallest box containing both boxes
    pub fn union(&self, other: &BoundingBox) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Checks whether a point is inside the box (boundary included)
    pub fn contains_point(&self, p: &Point3<f32>) -> bool {
        (0..3).all(|i| self.min[i] <= p[i] && p[i] <= self.max[i])
    }

    /// Checks whether another box is entirely inside this one
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.contains_point(&other.min) && self.contains_point(&other.max)
    }
}

/// Merges two optional boxes, treating `None` as empty
pub fn union(
    a: Option<BoundingBox>,
    b: Option<BoundingBox>,
) -> Option<BoundingBox> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(&b)),
        (a, None) => a,
        (None, b) => b,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new_sorts_corners() {
        let b = BoundingBox::new(
            Point3::new(1.0, -1.0, 3.0),
            Point3::new(-1.0, 2.0, 0.0),
        );
        assert_eq!(b.min(), Point3::new(-1.0, -1.0, 0.0));
        assert_eq!(b.max(), Point3::new(1.0, 2.0, 3.0));
        assert_eq!(b.center(), Point3::new(0.0, 0.5, 1.5));
    }

    #[test]
    fn test_from_points() {
        assert!(BoundingBox::from_points(std::iter::empty()).is_none());
        let b = BoundingBox::from_points([
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, -1.0, 0.5),
            Point3::new(1.0, 3.0, -4.0),
        ])
        .unwrap();
        assert_eq!(b.size(), Vector3::new(2.0, 4.0, 4.5));
    }

    #[test]
    fn test_union_contains() {
        let a = BoundingBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let b = BoundingBox::new(
            Point3::new(2.0, 2.0, 2.0),
            Point3::new(3.0, 3.0, 3.0),
        );
        let u = a.union(&b);
        assert!(u.contains(&a));
        assert!(u.contains(&b));
        assert!(!a.contains(&b));
        assert_eq!(union(None, None), None);
        assert_eq!(union(Some(a), None), Some(a));
        assert_eq!(union(None, Some(b)), Some(b));
    }
}
