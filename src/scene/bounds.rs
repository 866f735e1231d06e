//! Axis-aligned bounding boxes in world space.

use glam::{Mat4, Vec3};

/// A world-space axis-aligned box. Always derived, never stored on objects.
///
/// # Examples
/// ```
/// use glam::{Mat4, Vec3};
/// use thumbkit::scene::BoundingBox;
///
/// let corners = BoundingBox::new(Vec3::ZERO, Vec3::ONE).corners();
/// let moved = BoundingBox::from_corners(Mat4::from_translation(Vec3::X), &corners);
/// assert_eq!(moved.center(), Vec3::new(1.5, 0.5, 0.5));
/// assert_eq!(moved.size(), Vec3::ONE);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Builds the tightest box around `points`, or `None` when there are none.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    /// Transforms eight local-space corners by `world` and boxes the result.
    pub fn from_corners(world: Mat4, corners: &[Vec3; 8]) -> Self {
        let transformed = corners.iter().map(|c| world.transform_point3(*c));
        // Eight corners always yield a box.
        Self::from_points(transformed).unwrap_or(Self::new(Vec3::ZERO, Vec3::ZERO))
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the eight corners, x-major, in the same order a mesh bound box reports them.
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, lo.z),
        ]
    }
}
