pub(crate) mod ray_triangle_intersection;
mod triangle;

use nalgebra::{Point3, Vector3};

pub use triangle::{BarycentricCoordinates, Triangle};

pub type FloatType = f32;

pub type WorldPoint = Point3<FloatType>;
pub type WorldVector = Vector3<FloatType>;

/// Point with one coordinate set per SIMD lane.
pub type SimdPoint<T> = Point3<T>;
/// Vector with one coordinate set per SIMD lane.
pub type SimdVector<T> = Vector3<T>;

/// A single ray, as seen by intersection filters and extracted from a packet lane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    pub origin: WorldPoint,
    /// Direction of the ray, doesn't need to be normalized.
    /// Distances are measured in multiples of its length.
    pub direction: WorldVector,

    /// Lower bound of the valid distance interval, fixed for a query.
    pub tnear: FloatType,
    /// Upper bound of the valid distance interval, shrinks as closer hits are found.
    pub tfar: FloatType,

    /// Visibility mask, a triangle is only considered if `triangle.mask & ray.mask != 0`.
    pub mask: u32,
}

impl Ray {
    pub fn new(origin: WorldPoint, direction: WorldVector) -> Ray {
        Ray {
            origin,
            direction,
            tnear: 0.0,
            tfar: FloatType::INFINITY,
            mask: u32::MAX,
        }
    }

    pub fn with_interval(self, tnear: FloatType, tfar: FloatType) -> Ray {
        Ray {
            tnear,
            tfar,
            ..self
        }
    }

    pub fn with_mask(self, mask: u32) -> Ray {
        Ray { mask, ..self }
    }

    pub fn point_at(&self, distance: FloatType) -> WorldPoint {
        self.origin + self.direction * distance
    }
}
