use std::ops::{Add, Index, Mul, Sub};

use num_traits::One;
use simba::simd::SimdValue;

use super::{WorldPoint, WorldVector};

/// Three vertices. The front face is the one where they appear counter-clockwise.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle<Point>([Point; 3]);

impl<Point> Triangle<Point> {
    pub fn new(a: Point, b: Point, c: Point) -> Triangle<Point> {
        Triangle([a, b, c])
    }

    pub fn map<Point2>(&self, mut f: impl FnMut(&Point) -> Point2) -> Triangle<Point2> {
        let [a, b, c] = &self.0;
        Triangle([f(a), f(b), f(c)])
    }
}

impl<Point> Index<usize> for Triangle<Point> {
    type Output = Point;

    fn index(&self, index: usize) -> &Point {
        &self.0[index]
    }
}

impl Triangle<WorldPoint> {
    /// Edges going from vertex 0 to vertices 1 and 2.
    pub fn edges(&self) -> [WorldVector; 2] {
        let [v0, v1, v2] = &self.0;
        [v1 - v0, v2 - v0]
    }

    /// Normal pointing out of the front face, with length equal to twice the area.
    pub fn normal(&self) -> WorldVector {
        let [e1, e2] = self.edges();
        e1.cross(&e2)
    }
}

/// Position on a triangle, `u` is the weight of vertex 1, `v` the weight of vertex 2.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BarycentricCoordinates<T> {
    pub u: T,
    pub v: T,
}

impl<T> BarycentricCoordinates<T> {
    fn map<U>(&self, f: impl Fn(&T) -> U) -> BarycentricCoordinates<U> {
        BarycentricCoordinates {
            u: f(&self.u),
            v: f(&self.v),
        }
    }
}

impl<T: Copy + One + Sub<Output = T>> BarycentricCoordinates<T> {
    /// Weight of vertex 0.
    pub fn w(&self) -> T {
        T::one() - self.u - self.v
    }

    /// Blends per-vertex values.
    pub fn interpolate_triangle<V>(&self, values: &Triangle<V>) -> V
    where
        V: Copy + Add<Output = V> + Mul<T, Output = V>,
    {
        values[0] * self.w() + values[1] * self.u + values[2] * self.v
    }
}

impl<T: SimdValue> SimdValue for BarycentricCoordinates<T> {
    const LANES: usize = T::LANES;
    type Element = BarycentricCoordinates<T::Element>;
    type SimdBool = T::SimdBool;

    fn splat(val: Self::Element) -> Self {
        BarycentricCoordinates {
            u: T::splat(val.u),
            v: T::splat(val.v),
        }
    }

    fn extract(&self, i: usize) -> Self::Element {
        self.map(|x| x.extract(i))
    }

    unsafe fn extract_unchecked(&self, i: usize) -> Self::Element {
        self.map(|x| unsafe { x.extract_unchecked(i) })
    }

    fn replace(&mut self, i: usize, val: Self::Element) {
        let BarycentricCoordinates { u, v } = val;
        self.u.replace(i, u);
        self.v.replace(i, v);
    }

    unsafe fn replace_unchecked(&mut self, i: usize, val: Self::Element) {
        let BarycentricCoordinates { u, v } = val;
        unsafe {
            self.u.replace_unchecked(i, u);
            self.v.replace_unchecked(i, v);
        }
    }

    fn select(self, cond: Self::SimdBool, other: Self) -> Self {
        BarycentricCoordinates {
            u: self.u.select(cond, other.u),
            v: self.v.select(cond, other.v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;
    use simba::simd::WideF32x4;

    fn unit_triangle() -> Triangle<WorldPoint> {
        Triangle::new(
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldPoint::new(1.0, 0.0, 0.0),
            WorldPoint::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn edges_start_at_first_vertex() {
        let [e1, e2] = unit_triangle().edges();
        assert!(e1 == WorldVector::new(1.0, 0.0, 0.0));
        assert!(e2 == WorldVector::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn normal_follows_winding() {
        let triangle = unit_triangle();
        assert!(triangle.normal() == WorldVector::new(0.0, 0.0, 1.0));

        let flipped = Triangle::new(triangle[0], triangle[2], triangle[1]);
        assert!(flipped.normal() == WorldVector::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn interpolate_vertices() {
        let triangle = unit_triangle().map(|p| p.coords);
        let uv = BarycentricCoordinates { u: 0.25f32, v: 0.5 };

        assert!(uv.w() == 0.25);
        assert!(uv.interpolate_triangle(&triangle) == WorldVector::new(0.25, 0.5, 0.0));
    }

    #[test]
    fn lanes_are_independent() {
        let mut uv = BarycentricCoordinates::<WideF32x4>::splat(BarycentricCoordinates {
            u: 0.1,
            v: 0.2,
        });
        uv.replace(2, BarycentricCoordinates { u: 0.7, v: 0.3 });

        assert!(uv.extract(0) == BarycentricCoordinates { u: 0.1, v: 0.2 });
        assert!(uv.extract(2) == BarycentricCoordinates { u: 0.7, v: 0.3 });
    }
}
