//! Ray-triangle test shared by both vectorization orientations.
//!
//! Modified Möller-Trumbore: the triangle is stored as vertex 0, both edges and the
//! unnormalized geometric normal, so the cross product of the edges is precomputed.
//! Every rejection is a multiply and compare in the domain scaled by the determinant,
//! the division happens only for candidates that survived all stages.

use simba::simd::SimdBool as _;

use super::{BarycentricCoordinates, SimdPoint, SimdVector};
use crate::util::simba::{SimdLanes, fma_dot};

/// Triangle data, one triangle per lane.
/// Either a real block, or one triangle broadcast over a ray packet.
pub struct TriangleLanes<'a, T: SimdLanes> {
    pub v0: &'a SimdPoint<T>,
    pub e1: &'a SimdVector<T>,
    pub e2: &'a SimdVector<T>,
    pub ng: &'a SimdVector<T>,
}

/// Ray data, one ray per lane.
/// Either a real packet, or one ray broadcast over a triangle block.
pub struct RayLanes<'a, T: SimdLanes> {
    pub origin: &'a SimdPoint<T>,
    pub direction: &'a SimdVector<T>,
    pub tnear: T,
    pub tfar: T,
}

/// Lanes that passed the geometric test, with the hit still scaled by `abs_den`.
#[derive(Copy, Clone, Debug)]
pub struct ScaledHit<T: SimdLanes> {
    pub valid: T::SimdBool,
    u: T,
    v: T,
    t: T,
    abs_den: T,
}

impl<T: SimdLanes> ScaledHit<T> {
    /// Performs the deferred division.
    #[inline(always)]
    pub fn finish(&self) -> (T, BarycentricCoordinates<T>) {
        let rcp_abs_den = T::splat(1.0) / self.abs_den;
        (
            self.t * rcp_abs_den,
            BarycentricCoordinates {
                u: self.u * rcp_abs_den,
                v: self.v * rcp_abs_den,
            },
        )
    }
}

/// Runs the geometric test for all lanes in `valid`.
/// Returns `None` as soon as no lane survives a stage.
#[inline(always)]
pub fn intersect<T: SimdLanes>(
    valid: T::SimdBool,
    ray: &RayLanes<T>,
    triangle: &TriangleLanes<T>,
    backface_culling: bool,
) -> Option<ScaledHit<T>> {
    let zero = T::splat(0.0);

    // The determinant is positive when the ray hits the side `ng` is pointing to.
    let c = ray.origin - triangle.v0;
    let r = c.cross(ray.direction);
    let den = -fma_dot(triangle.ng, ray.direction);
    let sign = den.sign_bit();
    let abs_den = den.flip_sign(sign);

    // Test against edge v2 v0
    let u = fma_dot(&r, triangle.e2).flip_sign(sign);
    let mut valid = valid & u.simd_ge(zero);
    if !valid.any() {
        return None;
    }

    // Test against edge v0 v1
    let v = (-fma_dot(&r, triangle.e1)).flip_sign(sign);
    valid = valid & v.simd_ge(zero);
    if !valid.any() {
        return None;
    }

    // Test against edge v1 v2
    let w = abs_den - u - v;
    valid = valid & w.simd_ge(zero);
    if !valid.any() {
        return None;
    }

    // Depth test, done scaled so that the division can wait
    let t = fma_dot(triangle.ng, &c).flip_sign(sign);
    valid = valid & t.simd_ge(abs_den * ray.tnear) & t.simd_lt(abs_den * ray.tfar);
    if !valid.any() {
        return None;
    }

    // Facing. This also rejects rays parallel to the triangle plane before anything divides.
    valid = valid
        & if backface_culling {
            den.simd_gt(zero)
        } else {
            den.simd_ne(zero)
        };
    if !valid.any() {
        return None;
    }

    Some(ScaledHit {
        valid,
        u,
        v,
        t,
        abs_den,
    })
}
