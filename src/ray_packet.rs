use assert2::debug_assert;
use simba::simd::{SimdBool as _, SimdValue as _};
use thiserror::Error;

use crate::{
    filter::GeomId,
    geometry::{
        BarycentricCoordinates, FloatType, Ray, SimdPoint, SimdVector, WorldPoint, WorldVector,
    },
    util::{low_bits, simba::SimdLanes},
};

/// Raw id stored in lanes without an assigned geometry or primitive.
pub const INVALID_ID: u32 = u32::MAX;

/// Closest hit found for one ray.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Hit {
    /// Distance along the ray, in multiples of the direction length.
    pub t: FloatType,
    pub uv: BarycentricCoordinates<FloatType>,
    /// Geometric normal of the triangle, not normalized.
    pub ng: WorldVector,
    pub geom_id: GeomId,
    pub prim_id: u32,
}

/// Per-lane hit records of a ray packet. The distance is the packet's `tfar`.
#[derive(Copy, Clone, Debug)]
pub struct HitPacket<R: SimdLanes> {
    pub uv: BarycentricCoordinates<R>,
    pub ng: SimdVector<R>,
    /// [`INVALID_ID`] in lanes that didn't hit anything yet.
    pub geom_id: R::Ints,
    pub prim_id: R::Ints,
}

impl<R: SimdLanes> HitPacket<R> {
    fn miss() -> Self {
        HitPacket {
            uv: BarycentricCoordinates {
                u: R::splat(0.0),
                v: R::splat(0.0),
            },
            ng: SimdVector::splat(WorldVector::zeros()),
            geom_id: R::ints_splat(INVALID_ID),
            prim_id: R::ints_splat(INVALID_ID),
        }
    }
}

/// Batch of rays traced together, one ray per lane.
#[derive(Copy, Clone, Debug)]
pub struct RayPacket<R: SimdLanes> {
    pub origin: SimdPoint<R>,
    pub direction: SimdVector<R>,
    pub tnear: R,
    /// Only ever decreases while intersecting.
    pub tfar: R,
    pub mask: R::Ints,
    pub hit: HitPacket<R>,
}

impl<R: SimdLanes> RayPacket<R> {
    pub const CAPACITY: usize = R::LANES;

    /// Packet with the same ray in every lane.
    pub fn splat(ray: Ray) -> Self {
        RayPacket {
            origin: SimdPoint::splat(ray.origin),
            direction: SimdVector::splat(ray.direction),
            tnear: R::splat(ray.tnear),
            tfar: R::splat(ray.tfar),
            mask: R::ints_splat(ray.mask),
            hit: HitPacket::miss(),
        }
    }

    /// Packet with the given rays in the first lanes.
    /// Remaining lanes get an empty distance interval, so they never hit anything.
    pub fn new(rays: &[Ray]) -> Result<Self, PacketError> {
        if rays.len() > Self::CAPACITY {
            return Err(PacketError::TooManyRays {
                count: rays.len(),
                capacity: Self::CAPACITY,
            });
        }

        let unused = Ray::new(WorldPoint::origin(), WorldVector::z())
            .with_interval(FloatType::INFINITY, FloatType::NEG_INFINITY);
        let mut packet = Self::splat(unused);
        for (lane, ray) in rays.iter().enumerate() {
            packet.origin.replace(lane, ray.origin);
            packet.direction.replace(lane, ray.direction);
            packet.tnear.replace(lane, ray.tnear);
            packet.tfar.replace(lane, ray.tfar);
            R::ints_replace(&mut packet.mask, lane, ray.mask);
        }
        Ok(packet)
    }

    /// Mask of the first `count` lanes, to be used as a valid mask for the kernels.
    pub fn lanes(count: usize) -> R::SimdBool {
        R::mask_from_bits(low_bits(count))
    }

    /// Extracts the ray in a lane, with its current distance interval.
    pub fn ray(&self, lane: usize) -> Ray {
        debug_assert!(lane < Self::CAPACITY);
        Ray {
            origin: self.origin.extract(lane),
            direction: self.direction.extract(lane),
            tnear: self.tnear.extract(lane),
            tfar: self.tfar.extract(lane),
            mask: R::ints_extract(&self.mask, lane),
        }
    }

    pub fn tfar(&self, lane: usize) -> FloatType {
        self.tfar.extract(lane)
    }

    /// Closest hit committed so far in a lane, `None` if the lane hasn't hit anything.
    pub fn hit(&self, lane: usize) -> Option<Hit> {
        debug_assert!(lane < Self::CAPACITY);
        let geom_id = R::ints_extract(&self.hit.geom_id, lane);
        if geom_id == INVALID_ID {
            return None;
        }
        Some(Hit {
            t: self.tfar.extract(lane),
            uv: self.hit.uv.extract(lane),
            ng: self.hit.ng.extract(lane),
            geom_id: GeomId::from_raw(geom_id),
            prim_id: R::ints_extract(&self.hit.prim_id, lane),
        })
    }

    /// Stores a hit with a single triangle into all `lanes`.
    #[inline(always)]
    pub(crate) fn commit(
        &mut self,
        lanes: R::SimdBool,
        t: R,
        uv: BarycentricCoordinates<R>,
        ng: &WorldVector,
        geom_id: u32,
        prim_id: u32,
    ) {
        debug_assert!((t.simd_le(self.tfar) | !lanes).all());
        self.tfar = t.select(lanes, self.tfar);
        self.hit.uv = uv.select(lanes, self.hit.uv);
        self.hit.ng = SimdVector::splat(*ng).select(lanes, self.hit.ng);
        self.hit.geom_id = R::ints_select(lanes, R::ints_splat(geom_id), self.hit.geom_id);
        self.hit.prim_id = R::ints_select(lanes, R::ints_splat(prim_id), self.hit.prim_id);
    }

    /// Stores a hit into a single lane.
    pub(crate) fn commit_lane(&mut self, lane: usize, hit: &Hit) {
        debug_assert!(hit.t <= self.tfar.extract(lane));
        self.tfar.replace(lane, hit.t);
        self.hit.uv.replace(lane, hit.uv);
        self.hit.ng.replace(lane, hit.ng);
        R::ints_replace(&mut self.hit.geom_id, lane, hit.geom_id.raw());
        R::ints_replace(&mut self.hit.prim_id, lane, hit.prim_id);
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("Packet of {capacity} lanes can't hold {count} rays")]
    TooManyRays { count: usize, capacity: usize },
}
