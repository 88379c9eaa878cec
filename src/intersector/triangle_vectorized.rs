use simba::simd::{SimdBool as _, SimdValue as _};

use super::IntersectorConfig;
use crate::{
    filter::{FilterDecision, GeometryLookup, QueryKind},
    geometry::{
        Ray, SimdPoint, SimdVector,
        ray_triangle_intersection::{RayLanes, ScaledHit, intersect as intersect_lanes},
    },
    ray_packet::RayPacket,
    triangle_block::TriangleBlock,
    util::{bit_iter, simba::SimdLanes},
};

/// Tests the ray against all valid triangles of the block.
/// Returns the bitmask of surviving lanes together with their scaled hits.
#[inline(always)]
fn block_candidates<T: SimdLanes>(
    config: &IntersectorConfig,
    ray: &Ray,
    block: &TriangleBlock<T>,
) -> Option<(u64, ScaledHit<T>)> {
    let origin = SimdPoint::<T>::splat(ray.origin);
    let direction = SimdVector::<T>::splat(ray.direction);
    let lanes = RayLanes {
        origin: &origin,
        direction: &direction,
        tnear: T::splat(ray.tnear),
        tfar: T::splat(ray.tfar),
    };
    let mut hit = intersect_lanes(
        T::mask_from_bits(block.valid_bits()),
        &lanes,
        &block.lanes(),
        config.backface_culling,
    )?;

    if config.ray_mask {
        hit.valid = hit.valid & block.mask_lanes(ray.mask);
    }

    let bits = hit.valid.bitmask();
    (bits != 0).then_some((bits, hit))
}

/// Lane with the smallest `t` among `candidates`, lowest lane on ties.
fn select_min<T: SimdLanes>(candidates: u64, t: T) -> Option<usize> {
    if candidates == 0 {
        return None;
    }
    let masked = t.select(T::mask_from_bits(candidates), T::infinity());
    let min = masked.simd_horizontal_min();
    let ties = masked.simd_eq(T::splat(min)).bitmask() & candidates;
    // Only empty when t is NaN in every candidate lane
    let winners = if ties != 0 { ties } else { candidates };
    Some(winners.trailing_zeros() as usize)
}

/// Offers candidates to the filter nearest first, until one is accepted.
fn first_accepted<T: SimdLanes>(
    kind: QueryKind,
    mut candidates: u64,
    t: T,
    mut accept: impl FnMut(usize) -> FilterDecision,
) -> Option<usize> {
    while let Some(lane) = select_min(candidates, t) {
        match accept(lane) {
            FilterDecision::Accept => return Some(lane),
            FilterDecision::Reject => {
                log::trace!("{kind:?} filter rejected triangle lane {lane}");
                candidates &= !(1 << lane);
            }
        }
    }
    None
}

pub fn intersect<R: SimdLanes, T: SimdLanes, G: GeometryLookup>(
    config: &IntersectorConfig,
    packet: &mut RayPacket<R>,
    lane: usize,
    block: &TriangleBlock<T>,
    geometry: &G,
) {
    let ray = packet.ray(lane);
    let Some((candidates, hit)) = block_candidates(config, &ray, block) else {
        return;
    };

    let (t, uv) = hit.finish();
    // Rounding in the division must not move the hit past the current one.
    let candidates = candidates & t.simd_le(T::splat(ray.tfar)).bitmask();

    let accepted = first_accepted(QueryKind::Intersect, candidates, t, |triangle_lane| {
        let geom_id = block.geom_id(triangle_lane);
        if !config.filters || !geometry.has_filter(QueryKind::Intersect, geom_id) {
            return FilterDecision::Accept;
        }
        let candidate = block.hit(
            triangle_lane,
            t.extract(triangle_lane),
            uv.extract(triangle_lane),
        );
        geometry.run_filter(QueryKind::Intersect, geom_id, &ray, &candidate)
    });

    if let Some(triangle_lane) = accepted {
        let hit = block.hit(
            triangle_lane,
            t.extract(triangle_lane),
            uv.extract(triangle_lane),
        );
        packet.commit_lane(lane, &hit);
    }
}

pub fn occluded<R: SimdLanes, T: SimdLanes, G: GeometryLookup>(
    config: &IntersectorConfig,
    packet: &RayPacket<R>,
    lane: usize,
    block: &TriangleBlock<T>,
    geometry: &G,
) -> bool {
    let ray = packet.ray(lane);
    let Some((candidates, hit)) = block_candidates(config, &ray, block) else {
        return false;
    };

    // Any candidate without an occlusion filter is enough
    if !config.filters
        || bit_iter(candidates).any(|triangle_lane| {
            !geometry.has_filter(QueryKind::Occlude, block.geom_id(triangle_lane))
        })
    {
        return true;
    }

    let (t, uv) = hit.finish();
    first_accepted(QueryKind::Occlude, candidates, t, |triangle_lane| {
        let candidate = block.hit(
            triangle_lane,
            t.extract(triangle_lane),
            uv.extract(triangle_lane),
        );
        geometry.run_filter(QueryKind::Occlude, candidate.geom_id, &ray, &candidate)
    })
    .is_some()
}
