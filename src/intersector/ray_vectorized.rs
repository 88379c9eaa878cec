use simba::simd::{SimdBool as _, SimdValue as _};

use super::IntersectorConfig;
use crate::{
    filter::{FilterDecision, GeometryLookup, QueryKind},
    geometry::ray_triangle_intersection::{RayLanes, ScaledHit, intersect as intersect_lanes},
    ray_packet::RayPacket,
    triangle_block::TriangleBlock,
    util::{bit_iter, simba::SimdLanes},
};

/// Geometric test and ray mask test of all `valid` lanes against a single triangle.
#[inline(always)]
fn test_triangle<R: SimdLanes, T: SimdLanes>(
    config: &IntersectorConfig,
    valid: R::SimdBool,
    packet: &RayPacket<R>,
    block: &TriangleBlock<T>,
    lane: usize,
) -> Option<ScaledHit<R>> {
    let triangle = block.broadcast::<R>(lane);
    let ray = RayLanes {
        origin: &packet.origin,
        direction: &packet.direction,
        tnear: packet.tnear,
        tfar: packet.tfar,
    };
    let mut hit = intersect_lanes(valid, &ray, &triangle.lanes(), config.backface_culling)?;

    if config.ray_mask {
        hit.valid = hit.valid & R::ints_overlap(packet.mask, R::ints_splat(block.mask(lane)));
        if !hit.valid.any() {
            return None;
        }
    }

    Some(hit)
}

/// Runs the filter of the triangle's geometry on every lane of `lanes`
/// and returns the lanes that were accepted.
fn filter_lanes<R: SimdLanes, T: SimdLanes>(
    kind: QueryKind,
    lanes: R::SimdBool,
    packet: &RayPacket<R>,
    block: &TriangleBlock<T>,
    lane: usize,
    hit: &ScaledHit<R>,
    geometry: &impl GeometryLookup,
) -> R::SimdBool {
    let (t, uv) = hit.finish();
    let geom_id = block.geom_id(lane);
    let mut accepted = lanes;
    for ray_lane in bit_iter(lanes.bitmask()) {
        let candidate = block.hit(lane, t.extract(ray_lane), uv.extract(ray_lane));
        if geometry.run_filter(kind, geom_id, &packet.ray(ray_lane), &candidate)
            == FilterDecision::Reject
        {
            log::trace!(
                "{kind:?} filter of geometry {geom_id:?} rejected primitive {} for lane {ray_lane}",
                candidate.prim_id
            );
            accepted = accepted & !R::mask_from_bits(1 << ray_lane);
        }
    }
    accepted
}

pub fn intersect<R: SimdLanes, T: SimdLanes, G: GeometryLookup>(
    config: &IntersectorConfig,
    valid: R::SimdBool,
    packet: &mut RayPacket<R>,
    block: &TriangleBlock<T>,
    geometry: &G,
) {
    for lane in bit_iter(block.valid_bits()) {
        let Some(hit) = test_triangle(config, valid, packet, block, lane) else {
            continue;
        };

        let (t, uv) = hit.finish();
        // Rounding in the division must not move the hit past the current one.
        let mut accepted = hit.valid & t.simd_le(packet.tfar);
        if !accepted.any() {
            continue;
        }

        let geom_id = block.geom_id(lane);
        if config.filters && geometry.has_filter(QueryKind::Intersect, geom_id) {
            accepted = filter_lanes(
                QueryKind::Intersect,
                accepted,
                packet,
                block,
                lane,
                &hit,
                geometry,
            );
            if !accepted.any() {
                continue;
            }
        }

        packet.commit(
            accepted,
            t,
            uv,
            &block.normal(lane),
            geom_id.raw(),
            block.prim_id(lane),
        );
    }
}

pub fn occluded<R: SimdLanes, T: SimdLanes, G: GeometryLookup>(
    config: &IntersectorConfig,
    valid: R::SimdBool,
    packet: &RayPacket<R>,
    block: &TriangleBlock<T>,
    geometry: &G,
) -> R::SimdBool {
    // Lanes that are still looking for an occluder
    let mut pending = valid;

    for lane in bit_iter(block.valid_bits()) {
        let Some(hit) = test_triangle(config, pending, packet, block, lane) else {
            continue;
        };

        let mut occluded = hit.valid;
        let geom_id = block.geom_id(lane);
        if config.filters && geometry.has_filter(QueryKind::Occlude, geom_id) {
            occluded = filter_lanes(
                QueryKind::Occlude,
                occluded,
                packet,
                block,
                lane,
                &hit,
                geometry,
            );
        }

        pending = pending & !occluded;
        if !pending.any() {
            break;
        }
    }

    valid & !pending
}
