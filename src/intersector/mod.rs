mod ray_vectorized;
mod triangle_vectorized;

use bon::bon;

use crate::{
    filter::GeometryLookup, ray_packet::RayPacket, triangle_block::TriangleBlock,
    util::simba::SimdLanes,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IntersectorConfig {
    /// Only hit triangles from the side their normal points to.
    pub backface_culling: bool,
    /// Skip triangles whose mask doesn't overlap the ray mask.
    pub ray_mask: bool,
    /// Consult geometry filters. When off, every geometric hit is accepted.
    pub filters: bool,
}

#[bon]
impl IntersectorConfig {
    #[builder]
    pub fn new(
        #[builder(default = false)] backface_culling: bool,
        #[builder(default = true)] ray_mask: bool,
        #[builder(default = true)] filters: bool,
    ) -> Self {
        IntersectorConfig {
            backface_culling,
            ray_mask,
            filters,
        }
    }
}

impl Default for IntersectorConfig {
    fn default() -> Self {
        IntersectorConfig::builder().build()
    }
}

/// Stateless entry point for the intersection kernels.
///
/// The `*_packet` queries run the whole packet against one triangle at a time, which suits
/// coherent packets. The `*_one` queries run a single ray of the packet against the whole
/// block at once, which suits incoherent rays. Both give the same results up to rounding.
#[derive(Copy, Clone, Debug, Default)]
pub struct Intersector {
    config: IntersectorConfig,
}

impl Intersector {
    pub fn new(config: IntersectorConfig) -> Intersector {
        log::debug!("Creating intersector with {config:?}");
        Intersector { config }
    }

    pub fn config(&self) -> &IntersectorConfig {
        &self.config
    }

    /// Finds the closest hits of the `valid` lanes of the packet with the block.
    /// Updates `tfar` and the hit record of lanes that found a closer accepted hit.
    pub fn intersect_packet<R: SimdLanes, T: SimdLanes>(
        &self,
        valid: R::SimdBool,
        packet: &mut RayPacket<R>,
        block: &TriangleBlock<T>,
        geometry: &impl GeometryLookup,
    ) {
        ray_vectorized::intersect(&self.config, valid, packet, block, geometry)
    }

    /// Returns the lanes of `valid` that hit an accepted triangle of the block.
    /// Doesn't modify the packet.
    pub fn occluded_packet<R: SimdLanes, T: SimdLanes>(
        &self,
        valid: R::SimdBool,
        packet: &RayPacket<R>,
        block: &TriangleBlock<T>,
        geometry: &impl GeometryLookup,
    ) -> R::SimdBool {
        ray_vectorized::occluded(&self.config, valid, packet, block, geometry)
    }

    /// Finds the closest hit of a single lane of the packet with the block.
    pub fn intersect_one<R: SimdLanes, T: SimdLanes>(
        &self,
        packet: &mut RayPacket<R>,
        lane: usize,
        block: &TriangleBlock<T>,
        geometry: &impl GeometryLookup,
    ) {
        triangle_vectorized::intersect(&self.config, packet, lane, block, geometry)
    }

    /// Whether a single lane of the packet hits an accepted triangle of the block.
    pub fn occluded_one<R: SimdLanes, T: SimdLanes>(
        &self,
        packet: &RayPacket<R>,
        lane: usize,
        block: &TriangleBlock<T>,
        geometry: &impl GeometryLookup,
    ) -> bool {
        triangle_vectorized::occluded(&self.config, packet, lane, block, geometry)
    }
}
