use assert2::debug_assert;
use simba::simd::SimdValue as _;
use thiserror::Error;

use crate::{
    filter::GeomId,
    geometry::{
        BarycentricCoordinates, FloatType, SimdPoint, SimdVector, Triangle, WorldPoint,
        WorldVector, ray_triangle_intersection::TriangleLanes,
    },
    ray_packet::{Hit, INVALID_ID},
    util::{low_bits, simba::SimdLanes},
};

/// Triangle with its ids, input for building blocks.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BlockTriangle {
    pub vertices: Triangle<WorldPoint>,
    pub geom_id: GeomId,
    pub prim_id: u32,
    /// Visibility mask, see [`crate::geometry::Ray::mask`].
    pub mask: u32,
}

impl BlockTriangle {
    pub fn new(vertices: Triangle<WorldPoint>, geom_id: GeomId, prim_id: u32) -> BlockTriangle {
        BlockTriangle {
            vertices,
            geom_id,
            prim_id,
            mask: u32::MAX,
        }
    }

    pub fn with_mask(self, mask: u32) -> BlockTriangle {
        BlockTriangle { mask, ..self }
    }
}

/// Up to `T::LANES` triangles, stored as vertex 0, two edges and the geometric normal.
///
/// Lanes past `len` are padding. They hold a degenerate triangle with mask 0 and
/// are excluded from every test by [`TriangleBlock::valid_bits`].
#[derive(Copy, Clone, Debug)]
pub struct TriangleBlock<T: SimdLanes> {
    v0: SimdPoint<T>,
    e1: SimdVector<T>,
    e2: SimdVector<T>,
    ng: SimdVector<T>,
    geom_ids: T::Ints,
    prim_ids: T::Ints,
    masks: T::Ints,
    len: usize,
}

impl<T: SimdLanes> TriangleBlock<T> {
    pub const CAPACITY: usize = T::LANES;

    pub fn new(triangles: &[BlockTriangle]) -> Result<Self, BlockError> {
        if triangles.len() > Self::CAPACITY {
            return Err(BlockError::TooManyTriangles {
                count: triangles.len(),
                capacity: Self::CAPACITY,
            });
        }
        Ok(Self::build(triangles))
    }

    /// Splits the triangles into full blocks, only the last one may be partial.
    pub fn pack(triangles: &[BlockTriangle]) -> Vec<Self> {
        triangles.chunks(Self::CAPACITY).map(Self::build).collect()
    }

    fn build(triangles: &[BlockTriangle]) -> Self {
        debug_assert!(triangles.len() <= Self::CAPACITY);

        let mut block: Self = TriangleBlock {
            v0: SimdPoint::splat(WorldPoint::origin()),
            e1: SimdVector::splat(WorldVector::zeros()),
            e2: SimdVector::splat(WorldVector::zeros()),
            ng: SimdVector::splat(WorldVector::zeros()),
            geom_ids: T::ints_splat(INVALID_ID),
            prim_ids: T::ints_splat(INVALID_ID),
            masks: T::ints_splat(0),
            len: triangles.len(),
        };

        for (lane, triangle) in triangles.iter().enumerate() {
            let [e1, e2] = triangle.vertices.edges();
            block.v0.replace(lane, triangle.vertices[0]);
            block.e1.replace(lane, e1);
            block.e2.replace(lane, e2);
            block.ng.replace(lane, e1.cross(&e2));
            T::ints_replace(&mut block.geom_ids, lane, triangle.geom_id.raw());
            T::ints_replace(&mut block.prim_ids, lane, triangle.prim_id);
            T::ints_replace(&mut block.masks, lane, triangle.mask);
        }

        block
    }

    /// Number of valid triangles.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bitmask of the lanes holding valid triangles.
    pub fn valid_bits(&self) -> u64 {
        low_bits(self.len)
    }

    /// Reconstructs the triangle stored in a lane.
    /// Vertices 1 and 2 are recomputed from the edges, so they may differ by rounding.
    pub fn triangle(&self, lane: usize) -> Option<BlockTriangle> {
        if lane >= self.len {
            return None;
        }
        let v0 = self.v0.extract(lane);
        Some(BlockTriangle {
            vertices: Triangle::new(v0, v0 + self.e1.extract(lane), v0 + self.e2.extract(lane)),
            geom_id: self.geom_id(lane),
            prim_id: self.prim_id(lane),
            mask: self.mask(lane),
        })
    }

    pub(crate) fn lanes(&self) -> TriangleLanes<'_, T> {
        TriangleLanes {
            v0: &self.v0,
            e1: &self.e1,
            e2: &self.e2,
            ng: &self.ng,
        }
    }

    /// Copies a single triangle into every lane of another lane type.
    pub(crate) fn broadcast<R: SimdLanes>(&self, lane: usize) -> BroadcastTriangle<R> {
        debug_assert!(lane < self.len);
        BroadcastTriangle {
            v0: SimdPoint::splat(self.v0.extract(lane)),
            e1: SimdVector::splat(self.e1.extract(lane)),
            e2: SimdVector::splat(self.e2.extract(lane)),
            ng: SimdVector::splat(self.ng.extract(lane)),
        }
    }

    pub(crate) fn geom_id(&self, lane: usize) -> GeomId {
        GeomId::from_raw(T::ints_extract(&self.geom_ids, lane))
    }

    pub(crate) fn prim_id(&self, lane: usize) -> u32 {
        T::ints_extract(&self.prim_ids, lane)
    }

    pub(crate) fn mask(&self, lane: usize) -> u32 {
        T::ints_extract(&self.masks, lane)
    }

    pub(crate) fn normal(&self, lane: usize) -> WorldVector {
        self.ng.extract(lane)
    }

    /// Lanes whose triangle mask overlaps the ray mask. Padding lanes never do.
    pub(crate) fn mask_lanes(&self, ray_mask: u32) -> T::SimdBool {
        T::ints_overlap(self.masks, T::ints_splat(ray_mask))
    }

    /// Hit record for the triangle in `lane`.
    pub(crate) fn hit(
        &self,
        lane: usize,
        t: FloatType,
        uv: BarycentricCoordinates<FloatType>,
    ) -> Hit {
        Hit {
            t,
            uv,
            ng: self.normal(lane),
            geom_id: self.geom_id(lane),
            prim_id: self.prim_id(lane),
        }
    }
}

/// One triangle of a block, repeated over all lanes of a ray packet.
pub(crate) struct BroadcastTriangle<R: SimdLanes> {
    v0: SimdPoint<R>,
    e1: SimdVector<R>,
    e2: SimdVector<R>,
    ng: SimdVector<R>,
}

impl<R: SimdLanes> BroadcastTriangle<R> {
    pub(crate) fn lanes(&self) -> TriangleLanes<'_, R> {
        TriangleLanes {
            v0: &self.v0,
            e1: &self.e1,
            e2: &self.e2,
            ng: &self.ng,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockError {
    #[error("Block of {capacity} lanes can't hold {count} triangles")]
    TooManyTriangles { count: usize, capacity: usize },
}
