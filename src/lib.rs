pub mod filter;
pub mod geometry;
pub mod intersector;
pub mod ray_packet;
pub mod triangle_block;
mod util;

pub use filter::{
    FilterDecision, GeomId, Geometry, GeometryLookup, GeometryTable, NoFilters, QueryKind,
};
pub use intersector::{Intersector, IntersectorConfig};
pub use ray_packet::{Hit, PacketError, RayPacket};
pub use triangle_block::{BlockError, BlockTriangle, TriangleBlock};
pub use util::simba::SimdLanes;
