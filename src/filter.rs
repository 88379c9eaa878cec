use std::fmt;

use index_vec::IndexVec;

use crate::{geometry::Ray, ray_packet::Hit};

index_vec::define_index_type! {
    pub struct GeomId = u32;
    MAX_INDEX = (u32::MAX - 1) as usize;
    IMPL_RAW_CONVERSIONS = true;
}

/// Kind of query a filter is being asked about.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QueryKind {
    /// Closest hit query
    Intersect,
    /// Any hit query
    Occlude,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FilterDecision {
    Accept,
    /// Candidate is discarded as if the geometric test missed.
    Reject,
}

/// Access to geometry filters, by geometry id.
///
/// Filters run after a candidate passed the geometric test and before it is committed.
pub trait GeometryLookup {
    /// Whether the geometry declares a filter for this kind of query.
    fn has_filter(&self, kind: QueryKind, geom_id: GeomId) -> bool;

    /// Runs the filter of the geometry.
    /// Only called when `has_filter` returned true for the same arguments.
    fn run_filter(&self, kind: QueryKind, geom_id: GeomId, ray: &Ray, hit: &Hit)
    -> FilterDecision;
}

/// Lookup for scenes without any filters.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoFilters;

impl GeometryLookup for NoFilters {
    #[inline(always)]
    fn has_filter(&self, _kind: QueryKind, _geom_id: GeomId) -> bool {
        false
    }

    #[inline(always)]
    fn run_filter(
        &self,
        _kind: QueryKind,
        _geom_id: GeomId,
        _ray: &Ray,
        _hit: &Hit,
    ) -> FilterDecision {
        FilterDecision::Accept
    }
}

pub type Filter = Box<dyn Fn(&Ray, &Hit) -> FilterDecision + Send + Sync>;

#[derive(Default)]
pub struct Geometry {
    intersection_filter: Option<Filter>,
    occlusion_filter: Option<Filter>,
}

impl Geometry {
    pub fn new() -> Geometry {
        Geometry::default()
    }

    /// Sets a filter consulted by closest hit queries.
    pub fn with_intersection_filter(
        self,
        filter: impl Fn(&Ray, &Hit) -> FilterDecision + Send + Sync + 'static,
    ) -> Geometry {
        Geometry {
            intersection_filter: Some(Box::new(filter)),
            ..self
        }
    }

    /// Sets a filter consulted by occlusion queries.
    pub fn with_occlusion_filter(
        self,
        filter: impl Fn(&Ray, &Hit) -> FilterDecision + Send + Sync + 'static,
    ) -> Geometry {
        Geometry {
            occlusion_filter: Some(Box::new(filter)),
            ..self
        }
    }

    pub fn filter(&self, kind: QueryKind) -> Option<&Filter> {
        match kind {
            QueryKind::Intersect => self.intersection_filter.as_ref(),
            QueryKind::Occlude => self.occlusion_filter.as_ref(),
        }
    }
}

impl fmt::Debug for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Geometry")
            .field("intersection_filter", &self.intersection_filter.is_some())
            .field("occlusion_filter", &self.occlusion_filter.is_some())
            .finish()
    }
}

/// Geometries of a scene, indexed by [`GeomId`].
#[derive(Debug, Default)]
pub struct GeometryTable {
    geometries: IndexVec<GeomId, Geometry>,
}

impl GeometryTable {
    pub fn new() -> GeometryTable {
        GeometryTable::default()
    }

    pub fn push(&mut self, geometry: Geometry) -> GeomId {
        let id = self.geometries.push(geometry);
        log::debug!("Registered geometry {id:?}: {:?}", self.geometries[id]);
        id
    }

    pub fn get(&self, geom_id: GeomId) -> Option<&Geometry> {
        self.geometries.get(geom_id)
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }
}

impl GeometryLookup for GeometryTable {
    #[inline]
    fn has_filter(&self, kind: QueryKind, geom_id: GeomId) -> bool {
        self.get(geom_id)
            .is_some_and(|geometry| geometry.filter(kind).is_some())
    }

    fn run_filter(
        &self,
        kind: QueryKind,
        geom_id: GeomId,
        ray: &Ray,
        hit: &Hit,
    ) -> FilterDecision {
        match self.get(geom_id).and_then(|geometry| geometry.filter(kind)) {
            Some(filter) => filter(ray, hit),
            None => FilterDecision::Accept,
        }
    }
}
