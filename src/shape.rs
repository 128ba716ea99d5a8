use std::collections::BTreeSet;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::geometry::distance;
use crate::{Coordinate, Length};

/// Ordered, immutable sequence of coordinates describing the path of a route (a GTFS shape).
/// The sequence order is the traversal order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteGeometry {
    coordinates: Vec<Coordinate>,
}

impl RouteGeometry {
    pub fn new(coordinates: Vec<Coordinate>) -> Self {
        Self { coordinates }
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Number of segments connecting consecutive vertices.
    pub fn segment_count(&self) -> usize {
        self.coordinates.len().saturating_sub(1)
    }

    /// Gets the segment connecting the vertices `index` and `index + 1`.
    pub fn segment(&self, index: usize) -> Option<(Coordinate, Coordinate)> {
        let start = self.coordinates.get(index)?;
        let end = self.coordinates.get(index + 1)?;
        Some((*start, *end))
    }

    /// Iterator over all the segments in traversal order.
    pub fn segments(&self) -> impl ExactSizeIterator<Item = (Coordinate, Coordinate)> + '_ {
        self.coordinates.windows(2).map(|w| (w[0], w[1]))
    }

    /// A geometry can only be snapped to if it has at least one segment.
    pub fn is_usable(&self) -> bool {
        self.coordinates.len() >= 2
    }

    /// Returns true if all the vertices are valid WGS84 coordinates.
    pub fn is_valid(&self) -> bool {
        self.coordinates.iter().all(Coordinate::is_valid)
    }

    /// Total haversine length of the geometry.
    pub fn length(&self) -> Length {
        self.segments().map(|(a, b)| distance(a, b)).sum()
    }
}

impl From<Vec<Coordinate>> for RouteGeometry {
    fn from(coordinates: Vec<Coordinate>) -> Self {
        Self::new(coordinates)
    }
}

impl FromIterator<Coordinate> for RouteGeometry {
    fn from_iter<I: IntoIterator<Item = Coordinate>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Read-only lookup from trips and shapes to route geometries.
/// Should be implemented by whatever indexes the static GTFS data the engine runs on.
pub trait ShapeIndex {
    /// Gets the shape a trip runs on.
    fn shape_id_for_trip(&self, trip_id: &str) -> Option<&str>;

    /// Gets the geometry of a shape.
    fn route_geometry_for_shape(&self, shape_id: &str) -> Option<&RouteGeometry>;

    /// Gets the geometry of the shape a trip runs on.
    fn route_geometry_for_trip(&self, trip_id: &str) -> Option<&RouteGeometry> {
        self.shape_id_for_trip(trip_id)
            .and_then(|shape_id| self.route_geometry_for_shape(shape_id))
    }
}

impl<T: ShapeIndex + ?Sized> ShapeIndex for &T {
    fn shape_id_for_trip(&self, trip_id: &str) -> Option<&str> {
        (**self).shape_id_for_trip(trip_id)
    }

    fn route_geometry_for_shape(&self, shape_id: &str) -> Option<&RouteGeometry> {
        (**self).route_geometry_for_shape(shape_id)
    }
}

impl<T: ShapeIndex + ?Sized> ShapeIndex for Arc<T> {
    fn shape_id_for_trip(&self, trip_id: &str) -> Option<&str> {
        (**self).shape_id_for_trip(trip_id)
    }

    fn route_geometry_for_shape(&self, shape_id: &str) -> Option<&RouteGeometry> {
        (**self).route_geometry_for_shape(shape_id)
    }
}

/// In-memory shape index built from the shapes, trips and routes tables of a GTFS feed.
#[derive(Debug, Clone, Default)]
pub struct ShapeTable {
    shapes: FxHashMap<String, RouteGeometry>,
    trip_to_shape: FxHashMap<String, String>,
    route_to_shapes: FxHashMap<String, BTreeSet<String>>,
}

impl ShapeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_shape(&mut self, shape_id: impl Into<String>, geometry: RouteGeometry) {
        self.shapes.insert(shape_id.into(), geometry);
    }

    /// Registers the shape of a trip, and the shape as one of the variants of its route.
    pub fn insert_trip(
        &mut self,
        trip_id: impl Into<String>,
        route_id: Option<&str>,
        shape_id: impl Into<String>,
    ) {
        let shape_id = shape_id.into();

        if let Some(route_id) = route_id {
            self.route_to_shapes
                .entry(route_id.to_owned())
                .or_default()
                .insert(shape_id.clone());
        }

        self.trip_to_shape.insert(trip_id.into(), shape_id);
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn trip_count(&self) -> usize {
        self.trip_to_shape.len()
    }

    pub fn route_count(&self) -> usize {
        self.route_to_shapes.len()
    }

    /// Gets all the known shapes of a route, sorted by shape ID.
    /// Shapes referenced by trips but missing from the shapes table are skipped.
    pub fn shapes_for_route<'a>(
        &'a self,
        route_id: &str,
    ) -> impl Iterator<Item = (&'a str, &'a RouteGeometry)> {
        self.route_to_shapes
            .get(route_id)
            .into_iter()
            .flatten()
            .filter_map(|shape_id| {
                let geometry = self.shapes.get(shape_id)?;
                Some((shape_id.as_str(), geometry))
            })
    }
}

impl ShapeIndex for ShapeTable {
    fn shape_id_for_trip(&self, trip_id: &str) -> Option<&str> {
        self.trip_to_shape.get(trip_id).map(String::as_str)
    }

    fn route_geometry_for_shape(&self, shape_id: &str) -> Option<&RouteGeometry> {
        self.shapes.get(shape_id)
    }
}
