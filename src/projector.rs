use tracing::trace;

use crate::geometry::project_onto_segment;
use crate::{Coordinate, Length, RouteGeometry, SnapConfig};

/// Result of projecting a coordinate onto a route geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Nearest point found on the geometry.
    pub point: Coordinate,
    /// Index `i` of the segment connecting the vertices `i` and `i + 1` the point lies on.
    pub segment_index: usize,
    /// Distance from the projected coordinate to `point`.
    pub distance: Length,
}

impl Projection {
    pub fn is_within(&self, threshold: Length) -> bool {
        self.distance <= threshold
    }
}

/// Projects a coordinate onto the nearest point of the geometry.
///
/// Segments are scanned in traversal order and the scan stops as soon as a segment closer than
/// the exact match distance is found, therefore when a route passes near itself the returned
/// segment is the first near-exact match and not necessarily the global minimum.
/// Ties are broken in favor of the lowest segment index.
///
/// Returns None if the geometry has less than 2 vertices.
pub fn find_nearest(
    config: &SnapConfig,
    coordinate: Coordinate,
    geometry: &RouteGeometry,
) -> Option<Projection> {
    let mut nearest: Option<Projection> = None;

    for (segment_index, (start, end)) in geometry.segments().enumerate() {
        let projection = project_onto_segment(coordinate, start, end);

        if nearest.is_none_or(|n| projection.distance < n.distance) {
            nearest = Some(Projection {
                point: projection.point,
                segment_index,
                distance: projection.distance,
            });

            if projection.distance < config.exact_match_distance {
                break;
            }
        }
    }

    trace!("Projected {coordinate:?} to {nearest:?}");
    nearest
}

/// Projects every coordinate onto the geometry, preserving the input order.
pub fn project_all<'a, I>(
    config: &'a SnapConfig,
    geometry: &'a RouteGeometry,
    coordinates: I,
) -> impl Iterator<Item = Option<Projection>> + 'a
where
    I: IntoIterator<Item = Coordinate>,
    I::IntoIter: 'a,
{
    coordinates
        .into_iter()
        .map(move |coordinate| find_nearest(config, coordinate, geometry))
}
