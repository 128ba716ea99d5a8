use tracing::debug;

use crate::geometry::distance;
use crate::{Coordinate, Length, Projection, RouteGeometry, SnapConfig};

/// Gets the along-route distance between the vertex `from` and the vertex `to`, summing the
/// lengths of the segments between them.
/// Indices beyond the geometry bounds are clamped to its last vertex.
pub fn along_route_distance(geometry: &RouteGeometry, from: usize, to: usize) -> Length {
    if !geometry.is_usable() {
        return Length::ZERO;
    }

    let last = geometry.len() - 1;
    let (from, to) = (from.min(last), to.min(last));
    let (low, high) = if from <= to { (from, to) } else { (to, from) };

    geometry.coordinates()[low..=high]
        .windows(2)
        .map(|w| distance(w[0], w[1]))
        .sum()
}

/// Produces the ordered sequence of coordinates tracing the route geometry from the start
/// projection to the end projection.
///
/// The path starts at the start projection point, follows every vertex of the geometry strictly
/// between the two projected segments (forward if the end segment comes after the start segment,
/// backward otherwise) and ends at the end projection point.
///
/// Returns None if the projections are too many segments apart and also too far from each other
/// along the route: the nearest point search most likely matched a topologically distant part of
/// the route (e.g. a route crossing itself) and the two points cannot be connected.
pub fn path_between(
    config: &SnapConfig,
    geometry: &RouteGeometry,
    start: &Projection,
    end: &Projection,
) -> Option<Vec<Coordinate>> {
    let (from, to) = (start.segment_index, end.segment_index);

    if from.abs_diff(to) > config.max_segment_jump {
        let length = along_route_distance(geometry, from, to);

        if length > config.max_jump_distance {
            debug!("Cannot walk segments {from} -> {to}: {length:?} along route");
            return None;
        }
    }

    if from == to {
        return Some(vec![start.point, end.point]);
    }

    let vertices = geometry.coordinates();
    let mut path = Vec::with_capacity(from.abs_diff(to) + 2);
    path.push(start.point);

    if to > from {
        path.extend(vertices.iter().take(to + 1).skip(from + 1));
    } else {
        path.extend(vertices.iter().take(from + 1).skip(to + 1).rev());
    }

    path.push(end.point);
    Some(path)
}
