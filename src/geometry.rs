//! Geodesic primitives shared by the projector, the path walker and the history store.

use crate::{Coordinate, Length};

const EARTH_RADIUS_M: f64 = 6_371_000.0;
const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Closest point of a finite segment to a coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    pub point: Coordinate,
    /// Haversine distance from the projected coordinate to `point`.
    pub distance: Length,
}

/// Great-circle (haversine) distance between two coordinates.
pub fn distance(a: Coordinate, b: Coordinate) -> Length {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    Length::from_meters(EARTH_RADIUS_M * c)
}

/// Finds the point of the segment `[start, end]` closest to `coordinate`.
///
/// The projection parameter is computed on an equirectangular plane centered on the segment mean
/// latitude, which is accurate enough for segments up to a few tens of kilometers, while the
/// returned distance is the exact haversine distance to the projected point.
pub fn project_onto_segment(
    coordinate: Coordinate,
    start: Coordinate,
    end: Coordinate,
) -> SegmentProjection {
    if start.lon == end.lon && start.lat == end.lat {
        return SegmentProjection {
            point: start,
            distance: distance(coordinate, start),
        };
    }

    let lat_mid = (start.lat + end.lat) / 2.0;
    let meters_per_degree_lon = METERS_PER_DEGREE_LAT * lat_mid.to_radians().cos();

    let px = (coordinate.lon - start.lon) * meters_per_degree_lon;
    let py = (coordinate.lat - start.lat) * METERS_PER_DEGREE_LAT;
    let dx = (end.lon - start.lon) * meters_per_degree_lon;
    let dy = (end.lat - start.lat) * METERS_PER_DEGREE_LAT;

    let t = ((px * dx + py * dy) / (dx * dx + dy * dy)).clamp(0.0, 1.0);

    let point = Coordinate {
        lon: start.lon + t * (end.lon - start.lon),
        lat: start.lat + t * (end.lat - start.lat),
    };

    SegmentProjection {
        point,
        distance: distance(coordinate, point),
    }
}
