//! Reconstruction of the recent path of every vehicle from its position history.
//!
//! 1. Find the route geometry of the trip the vehicle reported last.
//! 2. Without a usable geometry (or with snapping disabled) the raw positions form the trail.
//! 3. Otherwise project every position onto the geometry.
//! 4. Walk the positions in order, extending the current run along the geometry while the
//!    positions stay on the same trip and close to the route.
//! 5. Break the run whenever continuity is lost: every run of at least 2 points is a segment.

use strum::Display;
use tracing::{debug, warn};

use crate::error::TrailError;
use crate::projector::project_all;
use crate::walker::path_between;
use crate::{
    Coordinate, HistoryStore, ObservedPosition, Projection, RouteGeometry, ShapeIndex,
    SnapConfig, Speed, VehicleHistory,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TrailKind {
    /// Positions snapped to the route geometry and connected along it.
    Snapped,
    /// Raw positions, the vehicle has no usable route geometry.
    Raw,
}

/// Renderable polyline of (part of) the recent path of a vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailSegment {
    pub vehicle_id: String,
    /// At least 2 coordinates.
    pub coordinates: Vec<Coordinate>,
    /// Average speed of the vehicle over its whole history.
    pub average_speed: Speed,
    pub kind: TrailKind,
}

impl TrailSegment {
    #[cfg(feature = "geo")]
    pub fn to_line_string(&self) -> geo::LineString {
        self.coordinates.iter().copied().map(geo::Coord::from).collect()
    }
}

/// Why a snapped run was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
enum BreakReason {
    /// The position belongs to another trip.
    TripChanged,
    /// The position is too far from the route geometry.
    OffRoute,
    /// The position cannot be reached along the route from the previous one.
    ImplausibleJump,
    /// No more positions.
    EndOfHistory,
}

/// Builds the trail segments of every vehicle with at least 2 positions.
///
/// A vehicle whose trail cannot be built is logged and skipped, it does not affect the others.
/// Segments are sorted by vehicle ID, and by time for the same vehicle.
pub fn build_trails<S: ShapeIndex>(
    config: &SnapConfig,
    history: &HistoryStore,
    shapes: Option<&S>,
) -> Vec<TrailSegment> {
    let mut histories: Vec<_> = history.histories().filter(|h| h.len() >= 2).collect();
    histories.sort_unstable_by(|a, b| a.vehicle_id().cmp(b.vehicle_id()));

    let mut trails = Vec::new();

    for vehicle in histories {
        match build_vehicle_trail(config, vehicle, shapes) {
            Ok(segments) => trails.extend(segments),
            Err(error) => warn!("Cannot build trail of {}: {error}", vehicle.vehicle_id()),
        }
    }

    debug!("Built {} trail segments", trails.len());
    trails
}

/// Builds the trail segments of a single vehicle.
pub fn build_vehicle_trail<S: ShapeIndex>(
    config: &SnapConfig,
    history: &VehicleHistory,
    shapes: Option<&S>,
) -> Result<Vec<TrailSegment>, TrailError> {
    let Some(last) = history.last() else {
        return Ok(vec![]);
    };

    let average_speed = history.average_speed();
    let segment = |coordinates, kind| TrailSegment {
        vehicle_id: history.vehicle_id().to_owned(),
        coordinates,
        average_speed,
        kind,
    };

    let trip_id = last.trip_id.as_deref();
    let geometry = shapes
        .filter(|_| config.snap_to_route)
        .zip(trip_id)
        .and_then(|(shapes, trip_id)| {
            let shape_id = shapes.shape_id_for_trip(trip_id)?;
            let geometry = shapes.route_geometry_for_shape(shape_id)?;
            Some((shape_id, geometry))
        })
        .filter(|(_, geometry)| geometry.is_usable());

    let Some((shape_id, geometry)) = geometry else {
        let coordinates: Vec<_> = history.iter().map(|p| p.coordinate).collect();
        if coordinates.len() < 2 {
            return Ok(vec![]);
        }
        return Ok(vec![segment(coordinates, TrailKind::Raw)]);
    };

    if !geometry.is_valid() {
        return Err(TrailError::MalformedGeometry {
            shape: shape_id.to_owned(),
        });
    }

    let runs = snap_runs(config, history, geometry, trip_id);

    Ok(runs
        .into_iter()
        .map(|coordinates| segment(coordinates, TrailKind::Snapped))
        .collect())
}

/// Splits the history in runs of positions that can be connected along the geometry.
fn snap_runs(
    config: &SnapConfig,
    history: &VehicleHistory,
    geometry: &RouteGeometry,
    trip_id: Option<&str>,
) -> Vec<Vec<Coordinate>> {
    let projections = project_all(config, geometry, history.iter().map(|p| p.coordinate));

    let mut runs = Vec::new();
    let mut run: Vec<Coordinate> = Vec::new();
    // projection of the previous position, if it extended the current run
    let mut previous: Option<Projection> = None;

    let mut close = |run: &mut Vec<Coordinate>, reason: BreakReason| {
        if run.len() >= 2 {
            debug!(
                "Closing trail run of {} with {} points: {reason}",
                history.vehicle_id(),
                run.len()
            );
            runs.push(std::mem::take(run));
        } else {
            run.clear();
        }
    };

    for (position, projection) in history.iter().zip(projections) {
        let projection = match check_continuity(config, position, projection, trip_id) {
            Ok(projection) => projection,
            Err(reason) => {
                close(&mut run, reason);
                previous = None;
                continue;
            }
        };

        match previous {
            None => run.push(projection.point),
            Some(previous) => match path_between(config, geometry, &previous, &projection) {
                Some(path) => run.extend(path.into_iter().skip(1)),
                None => {
                    close(&mut run, BreakReason::ImplausibleJump);
                    run.push(projection.point);
                }
            },
        }

        previous = Some(projection);
    }

    close(&mut run, BreakReason::EndOfHistory);
    runs
}

/// A position can extend a run if it belongs to the current trip (or reports no trip) and it is
/// within the snap threshold of the route geometry.
fn check_continuity(
    config: &SnapConfig,
    position: &ObservedPosition,
    projection: Option<Projection>,
    trip_id: Option<&str>,
) -> Result<Projection, BreakReason> {
    if position.trip_id.is_some() && position.trip_id.as_deref() != trip_id {
        return Err(BreakReason::TripChanged);
    }

    projection
        .filter(|p| p.is_within(config.snap_threshold))
        .ok_or(BreakReason::OffRoute)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::ShapeTable;

    const ROUTE: [Coordinate; 4] = [
        Coordinate::new(0.000, 0.0),
        Coordinate::new(0.001, 0.0),
        Coordinate::new(0.002, 0.0),
        Coordinate::new(0.003, 0.0),
    ];

    fn shapes() -> ShapeTable {
        let mut shapes = ShapeTable::new();
        shapes.insert_shape("east", RouteGeometry::from(ROUTE.to_vec()));
        shapes.insert_trip("t1", Some("r1"), "east");
        shapes.insert_trip("t2", Some("r1"), "east");
        shapes.insert_shape(
            "broken",
            RouteGeometry::from(vec![Coordinate::new(0.0, 0.0), Coordinate::new(f64::NAN, 0.0)]),
        );
        shapes.insert_trip("t3", Some("r2"), "broken");
        shapes
    }

    fn record(store: &mut HistoryStore, vehicle: &str, secs: i64, lon: f64, lat: f64, trip: &str) {
        let observation = ObservedPosition {
            coordinate: Coordinate::new(lon, lat),
            timestamp: crate::Timestamp::from_secs(secs),
            trip_id: Some(trip.to_owned()).filter(|t| !t.is_empty()),
            ..Default::default()
        };
        store.record(vehicle, observation).unwrap();
    }

    #[test]
    fn trail_snapped_single_run() {
        let config = SnapConfig::default();
        let shapes = shapes();
        let mut store = HistoryStore::new();

        record(&mut store, "v1", 0, 0.0005, 0.0001, "t1");
        record(&mut store, "v1", 10, 0.0025, -0.0001, "t1");

        let trails = build_trails(&config, &store, Some(&shapes));
        assert_eq!(trails.len(), 1);
        assert_eq!(trails[0].kind, TrailKind::Snapped);
        assert_eq!(
            trails[0].coordinates,
            vec![
                Coordinate::new(0.0005, 0.0),
                ROUTE[1],
                ROUTE[2],
                Coordinate::new(0.0025, 0.0)
            ]
        );
    }

    #[test]
    fn trail_breaks_on_trip_change() {
        let config = SnapConfig::default();
        let shapes = shapes();
        let mut store = HistoryStore::new();

        record(&mut store, "v1", 0, 0.0001, 0.0, "t1");
        record(&mut store, "v1", 10, 0.0004, 0.0, "t1");
        record(&mut store, "v1", 20, 0.0007, 0.0, "t1");
        record(&mut store, "v1", 30, 0.0012, 0.0, "t2");
        record(&mut store, "v1", 40, 0.0016, 0.0, "t2");

        let trails = build_trails(&config, &store, Some(&shapes));
        assert_eq!(trails.len(), 1);
        assert_eq!(
            trails[0].coordinates,
            vec![Coordinate::new(0.0012, 0.0), Coordinate::new(0.0016, 0.0)]
        );
    }

    #[test]
    fn trail_positions_without_trip_extend_the_run() {
        let config = SnapConfig::default();
        let shapes = shapes();
        let mut store = HistoryStore::new();

        record(&mut store, "v1", 0, 0.0001, 0.0, "");
        record(&mut store, "v1", 10, 0.0004, 0.0, "t1");

        let trails = build_trails(&config, &store, Some(&shapes));
        assert_eq!(trails.len(), 1);
        assert_eq!(trails[0].coordinates.len(), 2);
    }

    #[test]
    fn trail_raw_without_geometry() {
        let config = SnapConfig::default();
        let shapes = shapes();
        let mut store = HistoryStore::new();

        record(&mut store, "v1", 0, 0.0001, 0.001, "unknown");
        record(&mut store, "v1", 10, 0.0004, 0.001, "unknown");
        record(&mut store, "v1", 20, 0.0007, 0.001, "unknown");

        let trails = build_trails(&config, &store, Some(&shapes));
        assert_eq!(trails.len(), 1);
        assert_eq!(trails[0].kind, TrailKind::Raw);
        assert_eq!(trails[0].coordinates.len(), 3);

        // snapping disabled
        let config = SnapConfig {
            snap_to_route: false,
            ..Default::default()
        };
        let mut store = HistoryStore::new();
        record(&mut store, "v1", 0, 0.0001, 0.0, "t1");
        record(&mut store, "v1", 10, 0.0004, 0.001, "t1");

        let trails = build_trails(&config, &store, Some(&shapes));
        assert_eq!(trails.len(), 1);
        assert_eq!(trails[0].kind, TrailKind::Raw);
        assert_eq!(trails[0].coordinates[1], Coordinate::new(0.0004, 0.001));

        let trails = build_trails::<ShapeTable>(&config, &store, None);
        assert_eq!(trails.len(), 1);
    }

    #[test]
    fn trail_malformed_geometry_is_isolated() {
        let config = SnapConfig::default();
        let shapes = shapes();
        let mut store = HistoryStore::new();

        record(&mut store, "broken", 0, 0.0001, 0.0, "t3");
        record(&mut store, "broken", 10, 0.0004, 0.0, "t3");
        record(&mut store, "healthy", 0, 0.0001, 0.0, "t1");
        record(&mut store, "healthy", 10, 0.0004, 0.0, "t1");

        let history = store.get("broken").unwrap();
        assert_eq!(
            build_vehicle_trail(&config, history, Some(&shapes)),
            Err(TrailError::MalformedGeometry {
                shape: "broken".to_owned()
            })
        );

        let trails = build_trails(&config, &store, Some(&shapes));
        assert_eq!(trails.len(), 1);
        assert_eq!(trails[0].vehicle_id, "healthy");
    }

    #[test]
    fn trail_average_speed_shared_by_segments() {
        let config = SnapConfig::default();
        let shapes = shapes();
        let mut store = HistoryStore::new();

        record(&mut store, "v1", 0, 0.0001, 0.0, "t1");
        record(&mut store, "v1", 10, 0.0002, 0.0, "t1");
        record(&mut store, "v1", 20, 0.0010, 0.01, "t1");
        record(&mut store, "v1", 30, 0.0020, 0.0, "t1");
        record(&mut store, "v1", 40, 0.0021, 0.0, "t1");

        let trails = build_trails(&config, &store, Some(&shapes));
        assert_eq!(trails.len(), 2);

        let expected = store.average_speed_of("v1").unwrap();
        assert!(expected.is_moving());
        assert!(trails.iter().all(|t| t.average_speed == expected));
        assert!(trails.iter().all(|t| t.coordinates.len() >= 2));
    }
}
