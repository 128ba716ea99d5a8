use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::projector::find_nearest;
use crate::walker::path_between;
use crate::{Coordinate, FeedSnapshot, ShapeIndex, SnapConfig};

/// Route aligned path of a vehicle from its previous position to its newest one.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationPath {
    /// At least 2 coordinates.
    pub coordinates: Vec<Coordinate>,
}

/// Builds the animation path of every vehicle of the snapshot that also has a previous position.
///
/// Vehicles without a trip, without a usable route geometry, too far from their route, or whose
/// positions cannot be connected along the route get no path: the renderer should fall back to
/// a straight line interpolation.
pub fn build_animation_paths<S: ShapeIndex>(
    config: &SnapConfig,
    previous_positions: &FxHashMap<String, Coordinate>,
    snapshot: &FeedSnapshot,
    shapes: &S,
) -> FxHashMap<String, AnimationPath> {
    let mut paths = FxHashMap::default();

    for vehicle in snapshot.iter() {
        let Some(&previous) = previous_positions.get(&vehicle.vehicle_id) else {
            continue;
        };

        let Some(trip_id) = vehicle.trip_id.as_deref() else {
            continue;
        };

        let path = build_animation_path(config, shapes, trip_id, previous, vehicle.coordinate);

        match path {
            Some(path) => {
                paths.insert(vehicle.vehicle_id.clone(), path);
            }
            None => trace!("No animation path for {}", vehicle.vehicle_id),
        }
    }

    debug!("Built {} animation paths", paths.len());
    paths
}

/// Builds the animation path along the route geometry of the trip, between two raw positions.
///
/// Returns None if the geometry contains non-finite or out of range vertices.
pub fn build_animation_path<S: ShapeIndex>(
    config: &SnapConfig,
    shapes: &S,
    trip_id: &str,
    previous: Coordinate,
    target: Coordinate,
) -> Option<AnimationPath> {
    let geometry = shapes
        .route_geometry_for_trip(trip_id)
        .filter(|g| g.is_usable())?;

    if !geometry.is_valid() {
        warn!("Route geometry of trip {trip_id} contains invalid coordinates");
        return None;
    }

    let start = find_nearest(config, previous, geometry)?;
    let end = find_nearest(config, target, geometry)?;

    if !start.is_within(config.snap_threshold) || !end.is_within(config.snap_threshold) {
        return None;
    }

    path_between(config, geometry, &start, &end)
        .filter(|coordinates| coordinates.len() >= 2)
        .map(|coordinates| AnimationPath { coordinates })
}
