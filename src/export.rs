use geojson::{Feature, FeatureCollection, Geometry, Value};
use rustc_hash::FxHashMap;

use crate::{AnimationPath, Coordinate, TrailSegment};

fn line_string(coordinates: &[Coordinate]) -> Geometry {
    Geometry::new(Value::LineString(
        coordinates.iter().map(|&c| <[f64; 2]>::from(c).to_vec()).collect(),
    ))
}

fn feature(geometry: Geometry) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: None,
        foreign_members: None,
    }
}

/// Exports the trails as a collection of LineString features with the `vehicle_id`, `speed`
/// (average speed in m/s) and `kind` properties.
pub fn trails_to_geojson(trails: &[TrailSegment]) -> FeatureCollection {
    let features = trails
        .iter()
        .map(|trail| {
            let mut feature = feature(line_string(&trail.coordinates));
            feature.set_property("vehicle_id", trail.vehicle_id.as_str());
            feature.set_property("speed", trail.average_speed.mps());
            feature.set_property("kind", trail.kind.to_string());
            feature
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Exports the animation paths as a collection of LineString features with the `vehicle_id`
/// property, sorted by vehicle ID.
pub fn animation_paths_to_geojson(paths: &FxHashMap<String, AnimationPath>) -> FeatureCollection {
    let mut paths: Vec<_> = paths.iter().collect();
    paths.sort_unstable_by_key(|(vehicle_id, _)| vehicle_id.as_str());

    let features = paths
        .into_iter()
        .map(|(vehicle_id, path)| {
            let mut feature = feature(line_string(&path.coordinates));
            feature.set_property("vehicle_id", vehicle_id.as_str());
            feature
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
