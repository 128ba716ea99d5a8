use std::sync::LazyLock;

use geojson::{Feature, FeatureCollection, Value};
use trailsnap::{Coordinate, RouteGeometry, ShapeIndex, ShapeTable};

pub static SHAPES: LazyLock<ShapeTable> = LazyLock::new(|| {
    let geojson = include_str!("../data/shapes.geojson");
    parse_geojson(geojson)
});

fn parse_geojson(geojson: &str) -> ShapeTable {
    let FeatureCollection { features, .. } = geojson.parse().unwrap();

    let mut shapes = ShapeTable::new();

    for Feature {
        geometry,
        properties,
        ..
    } in &features
    {
        let geometry = geometry.as_ref().unwrap();
        let properties = properties.as_ref().unwrap();

        if let Value::LineString(line) = &geometry.value {
            let shape_id = properties.get("shape_id").unwrap().as_str().unwrap();
            let route_id = properties.get("route_id").and_then(|id| id.as_str());
            let trip_ids = properties.get("trip_ids").unwrap().as_array().unwrap();

            let geometry: RouteGeometry = line
                .iter()
                .map(|point| Coordinate::new(point[0], point[1]))
                .collect();
            shapes.insert_shape(shape_id, geometry);

            for trip_id in trip_ids {
                shapes.insert_trip(trip_id.as_str().unwrap(), route_id, shape_id);
            }
        }
    }

    shapes
}

#[test]
fn geojson_shapes_tables() {
    let shapes: &ShapeTable = &SHAPES;

    assert_eq!(shapes.shape_count(), 5);
    assert_eq!(shapes.trip_count(), 7);
    assert_eq!(shapes.route_count(), 4);

    let route: Vec<_> = shapes.shapes_for_route("route-1").map(|(id, _)| id).collect();
    assert_eq!(route, ["east", "west"]);
}

#[test]
fn geojson_shapes_geometry() {
    let shapes: &ShapeTable = &SHAPES;

    assert_eq!(shapes.shape_id_for_trip("m10-2"), Some("m10"));

    let geometry = shapes.route_geometry_for_trip("m10-1").unwrap();
    assert_eq!(geometry.len(), 5);
    assert_eq!(geometry.segment_count(), 4);
    assert_eq!(
        geometry.segment(1),
        Some((Coordinate::new(13.402, 52.52), Coordinate::new(13.404, 52.52)))
    );

    let stub = shapes.route_geometry_for_shape("stub").unwrap();
    assert!(!stub.is_usable());
    assert!(shapes.route_geometry_for_trip("unknown").is_none());
}
