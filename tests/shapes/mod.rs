mod geojson;

pub use geojson::SHAPES;
