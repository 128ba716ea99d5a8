#![doc = include_str!("../README.md")]

mod animation;
mod engine;
mod error;
mod feed;
#[cfg(feature = "geojson")]
mod export;
mod geometry;
mod history;
mod model;
mod projector;
mod shape;
mod trail;
mod walker;
mod worker;

pub use animation::{AnimationPath, build_animation_path, build_animation_paths};
pub use engine::{CycleOutput, SnapConfig, SnapEngine};
pub use error::{EngineError, RecordError, TrailError};
pub use feed::{FeedSnapshot, VehicleSnapshot};
#[cfg(feature = "geojson")]
pub use export::{animation_paths_to_geojson, trails_to_geojson};
pub use geometry::{SegmentProjection, distance, project_onto_segment};
pub use history::{HistoryStore, HistoryUpdate, ObservedPosition, VehicleHistory, average_speed};
pub use model::{Coordinate, Length, Speed, Timestamp};
pub use projector::{Projection, find_nearest, project_all};
pub use shape::{RouteGeometry, ShapeIndex, ShapeTable};
pub use trail::{TrailKind, TrailSegment, build_trails, build_vehicle_trail};
pub use walker::{along_route_distance, path_between};
pub use worker::{SnapWorker, WorkerRequest, WorkerResponse};
