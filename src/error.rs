use std::io::ErrorKind;

use thiserror::Error;

use crate::Coordinate;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum RecordError {
    #[error("Observation coordinate is not valid: {0:?}")]
    InvalidCoordinate(Coordinate),
}

#[derive(Error, Debug, PartialEq, Clone)]
pub enum TrailError {
    #[error("Route geometry of shape {shape} contains invalid coordinates")]
    MalformedGeometry { shape: String },
}

#[derive(Error, Debug, PartialEq, Clone)]
pub enum EngineError {
    #[error("Shape index is not available, cannot snap to routes")]
    ShapeIndexUnavailable,
    #[error("Snap worker cannot be spawned: {0:?}")]
    WorkerSpawn(ErrorKind),
    #[error("Snap worker is disconnected")]
    WorkerDisconnected,
}

impl From<std::io::Error> for EngineError {
    fn from(error: std::io::Error) -> Self {
        Self::WorkerSpawn(error.kind())
    }
}
