use std::time::Duration;

use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::animation::build_animation_paths;
use crate::error::EngineError;
use crate::trail::build_trails;
use crate::{
    AnimationPath, Coordinate, FeedSnapshot, HistoryStore, Length, ShapeIndex, Speed, Timestamp,
    TrailSegment,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapConfig {
    /// Maximum distance from a position to its route geometry for the position to be snapped.
    pub snap_threshold: Length,
    /// Distance below which a segment is considered an exact match by the nearest segment search,
    /// which then stops scanning the geometry.
    pub exact_match_distance: Length,
    /// Number of segments two projections can be apart before checking the along-route distance
    /// between them.
    pub max_segment_jump: usize,
    /// Maximum along-route distance between two projections more than `max_segment_jump`
    /// segments apart for a path to be walked between them.
    pub max_jump_distance: Length,
    /// Positions older than this are dropped from the vehicle history.
    pub history_window: Duration,
    /// Vehicles missing from the feed and silent for longer than this are forgotten.
    pub inactivity_threshold: Duration,
    /// Whether positions are snapped to the route geometries at all, raw trails are built
    /// otherwise.
    pub snap_to_route: bool,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            snap_threshold: Length::from_meters(100.0),
            exact_match_distance: Length::from_meters(5.0),
            max_segment_jump: 200,
            max_jump_distance: Length::from_meters(2000.0),
            history_window: Duration::from_secs(10 * 60),
            inactivity_threshold: Duration::from_secs(5 * 60),
            snap_to_route: true,
        }
    }
}

/// Everything produced by a refresh cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CycleOutput {
    pub trails: Vec<TrailSegment>,
    /// Route aligned path of every vehicle from its previous position to its newest one.
    pub animation_paths: FxHashMap<String, AnimationPath>,
    /// Average speed of every tracked vehicle.
    pub average_speeds: FxHashMap<String, Speed>,
}

/// Stateful snapping engine, owns the vehicle histories between refresh cycles.
#[derive(Debug, Clone)]
pub struct SnapEngine<S> {
    config: SnapConfig,
    history: HistoryStore,
    previous_positions: FxHashMap<String, Coordinate>,
    shapes: Option<S>,
}

impl<S: ShapeIndex> SnapEngine<S> {
    /// Creates an engine without shape index, only usable with snapping disabled until
    /// [`SnapEngine::set_shape_index`] is called.
    pub fn new(config: SnapConfig) -> Self {
        Self {
            config,
            history: HistoryStore::new(),
            previous_positions: FxHashMap::default(),
            shapes: None,
        }
    }

    pub fn with_shape_index(config: SnapConfig, shapes: S) -> Self {
        Self {
            shapes: Some(shapes),
            ..Self::new(config)
        }
    }

    pub fn config(&self) -> &SnapConfig {
        &self.config
    }

    /// Replaces the configuration, effective from the next refresh cycle.
    pub fn set_config(&mut self, config: SnapConfig) {
        debug!("Replacing config: {config:?}");
        self.config = config;
    }

    pub fn shape_index(&self) -> Option<&S> {
        self.shapes.as_ref()
    }

    /// Replaces the shape index, returning the previous one.
    pub fn set_shape_index(&mut self, shapes: S) -> Option<S> {
        info!("Replacing shape index");
        self.shapes.replace(shapes)
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Runs a refresh cycle with the vehicles of a new feed snapshot:
    /// 1. builds the animation paths from the positions of the previous snapshot
    /// 2. records the new positions, pruning and evicting the stale ones
    /// 3. rebuilds all the trails from scratch
    ///
    /// The only error is a missing shape index with snapping enabled, in which case nothing
    /// is recorded. Failures of a single vehicle never fail the cycle.
    pub fn refresh(
        &mut self,
        snapshot: &FeedSnapshot,
        now: Timestamp,
    ) -> Result<CycleOutput, EngineError> {
        let config = &self.config;

        let shapes = if config.snap_to_route {
            Some(
                self.shapes
                    .as_ref()
                    .ok_or(EngineError::ShapeIndexUnavailable)?,
            )
        } else {
            None
        };

        let animation_paths = shapes.map_or_else(FxHashMap::default, |shapes| {
            build_animation_paths(config, &self.previous_positions, snapshot, shapes)
        });

        let update = self.history.update(config, snapshot.observations(), now);
        let trails = build_trails(config, &self.history, shapes);

        self.previous_positions = snapshot
            .iter()
            .filter(|v| !v.vehicle_id.is_empty())
            .map(|v| (v.vehicle_id.clone(), v.coordinate))
            .collect();

        let average_speeds = self
            .history
            .histories()
            .map(|h| (h.vehicle_id().to_owned(), h.average_speed()))
            .collect();

        debug!(
            "Refreshed {} vehicles: {} recorded, {} evicted, {} trail segments, {} animation paths",
            snapshot.len(),
            update.recorded,
            update.evicted,
            trails.len(),
            animation_paths.len()
        );

        Ok(CycleOutput {
            trails,
            animation_paths,
            average_speeds,
        })
    }
}
