use std::collections::VecDeque;
use std::time::Duration;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace, warn};

use crate::error::RecordError;
use crate::geometry::distance;
use crate::{Coordinate, Length, SnapConfig, Speed, Timestamp};

/// A single GPS ping of a vehicle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObservedPosition {
    pub coordinate: Coordinate,
    pub timestamp: Timestamp,
    /// Speed reported by the vehicle, zero if unknown.
    pub speed: Speed,
    pub route_id: Option<String>,
    pub trip_id: Option<String>,
    pub label: Option<String>,
}

/// Time ordered positions of a single vehicle.
///
/// Timestamps are strictly increasing: an observation that is not newer than the last recorded
/// one is never appended.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleHistory {
    vehicle_id: String,
    positions: VecDeque<ObservedPosition>,
}

impl VehicleHistory {
    pub fn new(vehicle_id: impl Into<String>) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            positions: VecDeque::new(),
        }
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    pub fn positions(&self) -> &VecDeque<ObservedPosition> {
        &self.positions
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ObservedPosition> + ExactSizeIterator {
        self.positions.iter()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn first(&self) -> Option<&ObservedPosition> {
        self.positions.front()
    }

    pub fn last(&self) -> Option<&ObservedPosition> {
        self.positions.back()
    }

    pub fn average_speed(&self) -> Speed {
        average_speed(self)
    }

    /// Appends the observation unless its timestamp is equal to (duplicate) or older than
    /// (stale) the last recorded one. Returns true if the observation was appended.
    fn push(&mut self, observation: ObservedPosition) -> bool {
        if let Some(last) = self.positions.back() {
            if observation.timestamp <= last.timestamp {
                trace!(
                    "Dropping observation of {} at {:?}, last at {:?}",
                    self.vehicle_id, observation.timestamp, last.timestamp
                );
                return false;
            }
        }

        self.positions.push_back(observation);
        true
    }

    /// Drops the positions older than the cutoff, returns how many were dropped.
    fn prune(&mut self, cutoff: Timestamp) -> usize {
        let count = self
            .positions
            .iter()
            .take_while(|p| p.timestamp < cutoff)
            .count();
        self.positions.drain(..count);
        count
    }
}

/// Outcome of the history update of a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryUpdate {
    /// Observations appended to a vehicle history.
    pub recorded: usize,
    /// Observations rejected because of invalid data.
    pub rejected: usize,
    /// Vehicles removed from the store.
    pub evicted: usize,
}

/// Position history of every tracked vehicle.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    vehicles: FxHashMap<String, VehicleHistory>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked vehicles.
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn get(&self, vehicle_id: &str) -> Option<&VehicleHistory> {
        self.vehicles.get(vehicle_id)
    }

    pub fn vehicle_ids(&self) -> impl Iterator<Item = &str> {
        self.vehicles.keys().map(String::as_str)
    }

    pub fn histories(&self) -> impl Iterator<Item = &VehicleHistory> {
        self.vehicles.values()
    }

    /// Gets the average speed of a tracked vehicle.
    pub fn average_speed_of(&self, vehicle_id: &str) -> Option<Speed> {
        self.vehicles.get(vehicle_id).map(average_speed)
    }

    /// Records an observation of the vehicle, creating its history on first sight.
    ///
    /// Observations with the same timestamp as the last recorded one (or older) are dropped and
    /// Ok(false) is returned. Observations with an invalid coordinate are rejected and never
    /// stored.
    ///
    /// A vehicle whose feed clock goes backwards stops being recorded until its clock catches up
    /// with the last recorded timestamp, or until the window prunes its history empty.
    pub fn record(
        &mut self,
        vehicle_id: &str,
        observation: ObservedPosition,
    ) -> Result<bool, RecordError> {
        if !observation.coordinate.is_valid() {
            return Err(RecordError::InvalidCoordinate(observation.coordinate));
        }

        let history = self
            .vehicles
            .entry(vehicle_id.to_owned())
            .or_insert_with(|| VehicleHistory::new(vehicle_id));

        Ok(history.push(observation))
    }

    /// Drops the positions of the vehicle older than `now - window`.
    /// Returns how many positions were dropped.
    pub fn prune(&mut self, vehicle_id: &str, now: Timestamp, window: Duration) -> usize {
        self.vehicles
            .get_mut(vehicle_id)
            .map_or(0, |history| history.prune(now - window))
    }

    /// Removes every vehicle that is not active and whose last position is older than
    /// `now - inactivity`, as well as every vehicle without positions.
    /// Returns how many vehicles were removed.
    pub fn evict_inactive(
        &mut self,
        active: &FxHashSet<&str>,
        now: Timestamp,
        inactivity: Duration,
    ) -> usize {
        let cutoff = now - inactivity;
        let count = self.vehicles.len();

        self.vehicles.retain(|vehicle_id, history| {
            let inactive = !active.contains(vehicle_id.as_str())
                && history.last().is_some_and(|p| p.timestamp < cutoff);

            if inactive || history.is_empty() {
                debug!("Evicting history of {vehicle_id}");
                false
            } else {
                true
            }
        });

        count - self.vehicles.len()
    }

    /// Runs the history step of a refresh cycle: records all the observations of the current
    /// feed snapshot, prunes the histories of the observed vehicles to the configured window
    /// and finally evicts the vehicles that went silent.
    ///
    /// Invalid observations are logged and skipped, the vehicle still counts as active.
    pub fn update<'a, I>(
        &mut self,
        config: &SnapConfig,
        observations: I,
        now: Timestamp,
    ) -> HistoryUpdate
    where
        I: IntoIterator<Item = (&'a str, ObservedPosition)>,
    {
        let mut update = HistoryUpdate::default();
        let mut active = FxHashSet::default();

        for (vehicle_id, observation) in observations {
            active.insert(vehicle_id);

            match self.record(vehicle_id, observation) {
                Ok(true) => update.recorded += 1,
                Ok(false) => (),
                Err(error) => {
                    warn!("Rejected observation of {vehicle_id}: {error}");
                    update.rejected += 1;
                    continue;
                }
            }

            if self.get(vehicle_id).is_some_and(|h| h.len() > 1) {
                self.prune(vehicle_id, now, config.history_window);
            }
        }

        update.evicted = self.evict_inactive(&active, now, config.inactivity_threshold);

        debug!("Updated history of {} vehicles: {update:?}", self.len());
        update
    }
}

/// Gets the average speed of a vehicle over its history.
///
/// If the vehicle reported any non zero speed the mean of the reported speeds is returned,
/// otherwise the speed is derived from the distance traveled between consecutive positions
/// over the elapsed time. Returns zero for less than 2 positions.
pub fn average_speed(history: &VehicleHistory) -> Speed {
    if history.len() < 2 {
        return Speed::ZERO;
    }

    let (sum, count) = history
        .iter()
        .map(|p| p.speed)
        .filter(Speed::is_moving)
        .fold((0.0, 0usize), |(sum, count), speed| (sum + speed.mps(), count + 1));

    if count > 0 {
        return Speed::from_mps(sum / count as f64);
    }

    let (length, elapsed) = history
        .positions
        .iter()
        .zip(history.positions.iter().skip(1))
        .filter_map(|(a, b)| {
            let elapsed = b.timestamp.elapsed_since(a.timestamp)?;
            Some((distance(a.coordinate, b.coordinate), elapsed))
        })
        .fold((Length::ZERO, Duration::ZERO), |(length, elapsed), (l, e)| {
            (length + l, elapsed + e)
        });

    if elapsed.is_zero() {
        Speed::ZERO
    } else {
        Speed::from_mps(length.meters() / elapsed.as_secs_f64())
    }
}
