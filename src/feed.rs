use crate::{Coordinate, ObservedPosition, Speed, Timestamp};

/// Decoded state of a single vehicle in a feed refresh.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VehicleSnapshot {
    pub vehicle_id: String,
    pub coordinate: Coordinate,
    /// Time of the position fix, vehicles without one are displayed but never recorded.
    pub timestamp: Option<Timestamp>,
    pub speed: Speed,
    pub route_id: Option<String>,
    pub trip_id: Option<String>,
    pub label: Option<String>,
}

impl VehicleSnapshot {
    /// Converts the snapshot into an observation that can be recorded in the vehicle history.
    pub fn observation(&self) -> Option<ObservedPosition> {
        Some(ObservedPosition {
            coordinate: self.coordinate,
            timestamp: self.timestamp?,
            speed: self.speed,
            route_id: self.route_id.clone(),
            trip_id: self.trip_id.clone(),
            label: self.label.clone(),
        })
    }
}

/// Ordered list of the vehicles of a feed refresh.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedSnapshot {
    pub vehicles: Vec<VehicleSnapshot>,
}

impl FeedSnapshot {
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &VehicleSnapshot> {
        self.vehicles.iter()
    }

    /// Gets the observations of all the vehicles with a timestamp.
    pub fn observations(&self) -> impl Iterator<Item = (&str, ObservedPosition)> {
        self.vehicles
            .iter()
            .filter(|v| !v.vehicle_id.is_empty())
            .filter_map(|v| Some((v.vehicle_id.as_str(), v.observation()?)))
    }
}

impl From<Vec<VehicleSnapshot>> for FeedSnapshot {
    fn from(vehicles: Vec<VehicleSnapshot>) -> Self {
        Self { vehicles }
    }
}

impl FromIterator<VehicleSnapshot> for FeedSnapshot {
    fn from_iter<I: IntoIterator<Item = VehicleSnapshot>>(iter: I) -> Self {
        Self {
            vehicles: iter.into_iter().collect(),
        }
    }
}
