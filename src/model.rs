use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::time::Duration;

use approx::abs_diff_eq;
use ordered_float::OrderedFloat;

/// Coordinate pair stands for a pair of WGS84 longitude (lon) and latitude (lat) values,
/// expressed in decimal degrees.
#[derive(Debug, Clone, Copy, Default)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Returns true if both components are finite and within the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        // roughly one centimeter at the equator
        const EPSILON: f64 = 1e-7;
        abs_diff_eq!(self.lon, other.lon, epsilon = EPSILON)
            && abs_diff_eq!(self.lat, other.lat, epsilon = EPSILON)
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(coordinate: Coordinate) -> Self {
        [coordinate.lon, coordinate.lat]
    }
}

#[cfg(feature = "geo")]
impl From<Coordinate> for geo::Coord {
    fn from(coordinate: Coordinate) -> Self {
        geo::coord! { x: coordinate.lon, y: coordinate.lat }
    }
}

#[cfg(feature = "geo")]
impl From<geo::Coord> for Coordinate {
    fn from(coord: geo::Coord) -> Self {
        Self {
            lon: coord.x,
            lat: coord.y,
        }
    }
}

#[cfg(feature = "geo")]
impl From<Coordinate> for geo::Point {
    fn from(coordinate: Coordinate) -> Self {
        geo::Point::new(coordinate.lon, coordinate.lat)
    }
}

/// Distance in meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Length(OrderedFloat<f64>);

impl Length {
    pub const ZERO: Self = Self(OrderedFloat(0.0));
    pub const MAX: Self = Self(OrderedFloat(f64::MAX));

    pub const fn from_meters(meters: f64) -> Self {
        Self(OrderedFloat(meters))
    }

    pub const fn meters(&self) -> f64 {
        self.0.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite()
    }
}

impl Add for Length {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Length {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Length {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Length {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, length| acc + length)
    }
}

/// Speed in meters per second.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Speed(f64);

impl Speed {
    pub const ZERO: Self = Self(0.0);

    pub const fn from_mps(mps: f64) -> Self {
        Self(mps)
    }

    pub const fn mps(&self) -> f64 {
        self.0
    }

    pub const fn kmh(&self) -> f64 {
        self.0 * 3.6
    }

    pub fn is_moving(&self) -> bool {
        self.0 > 0.0
    }
}

/// Point in time as milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Feed timestamps are POSIX seconds.
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    pub const fn millis(&self) -> i64 {
        self.0
    }

    /// Returns the elapsed time since an earlier timestamp, or None if `earlier` is not strictly
    /// before this timestamp.
    pub fn elapsed_since(&self, earlier: Timestamp) -> Option<Duration> {
        let delta = self.0.checked_sub(earlier.0)?;
        u64::try_from(delta)
            .ok()
            .filter(|&millis| millis > 0)
            .map(Duration::from_millis)
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self::Output {
        let millis = i64::try_from(rhs.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_sub(millis))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        let millis = i64::try_from(rhs.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(millis))
    }
}
