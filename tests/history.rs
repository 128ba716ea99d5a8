use std::time::Duration;

use rustc_hash::FxHashSet;
use test_log::test;
use trailsnap::{
    Coordinate, HistoryStore, ObservedPosition, RecordError, SnapConfig, Speed, Timestamp,
};

fn observation(millis: i64) -> ObservedPosition {
    ObservedPosition {
        coordinate: Coordinate::new(13.4, 52.52),
        timestamp: Timestamp::from_millis(millis),
        speed: Speed::from_mps(5.0),
        trip_id: Some("m10-1".into()),
        ..Default::default()
    }
}

#[test]
fn history_dedup_same_timestamp() {
    let mut history = HistoryStore::new();

    assert_eq!(history.record("v1", observation(1000)), Ok(true));
    assert_eq!(history.record("v1", observation(1000)), Ok(false));
    assert_eq!(history.get("v1").map(|h| h.len()), Some(1));

    assert_eq!(history.record("v1", observation(2000)), Ok(true));
    assert_eq!(history.get("v1").map(|h| h.len()), Some(2));
}

#[test]
fn history_pruning_window() {
    let mut history = HistoryStore::new();

    for millis in (0..=1000).step_by(100) {
        history.record("v1", observation(millis)).unwrap();
    }

    let removed = history.prune("v1", Timestamp::from_millis(1000), Duration::from_millis(500));
    assert_eq!(removed, 5);

    let vehicle = history.get("v1").unwrap();
    assert!(vehicle.iter().all(|p| p.timestamp >= Timestamp::from_millis(500)));
    assert_eq!(vehicle.first().map(|p| p.timestamp), Some(Timestamp::from_millis(500)));
}

#[test]
fn history_eviction() {
    let mut history = HistoryStore::new();
    let inactivity = Duration::from_secs(300);

    history.record("silent", observation(0)).unwrap();
    history.record("old-but-active", observation(0)).unwrap();
    history.record("recent", observation(3_500_000)).unwrap();

    let now = Timestamp::from_secs(3_600);
    let active = FxHashSet::from_iter(["old-but-active"]);
    assert_eq!(history.evict_inactive(&active, now, inactivity), 1);

    assert!(history.get("silent").is_none());
    assert!(history.get("old-but-active").is_some());
    assert!(history.get("recent").is_some());

    // active vehicles are kept whatever the age of their last position
    let now = Timestamp::from_secs(1_000_000);
    let active = FxHashSet::from_iter(["old-but-active", "recent"]);
    assert_eq!(history.evict_inactive(&active, now, inactivity), 0);
    assert_eq!(history.len(), 2);
}

#[test]
fn history_update_cycles() {
    let config = SnapConfig::default();
    let mut history = HistoryStore::new();

    // one ping every 30 seconds during 20 minutes
    for secs in (0..=1200).step_by(30) {
        let now = Timestamp::from_secs(secs);
        let update = history.update(&config, [("v1", observation(now.millis()))], now);
        assert_eq!(update.recorded, 1);
    }

    let vehicle = history.get("v1").unwrap();
    assert_eq!(vehicle.len(), 21);
    assert_eq!(vehicle.first().map(|p| p.timestamp), Some(Timestamp::from_secs(600)));
    assert_eq!(history.average_speed_of("v1"), Some(Speed::from_mps(5.0)));

    // invalid positions are rejected but keep the vehicle alive
    let invalid = ObservedPosition {
        coordinate: Coordinate::new(f64::NAN, 52.52),
        ..observation(1_500_000)
    };
    let now = Timestamp::from_secs(1_500);
    let update = history.update(&config, [("v1", invalid)], now);
    assert_eq!(update.rejected, 1);
    assert_eq!(update.evicted, 0);
    assert_eq!(history.len(), 1);

    let update = history.update(&config, [], Timestamp::from_secs(1_800));
    assert_eq!(update.evicted, 1);
    assert!(history.is_empty());
}

#[test]
fn history_rejects_out_of_range() {
    let mut history = HistoryStore::new();
    let coordinate = Coordinate::new(200.0, 52.52);

    assert_eq!(
        history.record(
            "v1",
            ObservedPosition {
                coordinate,
                ..observation(0)
            }
        ),
        Err(RecordError::InvalidCoordinate(coordinate))
    );
    assert!(history.is_empty());
}
