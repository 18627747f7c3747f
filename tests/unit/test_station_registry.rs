use armada_timer::models::station::HOUR_MILLIS;
use armada_timer::services::{RegistryError, RegistrySettings};
use armada_timer::storage::{KeyValueStore, MemoryStore, STATIONS_KEY};
use armada_timer::{StationEvent, StationMode, StationStatus};
use std::sync::Arc;

use crate::common::{default_clock, drain, run_for, settings, Harness};

#[tokio::test(start_paused = true)]
async fn test_fixed_countdown_follows_wall_clock() {
    let h = Harness::new().await;
    h.registry.start_fixed(1, 1, "Ana").await.unwrap();

    h.clock.advance_millis(5_000);
    run_for(1_100).await;
    assert_eq!(h.registry.station(1).await.unwrap().timer, HOUR_MILLIS - 5_000);

    // Tick timing drift does not matter, only the captured start does
    h.clock.advance_millis(60_000);
    run_for(1_000).await;
    assert_eq!(h.registry.station(1).await.unwrap().timer, HOUR_MILLIS - 65_000);
    assert!(h.registry.station(1).await.unwrap().running);
}

#[tokio::test(start_paused = true)]
async fn test_fixed_station_expires_on_its_own() {
    let h = Harness::new().await;
    let mut events = h.registry.subscribe();

    h.registry.start_fixed(2, 1, "Luis").await.unwrap();
    h.clock.advance_hours(1);
    run_for(1_100).await;

    let station = h.registry.station(2).await.unwrap();
    assert!(!station.running);
    assert_eq!(station.status, StationStatus::Free);
    assert_eq!(station.mode, None);
    assert_eq!(station.timer, 0);
    assert!(station.is_consistent());
    assert_eq!(h.registry.active_tick_tasks().await, 0);

    // Expiry is announced but not recorded
    assert!(h.registry.recorder().is_empty().await);
    let events = drain(&mut events);
    let expired = StationEvent::Expired {
        station_id: 2,
        user_name: "Luis".to_string(),
    };
    assert!(events.contains(&expired));
    assert_eq!(
        expired.notification().as_deref(),
        Some("La PC 2 se quedó sin tiempo.")
    );
}

#[tokio::test(start_paused = true)]
async fn test_expired_station_can_be_started_again() {
    let h = Harness::new().await;
    h.registry.start_fixed(3, 1, "Ana").await.unwrap();
    h.clock.advance_hours(2);
    run_for(1_100).await;

    let station = h.registry.start_open(3, "Luis").await.unwrap();
    assert_eq!(station.mode, Some(StationMode::Open));
    assert_eq!(h.registry.active_tick_tasks().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_open_timer_is_non_decreasing() {
    let h = Harness::new().await;
    h.registry.start_open(4, "Ana").await.unwrap();

    // Keep reads off the tick instants
    run_for(100).await;

    let mut last = 0;
    for step in [3_000, 2_000, 0, 10_000] {
        h.clock.advance_millis(step);
        run_for(1_000).await;
        let timer = h.registry.station(4).await.unwrap().timer;
        assert!(timer >= last);
        last = timer;
    }
    assert_eq!(last, 15_000);

    // A clock stepping backwards does not shrink the display
    h.clock.advance_millis(-4_000);
    run_for(1_000).await;
    assert_eq!(h.registry.station(4).await.unwrap().timer, 15_000);
}

#[tokio::test(start_paused = true)]
async fn test_stop_appends_exactly_one_record() {
    let h = Harness::new().await;
    h.registry.start_open(5, "Ana").await.unwrap();
    h.clock.advance_millis(125_700);
    run_for(1_000).await;

    let outcome = h.registry.stop(5).await.unwrap();
    assert_eq!(outcome.session.as_ref().unwrap().duration, 125);

    // Stopping again is a plain reset
    let outcome = h.registry.stop(5).await.unwrap();
    assert!(outcome.session.is_none());

    let history = h.registry.recorder().history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].pc, 5);
    assert_eq!(history[0].user, "Ana");
    assert_eq!(history[0].start, "1/1/24, 10:00:00");
}

#[tokio::test(start_paused = true)]
async fn test_fixed_stop_records_time_used_not_remaining() {
    let h = Harness::new().await;
    h.registry.start_fixed(6, 2, "Ana").await.unwrap();
    h.clock.advance_seconds(600);
    run_for(1_100).await;

    let outcome = h.registry.stop(6).await.unwrap();
    assert_eq!(outcome.session.unwrap().duration, 600);
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_ticking() {
    let h = Harness::new().await;
    let mut events = h.registry.subscribe();

    h.registry.start_open(7, "Ana").await.unwrap();
    h.registry.stop(7).await.unwrap();
    assert_eq!(h.registry.active_tick_tasks().await, 0);

    h.clock.advance_seconds(10);
    run_for(5_000).await;

    let station = h.registry.station(7).await.unwrap();
    assert_eq!(station.timer, 0);
    assert!(!station.running);
    assert!(!drain(&mut events)
        .iter()
        .any(|e| matches!(e, StationEvent::Tick { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_stop_has_single_task() {
    let h = Harness::new().await;
    h.registry.start_open(1, "Ana").await.unwrap();
    h.registry.stop(1).await.unwrap();
    h.registry.start_open(1, "Luis").await.unwrap();
    assert_eq!(h.registry.active_tick_tasks().await, 1);

    let mut events = h.registry.subscribe();
    h.clock.advance_seconds(1);
    run_for(1_100).await;

    let ticks = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, StationEvent::Tick { station_id: 1, .. }))
        .count();
    assert_eq!(ticks, 1);
}

#[tokio::test(start_paused = true)]
async fn test_double_start_is_rejected() {
    let h = Harness::new().await;
    h.registry.start_fixed(8, 3, "Ana").await.unwrap();

    assert_eq!(
        h.registry.start_open(8, "Luis").await,
        Err(RegistryError::AlreadyRunning(8))
    );
    let station = h.registry.station(8).await.unwrap();
    assert_eq!(station.mode, Some(StationMode::Fixed));
    assert_eq!(station.timer, 3 * HOUR_MILLIS);
    assert_eq!(h.registry.active_tick_tasks().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_reset_all_keeps_history() {
    let h = Harness::new().await;
    h.registry.start_open(1, "Ana").await.unwrap();
    h.registry.stop(1).await.unwrap();
    for id in [2, 3, 4] {
        h.registry.start_fixed(id, 1, "Luis").await.unwrap();
    }
    assert_eq!(h.registry.active_tick_tasks().await, 3);

    h.registry.reset_all().await;

    let stations = h.registry.stations().await;
    assert_eq!(stations.len(), 10);
    assert!(stations.iter().all(|s| !s.running && s.is_consistent()));
    assert_eq!(h.registry.active_tick_tasks().await, 0);
    assert_eq!(h.registry.recorder().len().await, 1);
    assert_eq!(h.store.get(STATIONS_KEY).await.unwrap(), None);

    h.clock.advance_hours(2);
    run_for(3_000).await;
    assert!(h.registry.stations().await.iter().all(|s| s.timer == 0));
}

#[tokio::test(start_paused = true)]
async fn test_reset_all_uses_configured_count() {
    let h = Harness::with_store(
        Arc::new(MemoryStore::new()),
        default_clock(),
        RegistrySettings {
            station_count: 4,
            ..settings()
        },
    )
    .await;
    assert_eq!(h.registry.stations().await.len(), 4);
    assert_eq!(
        h.registry.start_open(5, "Ana").await,
        Err(RegistryError::NotFound(5))
    );

    h.registry.reset_all().await;
    let ids: Vec<u32> = h.registry.stations().await.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[tokio::test(start_paused = true)]
async fn test_clear_history() {
    let h = Harness::new().await;
    let mut events = h.registry.subscribe();
    h.registry.start_open(1, "Ana").await.unwrap();
    h.registry.stop(1).await.unwrap();

    h.registry.clear_history().await;
    assert!(h.registry.recorder().is_empty().await);
    assert!(drain(&mut events).contains(&StationEvent::HistoryCleared));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_registry_ends_ticks() {
    let h = Harness::new().await;
    h.registry.start_open(1, "Ana").await.unwrap();
    let store = h.store.clone();
    let before = store.get(STATIONS_KEY).await.unwrap();
    drop(h);

    run_for(3_000).await;
    assert_eq!(store.get(STATIONS_KEY).await.unwrap(), before);
}
