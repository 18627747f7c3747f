//! Shared test harness

use std::sync::Arc;

use armada_timer::services::{
    MockTimeProvider, RegistrySettings, SessionRecorder, StationRegistry,
};
use armada_timer::storage::MemoryStore;
use armada_timer::StationEvent;
use chrono_tz::Tz;
use tokio::sync::broadcast;

pub struct Harness {
    pub clock: MockTimeProvider,
    pub store: Arc<MemoryStore>,
    pub registry: StationRegistry,
}

impl Harness {
    /// Fresh registry on an empty store, clock at 2024-01-01 10:00:00 UTC
    pub async fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), default_clock(), settings()).await
    }

    pub async fn with_store(
        store: Arc<MemoryStore>,
        clock: MockTimeProvider,
        settings: RegistrySettings,
    ) -> Self {
        let recorder = SessionRecorder::load(store.clone()).await;
        let registry =
            StationRegistry::load(settings, store.clone(), recorder, Arc::new(clock.clone())).await;
        Self {
            clock,
            store,
            registry,
        }
    }
}

pub fn default_clock() -> MockTimeProvider {
    MockTimeProvider::at_ymd_hms(2024, 1, 1, 10, 0, 0)
}

pub fn settings() -> RegistrySettings {
    RegistrySettings {
        timezone: Tz::UTC,
        ..RegistrySettings::default()
    }
}

/// Let the paused runtime run every tick due within `millis`
pub async fn run_for(millis: u64) {
    tokio::time::sleep(std::time::Duration::from_millis(millis)).await;
}

/// Everything currently queued on `events`
pub fn drain(events: &mut broadcast::Receiver<StationEvent>) -> Vec<StationEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}
