//! Shared setup for API tests

use std::sync::Arc;

use armada_timer::api::{create_router, AppState};
use armada_timer::services::{
    MockTimeProvider, RegistrySettings, SessionRecorder, StationRegistry,
};
use armada_timer::storage::MemoryStore;
use axum_test::TestServer;
use chrono_tz::Tz;

pub const EXPORT_FILENAME: &str = "historial_armada.csv";

pub struct TestApp {
    pub server: TestServer,
    pub clock: MockTimeProvider,
    pub registry: StationRegistry,
}

/// Router over an in-memory store, clock at 2024-01-01 10:00:00 UTC
pub async fn create_test_app() -> TestApp {
    let clock = MockTimeProvider::at_ymd_hms(2024, 1, 1, 10, 0, 0);
    let store = Arc::new(MemoryStore::new());
    let recorder = SessionRecorder::load(store.clone()).await;
    let registry = StationRegistry::load(
        RegistrySettings {
            timezone: Tz::UTC,
            ..RegistrySettings::default()
        },
        store,
        recorder,
        Arc::new(clock.clone()),
    )
    .await;

    let app = create_router(AppState::new(registry.clone(), EXPORT_FILENAME));
    TestApp {
        server: TestServer::new(app).unwrap(),
        clock,
        registry,
    }
}
