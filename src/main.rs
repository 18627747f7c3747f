//! Armada Timer server
//!
//! Hosts the station registry and exposes it over HTTP and WebSocket.

use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use armada_timer::api::{create_router, AppState};
use armada_timer::config::Config;
use armada_timer::logging::{init_logging, log_startup};
use armada_timer::services::{SessionRecorder, StationRegistry, SystemTimeProvider};
use armada_timer::storage::{FileStore, KeyValueStore, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;

    init_logging(config.log_format, &config.log_level);
    log_startup();
    config.log_config();

    let store: Arc<dyn KeyValueStore> = if config.ephemeral {
        warn!("Running with in-memory storage, state is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(
            FileStore::open(&config.data_dir)
                .await
                .context("failed to open data directory")?,
        )
    };
    let recorder = SessionRecorder::load(Arc::clone(&store)).await;
    let registry = StationRegistry::load(
        config.registry_settings()?,
        store,
        recorder,
        Arc::new(SystemTimeProvider::new()),
    )
    .await;

    let app = create_router(AppState::new(registry, config.export_filename.as_str())).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&config)),
    );

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Armada Timer listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Armada Timer stopped");
    Ok(())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origin = if config.cors_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(config.cors_origins.iter().filter_map(|origin| {
            origin
                .parse::<HeaderValue>()
                .inspect_err(|_| warn!("Ignoring invalid CORS origin: {}", origin))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(origin)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
