//! Logging configuration for Armada Timer
//!
//! Structured logging through `tracing`, compact console output by default
//! and JSON lines when requested.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    #[default]
    Console,
    Json,
}

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(log_level: &str) -> String {
    format!("armada_timer={log_level},tower_http={log_level}")
}

/// Initialize the application logging system
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_logging(format: LogFormat, log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(log_level)));

    let layer = match format {
        LogFormat::Json => json_layer().boxed(),
        LogFormat::Console => console_layer().boxed(),
    };

    if Registry::default().with(layer.with_filter(env_filter)).try_init().is_ok() {
        tracing::info!(%format, "Logging system initialized");
    }
}

/// JSON logging layer for production
fn json_layer() -> impl Layer<Registry> {
    fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
}

/// Console logging layer for development
fn console_layer() -> impl Layer<Registry> {
    fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_ansi(true)
}

/// Create a span for one WebSocket subscriber
#[macro_export]
macro_rules! websocket_span {
    ($connection_id:expr) => {
        tracing::info_span!(
            "websocket_connection",
            connection_id = %$connection_id,
            events_sent = tracing::field::Empty,
        )
    };
}

/// Log application startup
pub fn log_startup() {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Armada Timer starting up"
    );
}
