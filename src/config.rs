//! Configuration management for Armada Timer
//!
//! Handles environment variables and application settings.

use chrono_tz::Tz;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::logging::LogFormat;
use crate::services::station_registry::RegistrySettings;

/// Prefix of every environment variable read by `Config::from_env`
pub const ENV_PREFIX: &str = "ARMADA_TIMER_";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Directory holding the station and history documents
    pub data_dir: PathBuf,

    /// Keep state in memory only; nothing survives a restart
    pub ephemeral: bool,

    /// Number of stations in the venue
    pub station_count: u32,

    /// Tick period of running stations in milliseconds
    pub tick_interval_ms: u64,

    /// IANA zone used to render session start times
    pub timezone: String,

    /// File name offered for the CSV download
    pub export_filename: String,

    /// Environment (development, production)
    pub environment: String,

    /// Log level
    pub log_level: String,

    /// Log output format
    pub log_format: LogFormat,

    /// CORS origins (empty means allow all)
    pub cors_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            data_dir: PathBuf::from("./data"),
            ephemeral: false,
            station_count: 10,
            tick_interval_ms: 1000,
            timezone: "America/Argentina/Buenos_Aires".to_string(),
            export_filename: "historial_armada.csv".to_string(),
            environment: "development".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Console,
            cors_origins: vec![],
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut config = Self::default();

        // Server configuration
        if let Some(host) = var("HOST") {
            config.host = host;
        }

        if let Some(port) = var("PORT") {
            config.port = port.parse().map_err(|_| ConfigError::InvalidPort(port))?;
        }

        // Storage
        if let Some(data_dir) = var("DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Some(ephemeral) = var("EPHEMERAL") {
            config.ephemeral = match ephemeral.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => return Err(ConfigError::InvalidFlag("EPHEMERAL", ephemeral)),
            };
        }

        // Stations
        if let Some(count) = var("STATION_COUNT") {
            config.station_count = count
                .parse()
                .map_err(|_| ConfigError::InvalidStationCount(count))?;
        }

        if let Some(interval) = var("TICK_INTERVAL_MS") {
            config.tick_interval_ms = interval
                .parse()
                .map_err(|_| ConfigError::InvalidTickInterval(interval))?;
        }

        if let Some(timezone) = var("TIMEZONE") {
            config.timezone = timezone;
        }

        if let Some(filename) = var("EXPORT_FILENAME") {
            config.export_filename = filename;
        }

        // Environment
        if let Some(environment) = var("ENVIRONMENT") {
            config.environment = environment;
        }

        // Logging
        if let Some(log_level) = var("LOG_LEVEL") {
            config.log_level = log_level;
        }

        if let Some(format) = var("LOG_FORMAT") {
            config.log_format = format
                .parse()
                .map_err(|_| ConfigError::InvalidLogFormat(format))?;
        }

        // CORS origins
        if let Some(cors_origins) = var("CORS_ORIGINS") {
            config.cors_origins = cors_origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port.to_string()));
        }

        if self.station_count == 0 {
            return Err(ConfigError::InvalidStationCount(self.station_count.to_string()));
        }

        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidTickInterval(self.tick_interval_ms.to_string()));
        }

        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDataDir);
        }

        if self.export_filename.trim().is_empty()
            || self.export_filename.contains(['"', '/', '\\'])
        {
            return Err(ConfigError::InvalidExportFilename(self.export_filename.clone()));
        }

        self.parsed_timezone()?;

        Ok(())
    }

    /// Parsed time zone
    pub fn parsed_timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))
    }

    /// Settings for the station registry
    pub fn registry_settings(&self) -> Result<RegistrySettings, ConfigError> {
        Ok(RegistrySettings {
            station_count: self.station_count,
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            timezone: self.parsed_timezone()?,
        })
    }

    /// Get server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Log configuration
    pub fn log_config(&self) {
        info!("Configuration loaded:");
        info!("  Environment: {}", self.environment);
        info!("  Bind address: {}", self.bind_address());
        if self.ephemeral {
            info!("  Storage: in memory");
        } else {
            info!("  Data directory: {:?}", self.data_dir);
        }
        info!("  Stations: {}", self.station_count);
        info!("  Tick interval: {}ms", self.tick_interval_ms);
        info!("  Timezone: {}", self.timezone);
        info!("  Export file name: {}", self.export_filename);
        info!("  Log level: {} ({})", self.log_level, self.log_format);
        info!("  CORS origins: {:?}", self.cors_origins);
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Invalid station count: {0}")]
    InvalidStationCount(String),

    #[error("Invalid tick interval: {0}")]
    InvalidTickInterval(String),

    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid export file name: {0}")]
    InvalidExportFilename(String),

    #[error("Invalid log format: {0}")]
    InvalidLogFormat(String),

    #[error("Invalid value for ARMADA_TIMER_{0}: {1}")]
    InvalidFlag(&'static str, String),

    #[error("Empty data directory")]
    EmptyDataDir,
}
