//! Armada Timer
//!
//! Rental timers for a fixed set of venue stations, with a persisted
//! session history exportable as CSV.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod storage;
pub mod websocket;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{SessionRecord, Station, StationEvent, StationMode, StationStatus};
pub use services::{SessionRecorder, StationRegistry};
