//! Models module for Armada Timer
//!
//! Contains all data models and their validation logic.

pub mod session_record;
pub mod station;
pub mod station_event;

// Re-export commonly used types
pub use session_record::SessionRecord;
pub use station::{format_timer, Station, StationMode, StationStatus};
pub use station_event::StationEvent;
