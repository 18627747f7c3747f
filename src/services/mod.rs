//! Services module for Armada Timer
//!
//! Contains all business logic and service implementations.

pub mod session_recorder;
pub mod station_registry;
pub mod time_provider;

// Re-export commonly used services
pub use session_recorder::SessionRecorder;
pub use station_registry::{RegistryError, RegistrySettings, StartMode, StationRegistry, StopOutcome};
pub use time_provider::{MockTimeProvider, SystemTimeProvider, TimeProvider};
