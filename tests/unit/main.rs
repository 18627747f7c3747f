//! Unit Tests
//!
//! Registry behaviour driven through paused tokio time and a mock clock.

mod common;
mod test_station_registry;
