//! Station Event Model
//!
//! Domain events emitted by the registry for notification consumers.

use serde::{Deserialize, Serialize};

use super::session_record::SessionRecord;
use super::station::StationMode;

/// Events published on the registry's broadcast channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StationEvent {
    /// A rental began
    Started {
        station_id: u32,
        mode: StationMode,
        user_name: String,
    },
    /// A running station's timer was recomputed
    Tick { station_id: u32, timer: u64 },
    /// A rental was stopped explicitly
    Stopped {
        station_id: u32,
        session: Option<SessionRecord>,
    },
    /// Fixed time ran out and the station went idle on its own
    Expired { station_id: u32, user_name: String },
    /// Every station was returned to idle
    Reset,
    /// The session history was wiped
    HistoryCleared,
}

impl StationEvent {
    /// User-facing notification text for events that warrant one
    pub fn notification(&self) -> Option<String> {
        match self {
            StationEvent::Expired { station_id, .. } => {
                Some(format!("La PC {station_id} se quedó sin tiempo."))
            }
            _ => None,
        }
    }
}
