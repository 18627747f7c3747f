//! Session Record Model
//!
//! One completed rental, as kept in the downloadable history.

use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Format used for the human-readable start column
pub const START_FORMAT: &str = "%-d/%-m/%y, %H:%M:%S";

/// Completed rental session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Station id
    pub pc: u32,

    /// Occupant name
    pub user: String,

    /// Human-readable start time
    pub start: String,

    /// Rental length in whole seconds
    pub duration: u64,
}

impl SessionRecord {
    /// Build a record, rendering `started_at_millis` in `timezone`
    pub fn new(
        pc: u32,
        user: impl Into<String>,
        started_at_millis: i64,
        duration: u64,
        timezone: Tz,
    ) -> Self {
        Self {
            pc,
            user: user.into(),
            start: format_start(started_at_millis, timezone),
            duration,
        }
    }

    /// One CSV line, fields joined verbatim
    ///
    /// Commas inside `user` are not escaped and will shift the columns.
    pub fn csv_line(&self) -> String {
        format!("{},{},{},{}", self.pc, self.user, self.start, self.duration)
    }
}

/// Render a Unix millisecond timestamp as `D/M/YY, HH:MM:SS` in `timezone`
pub fn format_start(millis: i64, timezone: Tz) -> String {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(utc) => utc.with_timezone(&timezone).format(START_FORMAT).to_string(),
        None => millis.to_string(),
    }
}
