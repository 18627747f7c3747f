//! Station Model
//!
//! One rentable computer in the venue and its current timer state.
//! Includes the tick computation and the idle invariant helpers.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Milliseconds in one rental hour
pub const HOUR_MILLIS: u64 = 60 * 60 * 1000;

/// Smallest number of hours a fixed rental can be started with
pub const MIN_FIXED_HOURS: u32 = 1;

/// Largest number of hours a fixed rental can be started with
pub const MAX_FIXED_HOURS: u32 = 12;

/// How a running station counts time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum StationMode {
    /// Counts down from a fixed number of hours
    #[serde(rename = "fixed")]
    #[strum(serialize = "fixed")]
    Fixed,
    /// Counts up with no limit
    #[serde(rename = "free")]
    #[strum(serialize = "free")]
    Open,
}

/// Display label of a station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
pub enum StationStatus {
    #[default]
    #[serde(rename = "Libre")]
    #[strum(serialize = "Libre")]
    Free,
    #[serde(rename = "Ocupada")]
    #[strum(serialize = "Ocupada")]
    Busy,
}

/// Result of recomputing a running station's timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Station keeps running with the new timer value
    Running(u64),
    /// Fixed time ran out
    Expired,
    /// Station was not running, nothing to compute
    Idle,
}

/// A rentable station and its timer state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    /// Stable id, 1..=N
    pub id: u32,

    /// Displayed remaining (fixed) or elapsed (open) time in milliseconds
    pub timer: u64,

    /// Whether a rental is in progress
    pub running: bool,

    /// Counting mode, `None` when idle
    pub mode: Option<StationMode>,

    /// Derived label, Busy iff running
    pub status: StationStatus,

    /// Unix timestamp in milliseconds of the last start
    pub start_time: Option<i64>,

    /// Current occupant
    pub user_name: String,

    /// Length of a fixed rental in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_duration: Option<u64>,
}

impl Station {
    /// Create an idle station
    pub fn new(id: u32) -> Self {
        Self {
            id,
            timer: 0,
            running: false,
            mode: None,
            status: StationStatus::Free,
            start_time: None,
            user_name: String::new(),
            fixed_duration: None,
        }
    }

    /// Create the default set of `count` idle stations numbered from 1
    pub fn defaults(count: u32) -> Vec<Self> {
        (1..=count).map(Self::new).collect()
    }

    /// Begin a fixed rental of `hours` at `now_millis`
    pub fn begin_fixed(&mut self, hours: u32, user_name: String, now_millis: i64) {
        let duration = u64::from(hours) * HOUR_MILLIS;
        self.begin(StationMode::Fixed, user_name, now_millis);
        self.fixed_duration = Some(duration);
        self.timer = duration;
    }

    /// Begin an open-ended rental at `now_millis`
    pub fn begin_open(&mut self, user_name: String, now_millis: i64) {
        self.begin(StationMode::Open, user_name, now_millis);
        self.fixed_duration = None;
        self.timer = 0;
    }

    fn begin(&mut self, mode: StationMode, user_name: String, now_millis: i64) {
        self.running = true;
        self.mode = Some(mode);
        self.status = StationStatus::Busy;
        self.start_time = Some(now_millis);
        self.user_name = user_name;
    }

    /// Return the station to its idle state
    pub fn reset(&mut self) {
        *self = Self::new(self.id);
    }

    /// Milliseconds since the last start, zero when idle or when the clock moved backwards
    pub fn elapsed_millis(&self, now_millis: i64) -> u64 {
        self.start_time
            .and_then(|start| now_millis.checked_sub(start))
            .and_then(|elapsed| u64::try_from(elapsed).ok())
            .unwrap_or(0)
    }

    /// Recompute the timer from the wall clock
    ///
    /// Does not reset the station on expiry; the caller owns that transition
    /// so it can cancel the tick task first.
    pub fn refresh(&mut self, now_millis: i64) -> TickOutcome {
        if !self.running {
            return TickOutcome::Idle;
        }

        let elapsed = self.elapsed_millis(now_millis);
        match self.mode {
            Some(StationMode::Fixed) => {
                let remaining = self.fixed_duration.unwrap_or(0).saturating_sub(elapsed);
                self.timer = remaining;
                if remaining == 0 {
                    TickOutcome::Expired
                } else {
                    TickOutcome::Running(remaining)
                }
            }
            Some(StationMode::Open) => {
                self.timer = self.timer.max(elapsed);
                TickOutcome::Running(self.timer)
            }
            None => TickOutcome::Idle,
        }
    }

    /// Seconds of rental actually used so far, capped at the fixed duration
    pub fn used_seconds(&self, now_millis: i64) -> u64 {
        let elapsed = self.elapsed_millis(now_millis);
        let used = match (self.mode, self.fixed_duration) {
            (Some(StationMode::Fixed), Some(duration)) => elapsed.min(duration),
            _ => elapsed,
        };
        used / 1000
    }

    /// When a fixed rental ends
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        if self.mode != Some(StationMode::Fixed) {
            return None;
        }
        let start = self.start_time?;
        let duration = i64::try_from(self.fixed_duration?).ok()?;
        Utc.timestamp_millis_opt(start.checked_add(duration)?).single()
    }

    /// Whether the idle invariant holds
    pub fn is_consistent(&self) -> bool {
        let busy = self.status == StationStatus::Busy;
        if self.running {
            self.mode.is_some()
                && self.start_time.is_some()
                && busy
                && (self.mode != Some(StationMode::Fixed)
                    || self.fixed_duration.is_some_and(|d| d > 0))
        } else {
            self.mode.is_none()
                && self.start_time.is_none()
                && !busy
                && self.timer == 0
                && self.user_name.is_empty()
        }
    }

    /// Repair a loaded record so the idle invariant holds
    ///
    /// A start time before the epoch or after `now_millis` also resets the
    /// record. Returns `true` when the record had to be reset.
    pub fn normalize(&mut self, now_millis: i64) -> bool {
        let start_plausible = self
            .start_time
            .is_none_or(|start| (0..=now_millis).contains(&start));
        if self.is_consistent() && start_plausible {
            return false;
        }
        self.reset();
        true
    }
}

/// Format milliseconds as `HH:MM:SS`; hours are not wrapped at 24
pub fn format_timer(millis: u64) -> String {
    let total_seconds = millis / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
