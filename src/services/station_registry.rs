//! Station Registry
//!
//! Owns the fixed set of stations, the per-station tick tasks, and the
//! transitions between idle and running. Every mutation is persisted
//! under the station key and announced on a broadcast channel.
//!
//! Writes are taken as numbered snapshots under the state lock and
//! stored after it is released; a snapshot older than the last one
//! written is skipped.
//!
//! A station has at most one live tick task. Each task carries the
//! generation it was spawned with; a tick whose generation no longer
//! matches the registry's entry for that station is discarded, so a tick
//! racing with `stop`/`reset_all` never touches the reset station.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono_tz::Tz;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::models::session_record::SessionRecord;
use crate::models::station::{
    Station, StationMode, TickOutcome, MAX_FIXED_HOURS, MIN_FIXED_HOURS,
};
use crate::models::station_event::StationEvent;
use crate::services::session_recorder::SessionRecorder;
use crate::services::time_provider::TimeProvider;
use crate::storage::{KeyValueStore, STATIONS_KEY};

/// Capacity of the event channel; slow subscribers miss older events
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Registry settings
#[derive(Debug, Clone, Copy)]
pub struct RegistrySettings {
    /// Number of stations created by default and by `reset_all`
    pub station_count: u32,
    /// Period of each station's tick task
    pub tick_interval: Duration,
    /// Zone used to render session start times
    pub timezone: Tz,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            station_count: 10,
            tick_interval: Duration::from_secs(1),
            timezone: chrono_tz::America::Argentina::Buenos_Aires,
        }
    }
}

/// How a rental should count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    Fixed { hours: u32 },
    Open,
}

impl StartMode {
    pub fn station_mode(self) -> StationMode {
        match self {
            StartMode::Fixed { .. } => StationMode::Fixed,
            StartMode::Open => StationMode::Open,
        }
    }
}

/// Registry errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Station {0} not found")]
    NotFound(u32),

    #[error("Station {0} is already running")]
    AlreadyRunning(u32),

    #[error("Invalid rental length {0}h (must be 1-12 hours)")]
    InvalidHours(u32),
}

/// Result of a `stop` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopOutcome {
    /// Station after it was returned to idle
    pub station: Station,
    /// Session appended to the history, if any
    pub session: Option<SessionRecord>,
}

struct TickTask {
    generation: u64,
    handle: JoinHandle<()>,
}

struct RegistryState {
    stations: Vec<Station>,
    tick_tasks: HashMap<u32, TickTask>,
    next_generation: u64,
    revision: u64,
}

/// Station list to store, taken under the state lock
struct StationsSnapshot {
    revision: u64,
    /// `None` removes the stored list
    stations: Option<Vec<Station>>,
}

impl RegistryState {
    fn snapshot(&mut self) -> StationsSnapshot {
        self.revision += 1;
        StationsSnapshot {
            revision: self.revision,
            stations: Some(self.stations.clone()),
        }
    }

    fn removal_snapshot(&mut self) -> StationsSnapshot {
        self.revision += 1;
        StationsSnapshot {
            revision: self.revision,
            stations: None,
        }
    }

    fn station_mut(&mut self, id: u32) -> Result<&mut Station, RegistryError> {
        self.stations
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(RegistryError::NotFound(id))
    }

    fn is_current(&self, id: u32, generation: u64) -> bool {
        self.tick_tasks
            .get(&id)
            .is_some_and(|task| task.generation == generation)
    }

    fn cancel_tick(&mut self, id: u32) -> bool {
        match self.tick_tasks.remove(&id) {
            Some(task) => {
                task.handle.abort();
                true
            }
            None => false,
        }
    }

    fn cancel_all_ticks(&mut self) -> usize {
        let count = self.tick_tasks.len();
        for (_, task) in self.tick_tasks.drain() {
            task.handle.abort();
        }
        count
    }
}

struct RegistryInner {
    state: Mutex<RegistryState>,
    /// Revision of the last snapshot handed to the store
    stored_revision: Mutex<u64>,
    recorder: SessionRecorder,
    store: Arc<dyn KeyValueStore>,
    time_provider: Arc<dyn TimeProvider>,
    events: broadcast::Sender<StationEvent>,
    settings: RegistrySettings,
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        self.state.get_mut().cancel_all_ticks();
    }
}

/// Shared handle to the station registry
#[derive(Clone)]
pub struct StationRegistry {
    inner: Arc<RegistryInner>,
}

impl std::fmt::Debug for StationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StationRegistry")
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}

impl StationRegistry {
    /// Restore the registry from `store`
    ///
    /// Missing or malformed data yields `station_count` idle stations.
    /// Stations stored as running resume ticking from their stored start.
    pub async fn load(
        settings: RegistrySettings,
        store: Arc<dyn KeyValueStore>,
        recorder: SessionRecorder,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        let now = time_provider.now_timestamp_millis();
        let stations = Self::read_stations(store.as_ref(), settings.station_count, now).await;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let registry = Self {
            inner: Arc::new(RegistryInner {
                state: Mutex::new(RegistryState {
                    stations,
                    tick_tasks: HashMap::new(),
                    next_generation: 0,
                    revision: 0,
                }),
                stored_revision: Mutex::new(0),
                recorder,
                store,
                time_provider,
                events,
                settings,
            }),
        };

        let mut state = registry.inner.state.lock().await;
        let running: Vec<u32> = state
            .stations
            .iter()
            .filter(|s| s.running)
            .map(|s| s.id)
            .collect();
        for id in &running {
            registry.inner.spawn_tick(&mut state, *id);
        }
        info!(
            "Station registry ready: {} station(s), {} resumed",
            state.stations.len(),
            running.len()
        );
        drop(state);

        registry
    }

    async fn read_stations(
        store: &dyn KeyValueStore,
        station_count: u32,
        now_millis: i64,
    ) -> Vec<Station> {
        let json = match store.get(STATIONS_KEY).await {
            Ok(Some(json)) => json,
            Ok(None) => return Station::defaults(station_count),
            Err(e) => {
                warn!("Could not read stored stations, using defaults: {}", e);
                return Station::defaults(station_count);
            }
        };

        let mut stations = match serde_json::from_str::<Vec<Station>>(&json) {
            Ok(stations) if !stations.is_empty() => stations,
            Ok(_) => return Station::defaults(station_count),
            Err(e) => {
                warn!("Stored stations are malformed, using defaults: {}", e);
                return Station::defaults(station_count);
            }
        };

        let mut seen = HashSet::new();
        if !stations.iter().all(|s| s.id >= 1 && seen.insert(s.id)) {
            warn!("Stored stations have duplicate or invalid ids, using defaults");
            return Station::defaults(station_count);
        }

        for station in &mut stations {
            if station.normalize(now_millis) {
                warn!("Station {} was stored in an inconsistent state, reset to idle", station.id);
            }
        }
        stations
    }

    /// Settings the registry was created with
    pub fn settings(&self) -> RegistrySettings {
        self.inner.settings
    }

    /// Snapshot of all stations in id order
    pub async fn stations(&self) -> Vec<Station> {
        self.inner.state.lock().await.stations.clone()
    }

    /// Snapshot of one station
    pub async fn station(&self, id: u32) -> Result<Station, RegistryError> {
        self.inner.state.lock().await.station_mut(id).map(|s| s.clone())
    }

    /// Number of live tick tasks
    pub async fn active_tick_tasks(&self) -> usize {
        self.inner.state.lock().await.tick_tasks.len()
    }

    /// Receive every event published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<StationEvent> {
        self.inner.events.subscribe()
    }

    /// Session history owner
    pub fn recorder(&self) -> &SessionRecorder {
        &self.inner.recorder
    }

    /// Start a fixed rental of `hours` hours
    pub async fn start_fixed(
        &self,
        id: u32,
        hours: u32,
        user_name: impl Into<String>,
    ) -> Result<Station, RegistryError> {
        self.start(id, StartMode::Fixed { hours }, user_name).await
    }

    /// Start an open-ended rental
    pub async fn start_open(
        &self,
        id: u32,
        user_name: impl Into<String>,
    ) -> Result<Station, RegistryError> {
        self.start(id, StartMode::Open, user_name).await
    }

    /// Start a rental on an idle station
    ///
    /// A running station is rejected with `AlreadyRunning` and left
    /// untouched, including its tick task.
    pub async fn start(
        &self,
        id: u32,
        mode: StartMode,
        user_name: impl Into<String>,
    ) -> Result<Station, RegistryError> {
        if let StartMode::Fixed { hours } = mode {
            if !(MIN_FIXED_HOURS..=MAX_FIXED_HOURS).contains(&hours) {
                return Err(RegistryError::InvalidHours(hours));
            }
        }

        let user_name = user_name.into();
        let now = self.inner.time_provider.now_timestamp_millis();
        let mut state = self.inner.state.lock().await;

        let station = state.station_mut(id)?;
        if station.running {
            return Err(RegistryError::AlreadyRunning(id));
        }
        match mode {
            StartMode::Fixed { hours } => station.begin_fixed(hours, user_name.clone(), now),
            StartMode::Open => station.begin_open(user_name.clone(), now),
        }
        let started = station.clone();

        self.inner.spawn_tick(&mut state, id);
        let snapshot = state.snapshot();
        drop(state);
        self.inner.persist_stations(snapshot).await;

        info!(station = id, mode = %mode.station_mode(), user = %user_name, "station started");
        self.inner.emit(StationEvent::Started {
            station_id: id,
            mode: mode.station_mode(),
            user_name,
        });
        Ok(started)
    }

    /// Stop a station and return it to idle
    ///
    /// A running station with an occupant name adds one session to the
    /// history, sized by the time actually used. Stopping an idle station
    /// only resets it.
    pub async fn stop(&self, id: u32) -> Result<StopOutcome, RegistryError> {
        let now = self.inner.time_provider.now_timestamp_millis();
        let mut state = self.inner.state.lock().await;

        let station = state.station_mut(id)?;
        let session = match station.start_time {
            Some(started_at) if station.running && !station.user_name.is_empty() => {
                Some(SessionRecord::new(
                    id,
                    station.user_name.clone(),
                    started_at,
                    station.used_seconds(now),
                    self.inner.settings.timezone,
                ))
            }
            _ => None,
        };
        station.reset();
        let stopped = station.clone();

        state.cancel_tick(id);
        let snapshot = state.snapshot();
        drop(state);
        self.inner.persist_stations(snapshot).await;

        if let Some(session) = &session {
            self.inner.recorder.record(session.clone()).await;
        }

        info!(station = id, recorded = session.is_some(), "station stopped");
        self.inner.emit(StationEvent::Stopped {
            station_id: id,
            session: session.clone(),
        });
        Ok(StopOutcome {
            station: stopped,
            session,
        })
    }

    /// Cancel every tick task and return all stations to idle
    ///
    /// The stored station list is removed; the history is kept.
    pub async fn reset_all(&self) {
        let mut state = self.inner.state.lock().await;
        let cancelled = state.cancel_all_ticks();
        state.stations = Station::defaults(self.inner.settings.station_count);
        let snapshot = state.removal_snapshot();
        drop(state);
        self.inner.persist_stations(snapshot).await;

        info!(cancelled, "all stations reset");
        self.inner.emit(StationEvent::Reset);
    }

    /// Wipe the session history; stations are untouched
    pub async fn clear_history(&self) {
        self.inner.recorder.clear().await;
        self.inner.emit(StationEvent::HistoryCleared);
    }
}

impl RegistryInner {
    /// Replace any tick task for `id` with a new one
    fn spawn_tick(self: &Arc<Self>, state: &mut RegistryState, id: u32) {
        state.cancel_tick(id);

        let generation = state.next_generation;
        state.next_generation += 1;

        let handle = tokio::spawn(run_tick_loop(
            Arc::downgrade(self),
            id,
            generation,
            self.settings.tick_interval,
        ));
        state.tick_tasks.insert(id, TickTask { generation, handle });
        debug!(station = id, generation, "tick task spawned");
    }

    /// Recompute one station; returns `false` once the task should end
    async fn apply_tick(&self, id: u32, generation: u64) -> bool {
        let now = self.time_provider.now_timestamp_millis();
        let mut state = self.state.lock().await;

        if !state.is_current(id, generation) {
            debug!(station = id, generation, "stale tick discarded");
            return false;
        }

        let Some(index) = state.stations.iter().position(|s| s.id == id) else {
            state.tick_tasks.remove(&id);
            return false;
        };
        let station = &mut state.stations[index];

        match station.refresh(now) {
            TickOutcome::Running(timer) => {
                let snapshot = state.snapshot();
                drop(state);
                self.persist_stations(snapshot).await;
                self.emit(StationEvent::Tick {
                    station_id: id,
                    timer,
                });
                true
            }
            TickOutcome::Expired => {
                let user_name = std::mem::take(&mut station.user_name);
                station.reset();
                // The task is ending on its own; drop the handle without aborting
                state.tick_tasks.remove(&id);
                let snapshot = state.snapshot();
                drop(state);
                self.persist_stations(snapshot).await;

                let event = StationEvent::Expired {
                    station_id: id,
                    user_name,
                };
                if let Some(message) = event.notification() {
                    warn!(station = id, "{}", message);
                }
                self.emit(event);
                false
            }
            TickOutcome::Idle => {
                state.tick_tasks.remove(&id);
                false
            }
        }
    }

    /// Store `snapshot` unless a newer one has already been stored
    async fn persist_stations(&self, snapshot: StationsSnapshot) {
        let mut stored_revision = self.stored_revision.lock().await;
        if *stored_revision >= snapshot.revision {
            debug!(revision = snapshot.revision, "stale station snapshot skipped");
            return;
        }
        *stored_revision = snapshot.revision;

        let Some(stations) = snapshot.stations else {
            if let Err(e) = self.store.remove(STATIONS_KEY).await {
                warn!("Could not clear stored stations: {}", e);
            }
            return;
        };
        let json = match serde_json::to_string(&stations) {
            Ok(json) => json,
            Err(e) => {
                warn!("Could not serialize stations: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(STATIONS_KEY, &json).await {
            warn!("Could not persist stations: {}", e);
        }
    }

    fn emit(&self, event: StationEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }
}

/// Periodic recomputation for one station
///
/// Holds only a weak reference so a dropped registry ends the loop.
async fn run_tick_loop(registry: Weak<RegistryInner>, id: u32, generation: u64, period: Duration) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let Some(inner) = registry.upgrade() else {
            break;
        };
        if !inner.apply_tick(id, generation).await {
            break;
        }
    }
    debug!(station = id, generation, "tick task finished");
}
