//! Session Recorder
//!
//! Append-only log of completed rentals, persisted under the history key
//! and exportable as CSV.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::models::session_record::SessionRecord;
use crate::storage::{KeyValueStore, HISTORY_KEY};

/// Header row of the exported CSV document
pub const CSV_HEADER: &str = "PC,Usuario,Inicio,Duración (segundos)";

/// Owner of the session history
#[derive(Clone)]
pub struct SessionRecorder {
    records: Arc<RwLock<Vec<SessionRecord>>>,
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SessionRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRecorder").finish_non_exhaustive()
    }
}

impl SessionRecorder {
    /// Restore the history from `store`, starting empty when absent or unreadable
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let records = match store.get(HISTORY_KEY).await {
            Ok(Some(json)) => match serde_json::from_str::<Vec<SessionRecord>>(&json) {
                Ok(records) => records,
                Err(e) => {
                    warn!("Stored session history is malformed, starting empty: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Could not read session history, starting empty: {}", e);
                Vec::new()
            }
        };

        info!("Loaded {} session record(s)", records.len());
        Self {
            records: Arc::new(RwLock::new(records)),
            store,
        }
    }

    /// Append a completed session
    pub async fn record(&self, entry: SessionRecord) {
        let mut records = self.records.write().await;
        debug!(pc = entry.pc, user = %entry.user, duration = entry.duration, "recording session");
        records.push(entry);
        self.persist(&records).await;
    }

    /// Snapshot of every record in insertion order
    pub async fn history(&self) -> Vec<SessionRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Wipe the whole history
    pub async fn clear(&self) {
        let mut records = self.records.write().await;
        info!("Clearing {} session record(s)", records.len());
        records.clear();
        self.persist(&records).await;
    }

    /// Render the history as a UTF-8 CSV document
    ///
    /// Fields are written verbatim; a user name containing a comma shifts
    /// the remaining columns of its row.
    pub async fn export_csv(&self) -> Vec<u8> {
        let records = self.records.read().await;
        render_csv(&records).into_bytes()
    }

    async fn persist(&self, records: &[SessionRecord]) {
        let json = match serde_json::to_string(records) {
            Ok(json) => json,
            Err(e) => {
                warn!("Could not serialize session history: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(HISTORY_KEY, &json).await {
            warn!("Could not persist session history: {}", e);
        }
    }
}

/// Header line, a newline, then one line per record joined by newlines
pub fn render_csv(records: &[SessionRecord]) -> String {
    let rows = records
        .iter()
        .map(SessionRecord::csv_line)
        .collect::<Vec<_>>()
        .join("\n");
    format!("{CSV_HEADER}\n{rows}")
}
