mod storage;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use storage::{FileSnapshotStorage, MemorySnapshotStorage, SnapshotStorage};

pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceFlow {
    Conversation,
    ImageRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub title: String,
    pub created_at: i64,
    pub preview: String,
    pub source_flow: SourceFlow,
}

impl HistoryEntry {
    pub fn new(title: impl Into<String>, preview: impl Into<String>, source_flow: SourceFlow) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            created_at: Utc::now().timestamp_millis(),
            preview: preview.into(),
            source_flow,
        }
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }
}

/// Bounded, newest-first log of completed generations.
///
/// Every mutation writes the whole sequence through to the injected storage.
/// A failed write leaves the in-memory change in place; the next successful
/// write brings storage back in line.
pub struct HistoryStore {
    storage: Box<dyn SnapshotStorage>,
    entries: Vec<HistoryEntry>,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl HistoryStore {
    /// Rehydrates from storage. Unreadable or malformed snapshots yield an
    /// empty store.
    pub fn load<S: SnapshotStorage + 'static>(storage: S) -> Self {
        let entries = match storage.read() {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
                Ok(mut entries) => {
                    entries.truncate(HISTORY_LIMIT);
                    entries
                }
                Err(err) => {
                    tracing::warn!(error = %err, "discarding malformed history snapshot");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                let message = format!("{err:#}");
                tracing::warn!(error = %message, "history snapshot unreadable");
                Vec::new()
            }
        };
        tracing::debug!(count = entries.len(), "history loaded");
        Self {
            storage: Box::new(storage),
            entries,
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        self.entries.as_slice()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn append(&mut self, entry: HistoryEntry) -> anyhow::Result<()> {
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_LIMIT);
        let snapshot = serde_json::to_string(&self.entries)?;
        self.storage.write(&snapshot)
    }

    pub fn clear(&mut self) -> anyhow::Result<()> {
        self.entries.clear();
        self.storage.remove()
    }
}

/// First `max_chars` characters of `text`, char-boundary safe.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
