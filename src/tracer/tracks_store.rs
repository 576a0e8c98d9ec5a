//! Shared store of interaction records
//!
//! Instrumented agents append [`InteractionRecord`]s to a [`TracksStore`] while
//! a conversation runs; the recorder reads them back when the trace is
//! finalized. Cloning a store clones the handle, not the records, so every
//! clone appends to and reads from the same sequence.

use super::models::InteractionRecord;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Type alias for append callback functions
pub type RecordCallback = Arc<dyn Fn(&InteractionRecord) + Send + Sync>;

/// Append-only, insertion-ordered sequence of interaction records.
#[derive(Clone)]
pub struct TracksStore {
    records: Arc<Mutex<Vec<InteractionRecord>>>,
    on_append_callback: Option<RecordCallback>,
}

impl TracksStore {
    /// Create a new, empty store
    ///
    /// # Arguments
    ///
    /// * `on_append_callback` - Optional callback called whenever a record is appended
    pub fn new(on_append_callback: Option<RecordCallback>) -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            on_append_callback,
        }
    }

    /// Append a record.
    ///
    /// If a callback is configured, it is called with the record before it is stored.
    pub fn push(&self, record: InteractionRecord) {
        if let Some(callback) = &self.on_append_callback {
            callback(&record);
        }

        let mut records = self.records.lock().unwrap();
        records.push(record);
    }

    /// Build and append a record from its parts.
    pub fn record(
        &self,
        name: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        input: impl Into<Value>,
        output: impl Into<Value>,
    ) {
        self.push(InteractionRecord::new(name, start_time, end_time, input, output));
    }

    /// Copy of all records, in insertion order.
    pub fn snapshot(&self) -> Vec<InteractionRecord> {
        self.records.lock().unwrap().clone()
    }

    /// The last `n` records, in insertion order.
    pub fn last_n(&self, n: usize) -> Vec<InteractionRecord> {
        let records = self.records.lock().unwrap();
        let start_idx = records.len().saturating_sub(n);
        records[start_idx..].to_vec()
    }

    /// Names of the recorded agents, in insertion order.
    pub fn names(&self) -> Vec<String> {
        let records = self.records.lock().unwrap();
        records.iter().map(|r| r.name.clone()).collect()
    }

    /// Whether two handles point at the same underlying store.
    pub fn ptr_eq(&self, other: &TracksStore) -> bool {
        Arc::ptr_eq(&self.records, &other.records)
    }

    /// Remove every record, e.g. between two conversations.
    pub fn clear(&self) {
        let mut records = self.records.lock().unwrap();
        records.clear();
    }

    pub fn len(&self) -> usize {
        let records = self.records.lock().unwrap();
        records.len()
    }

    pub fn is_empty(&self) -> bool {
        let records = self.records.lock().unwrap();
        records.is_empty()
    }
}

impl Default for TracksStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Debug for TracksStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracksStore")
            .field("len", &self.len())
            .field("has_callback", &self.on_append_callback.is_some())
            .finish()
    }
}
