//! Concurrent in-memory Journal
//!
//! Reference implementation over `dashmap`. Three maps:
//!
//! - `entries`: identifier → payload (the store itself)
//! - `pins`: identifier → reader reference count
//! - `birth_index`: birth identifier → descendant payload identifiers,
//!   maintained on every `put` so the sweeper can tell an orphaned birth
//!   from an extended one without a full scan

use crate::Journal;
use causeway_core::{Error, Identifier, Result, StagePayload};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

/// In-memory, thread-safe, append-only journal.
#[derive(Default)]
pub struct MemoryJournal {
    entries: DashMap<Identifier, StagePayload>,
    pins: DashMap<Identifier, usize>,
    birth_index: DashMap<Identifier, Vec<Identifier>>,
}

impl MemoryJournal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn pinned(&self, id: &Identifier) -> bool {
        self.pins.get(id).map(|c| *c > 0).unwrap_or(false)
    }
}

impl Journal for MemoryJournal {
    fn get(&self, id: &Identifier) -> Result<Option<StagePayload>> {
        Ok(self.entries.get(id).map(|e| e.clone()))
    }

    fn put(&self, payload: StagePayload) -> Result<()> {
        if let Some(existing) = self.entries.get(&payload.id) {
            if *existing == payload {
                // Retried write of the same record.
                return Ok(());
            }
            return Err(Error::DuplicateKey(payload.id.clone()));
        }

        debug!(id = %payload.id, birth = payload.is_birth(), "journal put");
        for birth in payload.chain.birth_ids() {
            if *birth == payload.id {
                continue;
            }
            let mut descendants = self.birth_index.entry(birth.clone()).or_default();
            if !descendants.contains(&payload.id) {
                descendants.push(payload.id.clone());
            }
        }
        self.entries.insert(payload.id.clone(), payload);
        Ok(())
    }

    fn births_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<StagePayload>> {
        let mut births: Vec<StagePayload> = self
            .entries
            .iter()
            .filter(|e| e.is_birth() && e.recorded_at <= cutoff)
            .map(|e| e.clone())
            .collect();
        // Identifier order is creation order within a prefix; stable output
        // keeps sweep reports deterministic.
        births.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(births)
    }

    fn descendants(&self, birth: &Identifier) -> Result<Vec<Identifier>> {
        Ok(self
            .birth_index
            .get(birth)
            .map(|d| d.clone())
            .unwrap_or_default())
    }

    fn purge(&self, id: &Identifier) -> Result<bool> {
        if self.pinned(id) {
            return Err(Error::RetentionConflict(id.clone()));
        }
        self.birth_index.remove(id);
        Ok(self.entries.remove(id).is_some())
    }

    fn pin(&self, id: &Identifier) {
        *self.pins.entry(id.clone()).or_insert(0) += 1;
    }

    fn unpin(&self, id: &Identifier) {
        if let Some(mut count) = self.pins.get_mut(id) {
            *count = count.saturating_sub(1);
        }
        self.pins.remove_if(id, |_, c| *c == 0);
    }
}
