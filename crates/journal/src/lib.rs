//! Journal: append-only keyed store of stage payloads
//!
//! The pipeline consumes the Journal through the narrow [`Journal`] trait:
//! `get`/`put` keyed by self-assigned identifier, plus the time-bounded
//! birth scan and descendant index the retention sweeper needs. The
//! storage engine behind the trait is out of scope; [`MemoryJournal`] is
//! the concurrent in-memory reference implementation used by tests and the
//! facade.
//!
//! ## Consistency guarantees
//!
//! - `put` is append-only: a key is written once. Re-putting the identical
//!   payload is a retry no-op; different content under an existing key is
//!   [`Error::DuplicateKey`](causeway_core::Error::DuplicateKey). Keys are
//!   freshly minted per stage invocation, so writes never race.
//! - Readers pin entries for the duration of a reconstruction. `purge`
//!   refuses pinned entries with
//!   [`Error::RetentionConflict`](causeway_core::Error::RetentionConflict),
//!   which the sweeper treats as "defer to next cycle".

#![warn(missing_docs)]

mod memory;
mod retention;

pub use memory::MemoryJournal;
pub use retention::{RetentionConfig, RetentionSweeper, SweepReport, SweeperHandle};

use causeway_core::{Identifier, Result, StagePayload};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Narrow interface to the external append-only payload store.
pub trait Journal: Send + Sync {
    /// Look up the payload stored under `id`, if any.
    fn get(&self, id: &Identifier) -> Result<Option<StagePayload>>;

    /// Batched lookup, one result per requested identifier.
    ///
    /// The default implementation loops over [`Journal::get`];
    /// implementations backed by a remote store override this with a real
    /// batch call.
    fn get_many(&self, ids: &[&Identifier]) -> Result<Vec<Option<StagePayload>>> {
        ids.iter().map(|id| self.get(id)).collect()
    }

    /// Store a payload under its self-assigned identifier.
    fn put(&self, payload: StagePayload) -> Result<()>;

    /// All birth-event payloads recorded at or before `cutoff`.
    ///
    /// The time-bounded scan used by the retention sweeper.
    fn births_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<StagePayload>>;

    /// Identifiers of every stored payload descending from the given birth
    /// identifier (the birth entry itself excluded).
    fn descendants(&self, birth: &Identifier) -> Result<Vec<Identifier>>;

    /// Remove the entry stored under `id`.
    ///
    /// Returns whether an entry was removed. Fails with
    /// [`Error::RetentionConflict`](causeway_core::Error::RetentionConflict)
    /// while the entry is pinned by a reader.
    fn purge(&self, id: &Identifier) -> Result<bool>;

    /// Take a read pin on `id`, protecting it from purge.
    fn pin(&self, id: &Identifier);

    /// Release one read pin on `id`.
    fn unpin(&self, id: &Identifier);
}

/// RAII set of read pins over journal entries.
///
/// A reconstruction pins every identifier it is about to resolve; dropping
/// the set releases all of them. Pinning is idempotent-per-call and
/// reference counted, so overlapping reconstructions compose.
pub struct PinSet {
    journal: Arc<dyn Journal>,
    ids: Vec<Identifier>,
}

impl PinSet {
    /// Pin every identifier in `ids` against `journal`.
    pub fn acquire(journal: Arc<dyn Journal>, ids: Vec<Identifier>) -> Self {
        for id in &ids {
            journal.pin(id);
        }
        PinSet { journal, ids }
    }
}

impl Drop for PinSet {
    fn drop(&mut self) {
        for id in &self.ids {
            self.journal.unpin(id);
        }
    }
}
