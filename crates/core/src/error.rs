//! Canonical error types for the lineage subsystem
//!
//! This module defines the single `Error` enum used across every Causeway
//! crate. Each variant corresponds to one of the canonical failure classes:
//!
//! | Variant | Trigger |
//! |---------|---------|
//! | Validation | ChainRecord created with no birth identifier, or a kind mismatch |
//! | SlotConflict | extend() on a set single-valued slot with a differing value |
//! | PartialConfluence | Confluence barrier timed out below quota |
//! | NotFound | Referenced identifier has no Journal entry |
//! | RetentionConflict | Purge attempted on an entry pinned by a reconstruction |
//! | InvalidIdentifier | Identifier string does not match the wire format |
//! | DuplicateKey | Journal put under an existing key with different content |
//! | Stage | A stage's business function failed |
//! | Internal | Bug or invariant violation |
//!
//! ## Propagation policy
//!
//! Birth-validation failures are fatal at ingestion: a record without a birth
//! must never enter the pipeline. Mid-pipeline causality failures
//! (`SlotConflict`, `PartialConfluence`, `Stage`) abort only the offending
//! stage invocation. Reconstruction never surfaces `NotFound` as a hard
//! error; missing entries degrade to gaps in the result.

use crate::id::Identifier;
use thiserror::Error;

/// All Causeway errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Invariant violation on record construction (e.g., no birth identifier,
    /// or an identifier kind that does not match its slot).
    #[error("validation: {0}")]
    Validation(String),

    /// A single-valued slot was extended with a second, different value.
    #[error("slot conflict on {slot}: already {existing}, attempted {attempted}")]
    SlotConflict {
        /// Name of the slot that was already set
        slot: &'static str,
        /// The value the slot already holds
        existing: Identifier,
        /// The differing value that was rejected
        attempted: Identifier,
    },

    /// A confluence barrier timed out before its input quota was met.
    /// Inputs collected so far have been released.
    #[error("partial confluence: collected {collected} of {quota} upstream records")]
    PartialConfluence {
        /// Records collected before the timeout
        collected: usize,
        /// Records required to proceed
        quota: usize,
    },

    /// A referenced identifier has no Journal entry.
    #[error("not found: {0}")]
    NotFound(Identifier),

    /// A purge was attempted on an entry still pinned by an active
    /// reconstruction. The sweep for that entry defers to the next cycle.
    #[error("retention conflict: {0} is pinned by an active reconstruction")]
    RetentionConflict(Identifier),

    /// An identifier string does not match `PREFIX_YYYYMMDD_HHMMSS_hhhhhhhh`.
    #[error("invalid identifier {value:?}: {reason}")]
    InvalidIdentifier {
        /// The rejected string
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// Append-only violation: a Journal put under an existing key with
    /// different content. Re-putting the identical payload is a retry no-op.
    #[error("duplicate journal key: {0}")]
    DuplicateKey(Identifier),

    /// A stage's business function failed. The stage emits nothing.
    #[error("stage {stage} failed: {source}")]
    Stage {
        /// Registered stage name
        stage: String,
        /// The underlying business error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Serialization or deserialization failure.
    #[error("serialization: {0}")]
    Serialization(String),

    /// Internal error (bug or invariant violation).
    #[error("internal: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result alias used across all Causeway crates.
pub type Result<T> = std::result::Result<T, Error>;
