//! Retention sweeping for orphaned birth records
//!
//! Birth events are journaled before anyone knows whether a lineage will
//! ever grow out of them. The [`RetentionSweeper`] applies a window-based
//! garbage-collection policy:
//!
//! - a birth older than `orphan_window` with no descendant payload is
//!   purged
//! - a birth whose lineage completed every required slot is retained until
//!   `audit_window` (it remains queryable by reconstruction), then purged
//! - a partially extended lineage is always retained
//!
//! The sweep is advisory: an entry pinned by an in-flight reconstruction
//! is deferred to the next cycle, never force-removed.

use crate::Journal;
use causeway_core::{Error, Identifier, Result, Slot};
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// Window-based retention policy.
///
/// There are no default windows: both are product decisions and must be
/// supplied explicitly.
#[derive(Debug, Clone, Copy)]
pub struct RetentionConfig {
    /// A birth with no recorded extension within this window is eligible
    /// for purge.
    pub orphan_window: Duration,
    /// A completed lineage's birth record is retained this long for audit
    /// queries.
    pub audit_window: Duration,
}

impl RetentionConfig {
    /// Build a policy from the two windows.
    pub fn new(orphan_window: Duration, audit_window: Duration) -> Self {
        RetentionConfig {
            orphan_window,
            audit_window,
        }
    }
}

/// Outcome of one sweep cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries removed this cycle
    pub purged: Vec<Identifier>,
    /// Entries eligible for purge but pinned by an active reconstruction;
    /// retried next cycle
    pub deferred: Vec<Identifier>,
    /// Birth entries scanned and kept
    pub retained: usize,
}

/// Applies the retention policy to the journal's birth records.
pub struct RetentionSweeper {
    journal: Arc<dyn Journal>,
    config: RetentionConfig,
    required: Vec<Slot>,
}

impl RetentionSweeper {
    /// Create a sweeper over `journal`.
    ///
    /// `required` is the pipeline's canonical slot order, used to judge
    /// lineage completeness.
    pub fn new(journal: Arc<dyn Journal>, config: RetentionConfig, required: Vec<Slot>) -> Self {
        RetentionSweeper {
            journal,
            config,
            required,
        }
    }

    /// Run one sweep cycle as of `now`.
    ///
    /// Pinned entries are deferred and reported, never an error.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        let cutoff = now - self.config.orphan_window;

        for birth in self.journal.births_before(cutoff)? {
            let descendants = self.journal.descendants(&birth.id)?;
            if descendants.is_empty() {
                self.try_purge(&birth.id, "orphaned birth", &mut report)?;
                continue;
            }

            if self.lineage_complete(&descendants)?
                && birth.recorded_at <= now - self.config.audit_window
            {
                self.try_purge(&birth.id, "audit window elapsed", &mut report)?;
            } else {
                report.retained += 1;
            }
        }

        info!(
            purged = report.purged.len(),
            deferred = report.deferred.len(),
            retained = report.retained,
            "retention sweep complete"
        );
        Ok(report)
    }

    /// True if any descendant payload carries a chain covering every
    /// required slot.
    fn lineage_complete(&self, descendants: &[Identifier]) -> Result<bool> {
        for id in descendants {
            if let Some(payload) = self.journal.get(id)? {
                if payload.chain.is_complete(self.required.iter().copied()) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn try_purge(&self, id: &Identifier, reason: &str, report: &mut SweepReport) -> Result<()> {
        match self.journal.purge(id) {
            Ok(_) => {
                debug!(%id, reason, "purged birth record");
                report.purged.push(id.clone());
                Ok(())
            }
            Err(Error::RetentionConflict(_)) => {
                warn!(%id, "purge deferred: entry pinned by active reconstruction");
                report.deferred.push(id.clone());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Run the sweeper on a background thread every `interval`.
    ///
    /// The returned handle stops the thread on [`SweeperHandle::stop`] or
    /// on drop. Sweep errors are logged and do not kill the loop.
    pub fn spawn(self, interval: std::time::Duration) -> SweeperHandle {
        let signal = Arc::new((Mutex::new(false), Condvar::new()));
        let thread_signal = Arc::clone(&signal);

        let thread = std::thread::spawn(move || {
            let (lock, cvar) = &*thread_signal;
            loop {
                let mut stopped = lock.lock();
                if !*stopped {
                    cvar.wait_for(&mut stopped, interval);
                }
                if *stopped {
                    break;
                }
                drop(stopped);

                if let Err(e) = self.sweep(Utc::now()) {
                    warn!(error = %e, "retention sweep failed");
                }
            }
        });

        SweeperHandle {
            signal,
            thread: Some(thread),
        }
    }
}

/// Handle to a background sweeper thread.
pub struct SweeperHandle {
    signal: Arc<(Mutex<bool>, Condvar)>,
    thread: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for the thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let (lock, cvar) = &*self.signal;
        *lock.lock() = true;
        cvar.notify_all();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
