//! Confluence barriers
//!
//! A confluence stage consumes outputs from multiple concurrent upstream
//! instances (several signals combined into one directive). The
//! [`ConfluenceBarrier`] makes that explicit: upstream workers
//! [`offer`](ConfluenceBarrier::offer) their chains, the aggregating stage
//! [`wait`](ConfluenceBarrier::wait)s until a configured quota arrives or
//! a timeout elapses. On timeout the partially collected state is
//! discarded and
//! [`Error::PartialConfluence`](causeway_core::Error::PartialConfluence)
//! surfaces.
//!
//! Confluence across *differing* births has no single right answer; the
//! [`BirthMergePolicy`] makes it a configuration point with three
//! supported answers.

use causeway_core::{Birth, ChainRecord, Error, IdKind, Identifier, Result};
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How to combine upstream chains whose births differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BirthMergePolicy {
    /// Differing births fail the merge with a validation error.
    Reject,
    /// The first offered chain's birth wins; later births are dropped,
    /// their stage slots still merge.
    PickFirst,
    /// Differing births are replaced by a freshly minted schedule-kind
    /// identifier representing the merged origin.
    MintMerged,
}

/// Barrier configuration.
#[derive(Debug, Clone, Copy)]
pub struct ConfluenceConfig {
    /// Upstream records required before the aggregating stage may run.
    pub quota: usize,
    /// How long [`ConfluenceBarrier::wait`] blocks before giving up.
    pub timeout: Duration,
    /// Policy for upstream chains with differing births.
    pub births: BirthMergePolicy,
}

/// Blocking barrier collecting upstream chains for an aggregating stage.
///
/// Offers and waits may come from any thread. A successful wait drains
/// exactly `quota` chains in arrival order and merges them into the single
/// input chain for the aggregating stage's business function; chains
/// offered beyond the quota stay queued for the next wait.
pub struct ConfluenceBarrier {
    config: ConfluenceConfig,
    collected: Mutex<Vec<ChainRecord>>,
    arrived: Condvar,
}

impl ConfluenceBarrier {
    /// Create a barrier.
    ///
    /// Fails with [`Error::Validation`](causeway_core::Error::Validation)
    /// if the quota is zero.
    pub fn new(config: ConfluenceConfig) -> Result<Self> {
        if config.quota == 0 {
            return Err(Error::Validation(
                "confluence quota must be at least one".to_string(),
            ));
        }
        Ok(ConfluenceBarrier {
            config,
            collected: Mutex::new(Vec::new()),
            arrived: Condvar::new(),
        })
    }

    /// Offer one upstream chain to the barrier.
    pub fn offer(&self, chain: ChainRecord) {
        let mut collected = self.collected.lock();
        collected.push(chain);
        debug!(collected = collected.len(), quota = self.config.quota, "confluence offer");
        self.arrived.notify_all();
    }

    /// Block until the quota is met, then merge and return the combined
    /// input chain.
    ///
    /// On timeout the collected state is released and
    /// [`Error::PartialConfluence`](causeway_core::Error::PartialConfluence)
    /// is returned.
    pub fn wait(&self) -> Result<ChainRecord> {
        let deadline = Instant::now() + self.config.timeout;
        let mut collected = self.collected.lock();
        while collected.len() < self.config.quota {
            if self.arrived.wait_until(&mut collected, deadline).timed_out() {
                let count = collected.len();
                collected.clear();
                warn!(collected = count, quota = self.config.quota, "confluence timed out");
                return Err(Error::PartialConfluence {
                    collected: count,
                    quota: self.config.quota,
                });
            }
        }
        let inputs: Vec<ChainRecord> = collected.drain(..self.config.quota).collect();
        drop(collected);
        self.merge(inputs)
    }

    /// Merge collected chains under the configured birth policy.
    fn merge(&self, inputs: Vec<ChainRecord>) -> Result<ChainRecord> {
        let mut iter = inputs.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| Error::Internal("confluence merge over zero inputs".to_string()))?;
        let rest: Vec<ChainRecord> = iter.collect();
        let births_agree = rest.iter().all(|c| c.same_birth(&first));

        match self.config.births {
            _ if births_agree => rest.iter().try_fold(first, |acc, c| acc.merge(c)),
            BirthMergePolicy::Reject => Err(Error::Validation(
                "confluence inputs stem from differing births".to_string(),
            )),
            BirthMergePolicy::PickFirst => {
                rest.iter().try_fold(first, |acc, c| acc.merge_slots(c))
            }
            BirthMergePolicy::MintMerged => {
                let merged_origin = Identifier::mint(IdKind::Schedule);
                debug!(%merged_origin, "minted merged-birth identifier");
                let base = ChainRecord::create(Birth::schedule(merged_origin))?;
                std::iter::once(&first)
                    .chain(rest.iter())
                    .try_fold(base, |acc, c| acc.merge_slots(c))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causeway_core::Slot;
    use std::sync::Arc;

    fn config(quota: usize, births: BirthMergePolicy) -> ConfluenceConfig {
        ConfluenceConfig {
            quota,
            timeout: Duration::from_millis(200),
            births,
        }
    }

    fn tick_chain() -> ChainRecord {
        ChainRecord::create(Birth::tick(Identifier::mint(IdKind::Tick))).unwrap()
    }

    fn with_signal(chain: &ChainRecord) -> (ChainRecord, Identifier) {
        let sig = Identifier::mint(IdKind::Signal);
        (chain.extend(Slot::SignalIds, sig.clone()).unwrap(), sig)
    }

    #[test]
    fn zero_quota_is_rejected() {
        assert!(ConfluenceBarrier::new(config(0, BirthMergePolicy::Reject)).is_err());
    }

    #[test]
    fn quota_met_merges_shared_birth_chains() {
        let barrier = ConfluenceBarrier::new(config(2, BirthMergePolicy::Reject)).unwrap();
        let base = tick_chain();
        let (left, sig_a) = with_signal(&base);
        let (right, sig_b) = with_signal(&base);

        barrier.offer(left);
        barrier.offer(right);
        let merged = barrier.wait().unwrap();
        assert_eq!(merged.multi(Slot::SignalIds), &[sig_a, sig_b]);
        assert!(base.same_birth(&merged));
    }

    #[test]
    fn timeout_releases_collected_state() {
        let barrier = ConfluenceBarrier::new(config(3, BirthMergePolicy::Reject)).unwrap();
        barrier.offer(tick_chain());

        let err = barrier.wait().unwrap_err();
        assert!(matches!(
            err,
            Error::PartialConfluence {
                collected: 1,
                quota: 3
            }
        ));
        // State was drained; a retry starts from zero.
        let err = barrier.wait().unwrap_err();
        assert!(matches!(err, Error::PartialConfluence { collected: 0, .. }));
    }

    #[test]
    fn reject_policy_refuses_differing_births() {
        let barrier = ConfluenceBarrier::new(config(2, BirthMergePolicy::Reject)).unwrap();
        barrier.offer(with_signal(&tick_chain()).0);
        barrier.offer(with_signal(&tick_chain()).0);
        assert!(matches!(barrier.wait().unwrap_err(), Error::Validation(_)));
    }

    #[test]
    fn pick_first_keeps_the_first_birth() {
        let barrier = ConfluenceBarrier::new(config(2, BirthMergePolicy::PickFirst)).unwrap();
        let first = tick_chain();
        let (first_ext, sig_a) = with_signal(&first);
        let (second_ext, sig_b) = with_signal(&tick_chain());

        barrier.offer(first_ext);
        barrier.offer(second_ext);
        let merged = barrier.wait().unwrap();
        assert!(merged.same_birth(&first));
        assert_eq!(merged.multi(Slot::SignalIds), &[sig_a, sig_b]);
    }

    #[test]
    fn mint_merged_replaces_differing_births() {
        let barrier = ConfluenceBarrier::new(config(2, BirthMergePolicy::MintMerged)).unwrap();
        let (left, sig_a) = with_signal(&tick_chain());
        let (right, sig_b) = with_signal(&tick_chain());

        barrier.offer(left.clone());
        barrier.offer(right);
        let merged = barrier.wait().unwrap();
        assert!(!merged.same_birth(&left));
        assert!(merged.tick_id().is_none());
        assert_eq!(merged.schedule_id().map(|id| id.kind()), Some(IdKind::Schedule));
        assert_eq!(merged.multi(Slot::SignalIds), &[sig_a, sig_b]);
    }

    #[test]
    fn mint_merged_leaves_shared_births_alone() {
        let barrier = ConfluenceBarrier::new(config(2, BirthMergePolicy::MintMerged)).unwrap();
        let base = tick_chain();
        barrier.offer(with_signal(&base).0);
        barrier.offer(with_signal(&base).0);
        let merged = barrier.wait().unwrap();
        assert!(base.same_birth(&merged));
    }

    #[test]
    fn concurrent_offers_unblock_a_waiting_aggregator() {
        let barrier = Arc::new(ConfluenceBarrier::new(config(2, BirthMergePolicy::Reject)).unwrap());
        let base = tick_chain();

        let offerer = {
            let barrier = Arc::clone(&barrier);
            let base = base.clone();
            std::thread::spawn(move || {
                for _ in 0..2 {
                    barrier.offer(with_signal(&base).0);
                    std::thread::sleep(Duration::from_millis(10));
                }
            })
        };

        let merged = barrier.wait().unwrap();
        offerer.join().unwrap();
        assert_eq!(merged.multi(Slot::SignalIds).len(), 2);
    }
}
