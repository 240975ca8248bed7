//! Concurrency groups — at most one active run per (workflow, branch) key.
//!
//! A single-writer lock with preemption-on-new-request semantics: a new run
//! for a key cancels the in-flight run for that key instead of queueing
//! behind it. In-flight work is abandoned, not drained.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tokio_util::sync::CancellationToken;

struct ActiveRun {
    id: u64,
    token: CancellationToken,
}

/// Handle to one registered run. Carries the token the run must observe and
/// the identity used to release the group on completion.
pub struct RunTicket {
    key: String,
    id: u64,
    /// Cancelled when a superseding run preempts this one.
    pub token: CancellationToken,
}

/// Registry of in-flight runs keyed by concurrency-group identity.
#[derive(Clone, Default)]
pub struct ConcurrencyGroups {
    inner: Arc<RwLock<HashMap<String, ActiveRun>>>,
    next_id: Arc<AtomicU64>,
}

impl ConcurrencyGroups {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new run for `key`, preempting any in-flight run.
    ///
    /// With `cancel_in_progress`, the previous run's token is cancelled
    /// before the new run is installed; otherwise the previous entry is
    /// replaced without being cancelled.
    #[must_use]
    pub fn begin(&self, key: &str, cancel_in_progress: bool) -> RunTicket {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = inner.insert(
            key.to_string(),
            ActiveRun {
                id,
                token: token.clone(),
            },
        ) && cancel_in_progress
        {
            previous.token.cancel();
        }
        RunTicket {
            key: key.to_string(),
            id,
            token,
        }
    }

    /// Release the group entry for a completed run. A superseded run's
    /// teardown never evicts the run that replaced it.
    pub fn finish(&self, ticket: &RunTicket) {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if inner.get(&ticket.key).is_some_and(|run| run.id == ticket.id) {
            inner.remove(&ticket.key);
        }
    }

    /// Whether a run is currently registered for `key`.
    #[must_use]
    pub fn active(&self, key: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_registers_key() {
        let groups = ConcurrencyGroups::new();
        let ticket = groups.begin("ci-feature/x", true);
        assert!(groups.active("ci-feature/x"));
        assert!(!ticket.token.is_cancelled());
    }

    #[test]
    fn test_begin_cancels_in_flight_run_for_same_key() {
        let groups = ConcurrencyGroups::new();
        let first = groups.begin("ci-feature/x", true);
        let second = groups.begin("ci-feature/x", true);
        assert!(first.token.is_cancelled());
        assert!(!second.token.is_cancelled());
    }

    #[test]
    fn test_begin_leaves_other_keys_untouched() {
        let groups = ConcurrencyGroups::new();
        let a = groups.begin("ci-feature/a", true);
        let _b = groups.begin("ci-feature/b", true);
        assert!(!a.token.is_cancelled());
    }

    #[test]
    fn test_begin_without_cancel_in_progress_replaces_silently() {
        let groups = ConcurrencyGroups::new();
        let first = groups.begin("ci-feature/x", false);
        let _second = groups.begin("ci-feature/x", false);
        assert!(!first.token.is_cancelled());
    }

    #[test]
    fn test_finish_releases_own_entry() {
        let groups = ConcurrencyGroups::new();
        let ticket = groups.begin("ci-feature/x", true);
        groups.finish(&ticket);
        assert!(!groups.active("ci-feature/x"));
    }

    #[test]
    fn test_superseded_finish_does_not_evict_successor() {
        let groups = ConcurrencyGroups::new();
        let first = groups.begin("ci-feature/x", true);
        let second = groups.begin("ci-feature/x", true);
        groups.finish(&first);
        assert!(groups.active("ci-feature/x"));
        groups.finish(&second);
        assert!(!groups.active("ci-feature/x"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// However many runs start for one key, only the last stays live.
        #[test]
        fn prop_only_latest_run_survives(n in 1usize..16) {
            let groups = ConcurrencyGroups::new();
            let tickets: Vec<RunTicket> =
                (0..n).map(|_| groups.begin("ci-feature/x", true)).collect();
            for earlier in &tickets[..n - 1] {
                prop_assert!(earlier.token.is_cancelled());
            }
            prop_assert!(!tickets[n - 1].token.is_cancelled());
        }
    }
}
