//! In-memory failure tracker backed by a sharded concurrent map.

use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;

use faultgate_core::domain::{ClientKey, ErrorTracker, GatePolicy, TrackerSnapshot};
use faultgate_core::ports::{Clock, CooldownStatus, FailureTracker};

type SharedTracker = Arc<Mutex<ErrorTracker>>;

/// Process-wide registry of per-client error trackers.
///
/// Lookups lock a single `DashMap` shard, so unrelated keys do not contend. Each tracker
/// has its own mutex, held only for one state-machine step.
/// Note: State is per-process and lost on restart.
pub struct InMemoryFailureTracker {
    trackers: DashMap<String, SharedTracker>,
    policy: GatePolicy,
    clock: Arc<dyn Clock>,
}

impl InMemoryFailureTracker {
    pub fn new(policy: GatePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            trackers: DashMap::new(),
            policy,
            clock,
        }
    }

    /// Atomic get-or-insert of the tracker for `key`.
    ///
    /// Concurrent callers for the same key always receive the same instance.
    pub fn get_or_create(&self, key: &ClientKey) -> SharedTracker {
        if let Some(existing) = self.trackers.get(key.as_str()) {
            return existing.value().clone();
        }

        self.trackers
            .entry(key.as_str().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ErrorTracker::new(self.clock.now()))))
            .value()
            .clone()
    }

    /// Remove every tracker whose last failure is older than `now - idle_horizon`.
    ///
    /// The idle check runs under the shard write lock, so a tracker inserted or updated
    /// while the sweep is in progress is seen with its fresh timestamp and kept. Trackers
    /// still in cooldown are kept regardless of idleness.
    pub fn sweep_idle(&self, idle_horizon: chrono::TimeDelta) -> usize {
        let now = self.clock.now();
        let cooldown = self.policy.cooldown;
        let before = self.trackers.len();

        self.trackers.retain(|_, tracker| {
            let tracker = lock(tracker);
            !tracker.is_idle(idle_horizon, now)
                || tracker.remaining_cooldown(cooldown, now) > chrono::TimeDelta::zero()
        });

        let removed = before.saturating_sub(self.trackers.len());
        tracing::debug!(removed, remaining = self.trackers.len(), "Idle tracker sweep finished");
        removed
    }

    fn existing(&self, key: &ClientKey) -> Option<SharedTracker> {
        self.trackers.get(key.as_str()).map(|entry| entry.value().clone())
    }
}

/// A poisoned tracker is still structurally valid, so keep using it.
fn lock(tracker: &Mutex<ErrorTracker>) -> MutexGuard<'_, ErrorTracker> {
    tracker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FailureTracker for InMemoryFailureTracker {
    fn check_cooldown(&self, key: &ClientKey) -> CooldownStatus {
        let Some(tracker) = self.existing(key) else {
            return CooldownStatus::Clear;
        };

        let now = self.clock.now();
        let mut tracker = lock(&tracker);

        if tracker.is_in_cooldown(self.policy.cooldown, now) {
            CooldownStatus::Blocked {
                remaining: tracker.remaining_cooldown(self.policy.cooldown, now),
            }
        } else {
            CooldownStatus::Clear
        }
    }

    fn record_failure(&self, key: &ClientKey) -> TrackerSnapshot {
        let tracker = self.get_or_create(key);
        let now = self.clock.now();
        let mut tracker = lock(&tracker);

        tracker.record_failure(&self.policy, now);
        tracker.snapshot(&self.policy, now)
    }

    fn snapshot(&self, key: &ClientKey) -> Option<TrackerSnapshot> {
        let tracker = self.existing(key)?;
        let now = self.clock.now();
        let snapshot = lock(&tracker).snapshot(&self.policy, now);
        Some(snapshot)
    }

    fn sweep(&self) -> usize {
        self.sweep_idle(self.policy.idle_horizon)
    }

    fn len(&self) -> usize {
        self.trackers.len()
    }

    fn policy(&self) -> &GatePolicy {
        &self.policy
    }
}
