//! Failure tracking port.

use chrono::TimeDelta;

use crate::domain::{ClientKey, GatePolicy, TrackerSnapshot};

/// Outcome of the pre-dispatch cooldown check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownStatus {
    Clear,
    Blocked { remaining: TimeDelta },
}

impl CooldownStatus {
    pub fn is_blocked(&self) -> bool {
        matches!(self, CooldownStatus::Blocked { .. })
    }
}

/// Failure tracker trait - abstraction over per-client error tracking backends.
///
/// All operations complete without waiting on external resources, so they are safe to
/// call inline on the request path.
pub trait FailureTracker: Send + Sync {
    /// Check whether `key` is blocked. Never creates state for unknown keys.
    ///
    /// Expired cooldowns are cleared as part of this check.
    fn check_cooldown(&self, key: &ClientKey) -> CooldownStatus;

    /// Record a failure for `key`, creating its tracker on first use.
    ///
    /// Returns the tracker state immediately after recording.
    fn record_failure(&self, key: &ClientKey) -> TrackerSnapshot;

    /// Side-effect free view of the tracker for `key`, if one exists.
    fn snapshot(&self, key: &ClientKey) -> Option<TrackerSnapshot>;

    /// Evict trackers idle for longer than the policy's idle horizon.
    /// Returns the number of trackers removed.
    fn sweep(&self) -> usize;

    /// Number of live trackers.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn policy(&self) -> &GatePolicy;
}
