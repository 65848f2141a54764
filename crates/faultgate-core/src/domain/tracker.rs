//! Per-client error tracking state machine.
//!
//! A tracker moves between three states:
//!
//! - **Normal** - below the warning level.
//! - **Warning** - exactly one failure short of the threshold within the window.
//! - **Cooldown** - the threshold was reached; the client is blocked until the cooldown
//!   duration has elapsed.
//!
//! Cooldown is entered only by [`ErrorTracker::record_failure`] and left only by
//! [`ErrorTracker::is_in_cooldown`] once the duration has passed. Time is always passed in
//! by the caller, so the tracker itself never reads a clock.

use std::collections::VecDeque;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use super::policy::GatePolicy;

/// Observable state of a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerState {
    Normal,
    Warning,
    Cooldown,
}

/// Point-in-time view of a tracker, taken without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSnapshot {
    pub state: TrackerState,
    pub failures_in_window: u32,
    pub remaining_cooldown: TimeDelta,
}

/// Failure history and cooldown state for one client key.
#[derive(Debug, Clone)]
pub struct ErrorTracker {
    /// Chronological failure timestamps, pruned to the retention horizon on insert.
    recent_failures: VecDeque<DateTime<Utc>>,
    last_failure_time: DateTime<Utc>,
    cooldown_start: Option<DateTime<Utc>>,
}

impl ErrorTracker {
    /// Create an empty tracker.
    ///
    /// `created_at` seeds `last_failure_time` so a tracker created for an in-flight failure
    /// is never considered idle before that failure is recorded.
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            recent_failures: VecDeque::new(),
            last_failure_time: created_at,
            cooldown_start: None,
        }
    }

    /// Record a failure at `now`.
    ///
    /// Starts a cooldown when the count within the window reaches the threshold and no
    /// cooldown is active. An active cooldown is never moved by further failures.
    pub fn record_failure(&mut self, policy: &GatePolicy, now: DateTime<Utc>) {
        self.recent_failures.push_back(now);
        self.last_failure_time = now;

        if self.cooldown_start.is_none()
            && self.count_in_window(policy.window, now) >= policy.failure_threshold
        {
            self.cooldown_start = Some(now);
        }

        let cutoff = now - policy.retention;
        while self
            .recent_failures
            .front()
            .is_some_and(|oldest| *oldest < cutoff)
        {
            self.recent_failures.pop_front();
        }
    }

    /// Number of recorded failures at or after `now - window`.
    pub fn count_in_window(&self, window: TimeDelta, now: DateTime<Utc>) -> u32 {
        let cutoff = now - window;
        let count = self.recent_failures.iter().filter(|t| **t >= cutoff).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Whether the tracker is blocking at `now`.
    ///
    /// This is a query with a side effect: when the cooldown has run its full duration it
    /// is cleared here, together with the whole failure history, and the tracker returns to
    /// Normal.
    pub fn is_in_cooldown(&mut self, cooldown: TimeDelta, now: DateTime<Utc>) -> bool {
        let Some(start) = self.cooldown_start else {
            return false;
        };

        if now - start >= cooldown {
            self.cooldown_start = None;
            self.recent_failures.clear();
            return false;
        }

        true
    }

    /// Time left in the current cooldown, zero when not cooling down.
    pub fn remaining_cooldown(&self, cooldown: TimeDelta, now: DateTime<Utc>) -> TimeDelta {
        match self.cooldown_start {
            Some(start) => (cooldown - (now - start)).max(TimeDelta::zero()),
            None => TimeDelta::zero(),
        }
    }

    /// Current state without applying the lazy cooldown reset.
    pub fn state(&self, policy: &GatePolicy, now: DateTime<Utc>) -> TrackerState {
        if self.remaining_cooldown(policy.cooldown, now) > TimeDelta::zero() {
            return TrackerState::Cooldown;
        }

        // An expired cooldown reads as Normal: its history is discarded on the next query.
        if self.cooldown_start.is_some() {
            return TrackerState::Normal;
        }

        match policy.warning_level() {
            Some(level) if self.count_in_window(policy.window, now) == level => {
                TrackerState::Warning
            }
            _ => TrackerState::Normal,
        }
    }

    pub fn snapshot(&self, policy: &GatePolicy, now: DateTime<Utc>) -> TrackerSnapshot {
        TrackerSnapshot {
            state: self.state(policy, now),
            failures_in_window: self.count_in_window(policy.window, now),
            remaining_cooldown: self.remaining_cooldown(policy.cooldown, now),
        }
    }

    /// True when the last failure is older than `now - idle_horizon`.
    pub fn is_idle(&self, idle_horizon: TimeDelta, now: DateTime<Utc>) -> bool {
        self.last_failure_time < now - idle_horizon
    }

    pub fn last_failure_time(&self) -> DateTime<Utc> {
        self.last_failure_time
    }

    pub fn cooldown_start(&self) -> Option<DateTime<Utc>> {
        self.cooldown_start
    }

    /// Failure records currently held, including ones outside the counting window.
    pub fn stored_failures(&self) -> usize {
        self.recent_failures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn secs(s: i64) -> TimeDelta {
        TimeDelta::seconds(s)
    }

    #[test]
    fn test_two_failures_never_start_cooldown() {
        let policy = GatePolicy::default();
        let mut tracker = ErrorTracker::new(t0());

        tracker.record_failure(&policy, t0());
        tracker.record_failure(&policy, t0() + secs(200));

        assert!(tracker.cooldown_start().is_none());
        assert!(!tracker.is_in_cooldown(policy.cooldown, t0() + secs(201)));
        assert_eq!(tracker.state(&policy, t0() + secs(201)), TrackerState::Warning);
    }

    #[test]
    fn test_failures_spread_beyond_window_never_start_cooldown() {
        let policy = GatePolicy::default();
        let mut tracker = ErrorTracker::new(t0());

        // Every window of 5 minutes holds at most two of these.
        for minute in [0, 4, 9, 13, 18] {
            tracker.record_failure(&policy, t0() + TimeDelta::minutes(minute));
        }

        assert!(tracker.cooldown_start().is_none());
    }

    #[test]
    fn test_third_failure_starts_cooldown() {
        let policy = GatePolicy::default();
        let mut tracker = ErrorTracker::new(t0());

        tracker.record_failure(&policy, t0());
        tracker.record_failure(&policy, t0() + secs(60));
        assert!(tracker.cooldown_start().is_none());

        tracker.record_failure(&policy, t0() + secs(120));
        assert_eq!(tracker.cooldown_start(), Some(t0() + secs(120)));
        assert!(tracker.is_in_cooldown(policy.cooldown, t0() + secs(150)));
        assert_eq!(
            tracker.remaining_cooldown(policy.cooldown, t0() + secs(150)),
            TimeDelta::minutes(14) + secs(30)
        );
    }

    #[test]
    fn test_failures_during_cooldown_do_not_move_it() {
        let policy = GatePolicy::default();
        let mut tracker = ErrorTracker::new(t0());
        for s in [0, 10, 20] {
            tracker.record_failure(&policy, t0() + secs(s));
        }

        tracker.record_failure(&policy, t0() + secs(300));
        tracker.record_failure(&policy, t0() + secs(400));

        assert_eq!(tracker.cooldown_start(), Some(t0() + secs(20)));
        assert_eq!(tracker.last_failure_time(), t0() + secs(400));
    }

    #[test]
    fn test_remaining_cooldown_is_non_increasing_and_reaches_zero() {
        let policy = GatePolicy::default();
        let mut tracker = ErrorTracker::new(t0());
        for s in [0, 1, 2] {
            tracker.record_failure(&policy, t0() + secs(s));
        }
        let start = t0() + secs(2);

        let mut previous = tracker.remaining_cooldown(policy.cooldown, start);
        assert_eq!(previous, policy.cooldown);
        for step in 1..=20 {
            let now = start + secs(step * 60);
            let remaining = tracker.remaining_cooldown(policy.cooldown, now);
            assert!(remaining <= previous);
            previous = remaining;
        }

        assert_eq!(
            tracker.remaining_cooldown(policy.cooldown, start + policy.cooldown),
            TimeDelta::zero()
        );
        assert!(
            tracker.remaining_cooldown(policy.cooldown, start + policy.cooldown - secs(1))
                > TimeDelta::zero()
        );
    }

    #[test]
    fn test_expired_cooldown_is_cleared_on_query() {
        let policy = GatePolicy::default();
        let mut tracker = ErrorTracker::new(t0());
        for s in [0, 1, 2] {
            tracker.record_failure(&policy, t0() + secs(s));
        }
        let expiry = t0() + secs(2) + policy.cooldown;

        // Still blocking one second before expiry.
        assert!(tracker.is_in_cooldown(policy.cooldown, expiry - secs(1)));

        assert!(!tracker.is_in_cooldown(policy.cooldown, expiry));
        assert!(tracker.cooldown_start().is_none());
        assert_eq!(tracker.stored_failures(), 0);
        assert_eq!(tracker.state(&policy, expiry), TrackerState::Normal);

        // A single new failure after the reset does not re-trigger.
        tracker.record_failure(&policy, expiry + secs(5));
        assert!(!tracker.is_in_cooldown(policy.cooldown, expiry + secs(6)));
        assert_eq!(tracker.count_in_window(policy.window, expiry + secs(6)), 1);
    }

    #[test]
    fn test_state_does_not_reset_expired_cooldown() {
        let policy = GatePolicy::default();
        let mut tracker = ErrorTracker::new(t0());
        for s in [0, 1, 2] {
            tracker.record_failure(&policy, t0() + secs(s));
        }
        let later = t0() + TimeDelta::hours(1);

        assert_eq!(tracker.state(&policy, later), TrackerState::Normal);
        assert!(tracker.cooldown_start().is_some());
        assert_eq!(tracker.stored_failures(), 3);
    }

    #[test]
    fn test_old_records_are_excluded_and_pruned() {
        let policy = GatePolicy::default();
        let mut tracker = ErrorTracker::new(t0());

        tracker.record_failure(&policy, t0());
        tracker.record_failure(&policy, t0() + TimeDelta::minutes(6));
        // Outside the counting window but still retained.
        assert_eq!(
            tracker.count_in_window(policy.window, t0() + TimeDelta::minutes(6)),
            1
        );
        assert_eq!(tracker.stored_failures(), 2);

        tracker.record_failure(&policy, t0() + TimeDelta::minutes(11));
        assert_eq!(tracker.stored_failures(), 2);
        assert_eq!(
            tracker.count_in_window(policy.window, t0() + TimeDelta::minutes(11)),
            2
        );
        assert!(tracker.cooldown_start().is_none());
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let policy = GatePolicy::default();
        let mut tracker = ErrorTracker::new(t0());
        tracker.record_failure(&policy, t0());

        assert_eq!(tracker.count_in_window(policy.window, t0() + policy.window), 1);
        assert_eq!(
            tracker.count_in_window(policy.window, t0() + policy.window + secs(1)),
            0
        );
    }

    #[test]
    fn test_idle_detection() {
        let policy = GatePolicy::default();
        let mut tracker = ErrorTracker::new(t0());
        tracker.record_failure(&policy, t0());

        assert!(!tracker.is_idle(policy.idle_horizon, t0() + TimeDelta::minutes(59)));
        assert!(tracker.is_idle(policy.idle_horizon, t0() + TimeDelta::minutes(61)));
    }

    #[test]
    fn test_snapshot() {
        let policy = GatePolicy::default();
        let mut tracker = ErrorTracker::new(t0());
        for s in [0, 60, 120] {
            tracker.record_failure(&policy, t0() + secs(s));
        }

        let snapshot = tracker.snapshot(&policy, t0() + secs(150));
        assert_eq!(snapshot.state, TrackerState::Cooldown);
        assert_eq!(snapshot.failures_in_window, 3);
        assert_eq!(snapshot.remaining_cooldown, TimeDelta::seconds(870));
    }

    #[test]
    fn test_state_serializes_as_snake_case() {
        let states = [TrackerState::Normal, TrackerState::Warning, TrackerState::Cooldown];
        assert_eq!(
            serde_json::to_value(states).unwrap(),
            serde_json::json!(["normal", "warning", "cooldown"])
        );
    }
}
