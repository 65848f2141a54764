use chrono::TimeDelta;

use crate::error::PolicyError;

/// Thresholds and horizons driving the error tracker and the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePolicy {
    /// Failures within `window` that start a cooldown.
    pub failure_threshold: u32,
    /// Trailing window over which failures are counted.
    pub window: TimeDelta,
    /// How long a client stays blocked once the threshold is reached.
    pub cooldown: TimeDelta,
    /// Failure records older than this are pruned on every insert.
    pub retention: TimeDelta,
    /// Trackers without a failure for this long are evicted by the sweep.
    pub idle_horizon: TimeDelta,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            window: TimeDelta::minutes(5),
            cooldown: TimeDelta::minutes(15),
            retention: TimeDelta::minutes(10),
            idle_horizon: TimeDelta::hours(1),
        }
    }
}

impl GatePolicy {
    /// Reject values that would make the state machine meaningless.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.failure_threshold == 0 {
            return Err(PolicyError::ZeroThreshold);
        }

        for (name, value) in [
            ("Counting window", self.window),
            ("Cooldown duration", self.cooldown),
            ("Retention horizon", self.retention),
            ("Idle horizon", self.idle_horizon),
        ] {
            if value <= TimeDelta::zero() {
                return Err(PolicyError::NonPositive(name));
            }
        }

        if self.retention < self.window {
            return Err(PolicyError::RetentionShorterThanWindow);
        }

        // A tracker evicted mid-cooldown would lift its block early.
        if self.idle_horizon < self.cooldown {
            return Err(PolicyError::IdleHorizonShorterThanCooldown);
        }

        Ok(())
    }

    /// Failure count at which a client is warned that the next failure blocks it.
    ///
    /// `None` when the threshold is 1, since there is no count left to warn at.
    pub fn warning_level(&self) -> Option<u32> {
        self.failure_threshold.checked_sub(1).filter(|level| *level > 0)
    }

    /// Attempts left before a block, given the current count in the window.
    pub fn attempts_remaining(&self, failures_in_window: u32) -> u32 {
        self.failure_threshold.saturating_sub(failures_in_window)
    }
}
