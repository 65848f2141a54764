//! Background jobs.
//!
//! The only job is the idle tracker sweep. With the `scheduler` feature it runs as a cron
//! job; without it a plain interval task runs at the idle horizon.

#[cfg(feature = "scheduler")]
mod scheduler;

#[cfg(feature = "scheduler")]
pub use scheduler::Scheduler;

use std::sync::Arc;

use faultgate_core::ports::FailureTracker;

use crate::config::SweepConfig;

/// Handle keeping the sweep alive until shutdown.
pub enum SweepHandle {
    #[cfg(feature = "scheduler")]
    Cron(Scheduler),
    Interval(tokio::task::JoinHandle<()>),
    Disabled,
}

impl SweepHandle {
    pub async fn shutdown(self) {
        match self {
            #[cfg(feature = "scheduler")]
            SweepHandle::Cron(mut scheduler) => {
                if let Err(e) = scheduler.shutdown().await {
                    tracing::warn!(error = %e, "Failed to stop scheduler");
                }
            }
            SweepHandle::Interval(handle) => handle.abort(),
            SweepHandle::Disabled => {}
        }
    }
}

/// Evict idle trackers once and log how many went.
pub fn sweep_once(tracker: &dyn FailureTracker) -> usize {
    let evicted = tracker.sweep();
    tracing::info!(evicted, remaining = tracker.len(), "Idle tracker sweep finished");
    evicted
}

/// Start the periodic idle tracker sweep.
#[cfg(feature = "scheduler")]
pub async fn start_tracker_sweep(
    tracker: Arc<dyn FailureTracker>,
    config: &SweepConfig,
) -> anyhow::Result<SweepHandle> {
    if !config.enabled {
        tracing::info!("Tracker sweep disabled");
        return Ok(SweepHandle::Disabled);
    }

    let scheduler = Scheduler::new(config).await?;
    scheduler
        .add_cron(&config.schedule, move || {
            let tracker = tracker.clone();
            async move {
                sweep_once(tracker.as_ref());
            }
        })
        .await?;
    scheduler.start().await?;

    Ok(SweepHandle::Cron(scheduler))
}

/// Start the periodic idle tracker sweep.
#[cfg(not(feature = "scheduler"))]
pub async fn start_tracker_sweep(
    tracker: Arc<dyn FailureTracker>,
    config: &SweepConfig,
) -> anyhow::Result<SweepHandle> {
    if !config.enabled {
        tracing::info!("Tracker sweep disabled");
        return Ok(SweepHandle::Disabled);
    }

    let period = tracker
        .policy()
        .idle_horizon
        .to_std()
        .map_err(|e| anyhow::anyhow!("Invalid idle horizon: {e}"))?;

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep_once(tracker.as_ref());
        }
    });
    tracing::info!(period_secs = period.as_secs(), "Interval tracker sweep started");

    Ok(SweepHandle::Interval(handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};
    use faultgate_core::domain::{ClientKey, GatePolicy};
    use faultgate_infra::{InMemoryFailureTracker, ManualClock};

    #[test]
    fn test_sweep_once_evicts_idle_trackers() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let tracker = InMemoryFailureTracker::new(GatePolicy::default(), clock.clone());

        tracker.record_failure(&ClientKey::resolve(None, Some("10.0.0.1")));
        clock.advance(TimeDelta::minutes(30));
        tracker.record_failure(&ClientKey::resolve(None, Some("10.0.0.2")));
        clock.advance(TimeDelta::minutes(45));

        assert_eq!(sweep_once(&tracker), 1);
        assert_eq!(tracker.len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_sweep_starts_nothing() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let tracker: Arc<dyn FailureTracker> =
            Arc::new(InMemoryFailureTracker::new(GatePolicy::default(), clock));
        let config = SweepConfig {
            enabled: false,
            ..SweepConfig::default()
        };

        let handle = start_tracker_sweep(tracker, &config).await.unwrap();
        assert!(matches!(handle, SweepHandle::Disabled));
    }
}
