//! Time source port.

use chrono::{DateTime, Utc};

/// Source of "now" for window and cooldown arithmetic.
///
/// Injected so tests can drive time explicitly instead of waiting on the wall clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
