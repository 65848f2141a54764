//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod clock;
mod tracking;

pub use auth::{AuthError, TokenClaims, TokenService};
pub use clock::Clock;
pub use tracking::{CooldownStatus, FailureTracker};
