//! # Faultgate Infrastructure
//!
//! Concrete implementations of the ports defined in `faultgate-core`.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - In-memory tracking only
//! - `auth` - JWT bearer token validation

pub mod clock;
pub mod tracking;

#[cfg(feature = "auth")]
pub mod auth;

pub use clock::{ManualClock, SystemClock};
pub use tracking::InMemoryFailureTracker;

#[cfg(feature = "auth")]
pub use auth::{JwtConfig, JwtTokenService};
