//! Middleware modules.

pub mod auth;
pub mod circuit_gate;
pub mod client_key;
pub mod error;

pub use auth::Authenticate;
pub use circuit_gate::{CircuitGate, GateSettings};
