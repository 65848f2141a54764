//! # Faultgate Core
//!
//! The domain layer of Faultgate.
//! This crate holds the per-client error tracking state machine, failure classification
//! and the ports that infrastructure implements. It has zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;

pub use error::{DomainError, FailureKind, PolicyError};
