//! Failure tracking implementations.

mod memory;

pub use memory::InMemoryFailureTracker;
