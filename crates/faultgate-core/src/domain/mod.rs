//! Domain model - client identity, per-client error tracking and failure classification.

mod classification;
mod client_key;
mod policy;
mod tracker;

pub use classification::{Classification, Classifier, DetailExposure};
pub use client_key::ClientKey;
pub use policy::GatePolicy;
pub use tracker::{ErrorTracker, TrackerSnapshot, TrackerState};
