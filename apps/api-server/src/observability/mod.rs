//! Observability module - correlation ids propagated into logs and responses.

mod correlation_id;

pub use correlation_id::{CorrelationId, CorrelationIdMiddleware};
