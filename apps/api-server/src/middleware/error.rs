//! Error handling - the failure channel from handlers to the circuit gate.
//!
//! Handlers return [`AppResult`]. The error is rendered into the failure envelope on its
//! own, and the circuit gate picks it back up from the response to classify and track it.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use faultgate_core::domain::Classifier;
use faultgate_core::ports::AuthError;
use faultgate_core::DomainError;
use faultgate_shared::ApiResponse;

/// Application-level error carrying the tagged domain failure.
#[derive(Debug)]
pub struct AppError {
    error: DomainError,
    stack_trace: Option<String>,
}

impl AppError {
    pub fn new(error: DomainError) -> Self {
        let backtrace = Backtrace::capture();
        let stack_trace = match backtrace.status() {
            BacktraceStatus::Captured => Some(backtrace.to_string()),
            _ => None,
        };

        Self { error, stack_trace }
    }

    pub fn unauthorized() -> Self {
        Self::new(DomainError::Unauthorized)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(DomainError::InvalidArgument(msg.into()))
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::new(DomainError::InvalidState(msg.into()))
    }

    pub fn domain_error(&self) -> &DomainError {
        &self.error
    }

    /// Stack trace captured at construction, when `RUST_BACKTRACE` enables capture.
    pub fn stack_trace(&self) -> Option<&str> {
        self.stack_trace.as_deref()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        let classification = Classifier::default().classify_error(&self.error);
        StatusCode::from_u16(classification.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Production rendering, used when no gate is in front of the handler.
    fn error_response(&self) -> HttpResponse {
        let classifier = Classifier::default();
        let classification = classifier.classify_error(&self.error);
        let errors = classifier.details(&self.error.to_string(), self.stack_trace());

        HttpResponse::build(self.status_code()).json(ApiResponse::failure(classification.message, errors))
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        AppError::new(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        tracing::debug!(error = %err, "Authentication failed");
        AppError::unauthorized()
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
