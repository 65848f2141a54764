//! Domain-level error types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Domain errors - business logic failures raised by downstream handlers.
///
/// The message carried by each variant is the raw failure message. Whether it reaches
/// the client is decided by classification, not here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unauthorized access")]
    Unauthorized,

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Internal(String),
}

impl DomainError {
    /// The tag the classifier operates on.
    pub fn kind(&self) -> FailureKind {
        match self {
            DomainError::Unauthorized => FailureKind::Unauthorized,
            DomainError::InvalidArgument(_) => FailureKind::InvalidArgument,
            DomainError::NotFound(_) => FailureKind::NotFound,
            DomainError::InvalidState(_) => FailureKind::InvalidState,
            DomainError::Internal(_) => FailureKind::Unclassified,
        }
    }

    /// Build an error of the given kind carrying `message`.
    pub fn of_kind(kind: FailureKind, message: impl Into<String>) -> Self {
        match kind {
            FailureKind::Unauthorized => DomainError::Unauthorized,
            FailureKind::InvalidArgument => DomainError::InvalidArgument(message.into()),
            FailureKind::NotFound => DomainError::NotFound(message.into()),
            FailureKind::InvalidState => DomainError::InvalidState(message.into()),
            FailureKind::Unclassified => DomainError::Internal(message.into()),
        }
    }
}

/// Failure tags understood by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Unauthorized,
    InvalidArgument,
    NotFound,
    InvalidState,
    Unclassified,
}

impl FailureKind {
    pub const ALL: [FailureKind; 5] = [
        FailureKind::Unauthorized,
        FailureKind::InvalidArgument,
        FailureKind::NotFound,
        FailureKind::InvalidState,
        FailureKind::Unclassified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::InvalidArgument => "invalid-argument",
            FailureKind::NotFound => "not-found",
            FailureKind::InvalidState => "invalid-state",
            FailureKind::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FailureKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DomainError::InvalidArgument(format!("Unknown failure kind '{}'", s)))
    }
}

/// Rejected gate policy values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Failure threshold must be at least 1")]
    ZeroThreshold,

    #[error("{0} must be a positive duration")]
    NonPositive(&'static str),

    #[error("Retention horizon must be at least as long as the counting window")]
    RetentionShorterThanWindow,

    #[error("Idle horizon must be at least as long as the cooldown duration")]
    IdleHorizonShorterThanCooldown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_tag() {
        for kind in FailureKind::ALL {
            assert_eq!(kind.as_str().parse::<FailureKind>().unwrap(), kind);
            assert_eq!(DomainError::of_kind(kind, "boom").kind(), kind);
        }
    }

    #[test]
    fn test_unknown_tag_is_invalid_argument() {
        let err = "teapot".parse::<FailureKind>().unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidArgument);
        assert_eq!(err.to_string(), "Unknown failure kind 'teapot'");
    }

    #[test]
    fn test_display_is_raw_message() {
        assert_eq!(
            DomainError::InvalidState("Ticket is already closed".into()).to_string(),
            "Ticket is already closed"
        );
        assert_eq!(DomainError::Unauthorized.to_string(), "Unauthorized access");
    }

    #[test]
    fn test_kind_serializes_as_kebab_case_tag() {
        assert_eq!(
            serde_json::to_value(FailureKind::InvalidArgument).unwrap(),
            serde_json::json!("invalid-argument")
        );
        let kind: FailureKind = serde_json::from_str("\"not-found\"").unwrap();
        assert_eq!(kind, FailureKind::NotFound);
    }
}
