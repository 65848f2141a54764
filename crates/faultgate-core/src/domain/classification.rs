//! Mapping of failure kinds to client-facing status and message.

use crate::error::{DomainError, FailureKind};

const UNAUTHORIZED_MESSAGE: &str = "Unauthorized access";
const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred";
const GENERIC_SUPPORT_LINE: &str = "Please contact support if the problem persists.";

/// Result of classifying one failure. Derived per failure, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: u16,
    pub message: String,
    /// Hint that retrying the same request may succeed.
    pub retryable: bool,
}

/// How much diagnostic detail reaches the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailExposure {
    /// Raw message and stack trace are returned.
    Development,
    /// Only a generic support line is returned.
    #[default]
    Production,
}

impl DetailExposure {
    pub fn from_development(development: bool) -> Self {
        if development {
            DetailExposure::Development
        } else {
            DetailExposure::Production
        }
    }
}

/// Classifies failures and renders their detail lines under an injected exposure policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    exposure: DetailExposure,
}

impl Classifier {
    pub fn new(exposure: DetailExposure) -> Self {
        Self { exposure }
    }

    /// Map a failure tag and its raw message to status and public message.
    pub fn classify(&self, kind: FailureKind, message: &str) -> Classification {
        let (status, message) = match kind {
            FailureKind::Unauthorized => (401, UNAUTHORIZED_MESSAGE.to_string()),
            FailureKind::InvalidArgument => (400, message.to_string()),
            FailureKind::NotFound => (404, message.to_string()),
            FailureKind::InvalidState => (400, message.to_string()),
            FailureKind::Unclassified => (500, UNEXPECTED_MESSAGE.to_string()),
        };

        Classification {
            status,
            message,
            retryable: kind == FailureKind::Unclassified,
        }
    }

    pub fn classify_error(&self, error: &DomainError) -> Classification {
        self.classify(error.kind(), &error.to_string())
    }

    /// Detail lines for the error list.
    ///
    /// Development yields the raw message followed by the stack trace (empty when none was
    /// captured). Production yields the single generic support line.
    pub fn details(&self, raw_message: &str, stack_trace: Option<&str>) -> Vec<String> {
        match self.exposure {
            DetailExposure::Development => vec![
                raw_message.to_string(),
                stack_trace.unwrap_or_default().to_string(),
            ],
            DetailExposure::Production => vec![GENERIC_SUPPORT_LINE.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_table() {
        let classifier = Classifier::default();
        let cases = [
            (FailureKind::Unauthorized, 401, "Unauthorized access"),
            (FailureKind::InvalidArgument, 400, "raw"),
            (FailureKind::NotFound, 404, "raw"),
            (FailureKind::InvalidState, 400, "raw"),
            (FailureKind::Unclassified, 500, "An unexpected error occurred"),
        ];

        for (kind, status, message) in cases {
            let classification = classifier.classify(kind, "raw");
            assert_eq!(classification.status, status, "{kind}");
            assert_eq!(classification.message, message, "{kind}");
        }
    }

    #[test]
    fn test_only_unclassified_is_retryable() {
        let classifier = Classifier::default();
        for kind in FailureKind::ALL {
            assert_eq!(
                classifier.classify(kind, "x").retryable,
                kind == FailureKind::Unclassified
            );
        }
    }

    #[test]
    fn test_internal_message_never_exposed() {
        let classification = Classifier::default()
            .classify_error(&DomainError::Internal("pool exhausted on db-2".into()));
        assert_eq!(classification.message, "An unexpected error occurred");
    }

    #[test]
    fn test_development_details() {
        let classifier = Classifier::new(DetailExposure::from_development(true));
        let lines = classifier.details("Ticket is already closed", Some("at close_ticket"));
        assert_eq!(lines, vec!["Ticket is already closed", "at close_ticket"]);

        let lines = classifier.details("boom", None);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "");
    }

    #[test]
    fn test_production_details() {
        let classifier = Classifier::new(DetailExposure::from_development(false));
        let lines = classifier.details("Ticket is already closed", Some("at close_ticket"));
        assert_eq!(lines, vec!["Please contact support if the problem persists."]);
    }
}
