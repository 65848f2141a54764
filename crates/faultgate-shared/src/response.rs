//! Standardized API response envelope.

use serde::{Deserialize, Serialize};

/// Envelope for every JSON response.
///
/// Failures always carry `success = false`, a message and a non-empty error list:
///
/// ```json
/// { "success": false, "message": "...", "errors": ["..."] }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: Vec::new(),
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            errors,
        }
    }
}
