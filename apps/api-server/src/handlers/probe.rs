//! Development-only probes for exercising the circuit gate end to end.

use actix_web::{HttpResponse, web};
use faultgate_core::{DomainError, FailureKind};
use faultgate_shared::ApiResponse;
use serde::{Deserialize, Serialize};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TokenRequest {
    pub subject: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// GET /api/probe/{kind} - fails with the named failure kind.
pub async fn raise(kind: web::Path<String>) -> AppResult<HttpResponse> {
    let kind: FailureKind = kind.parse()?;
    Err(AppError::new(DomainError::of_kind(
        kind,
        format!("Probe raised {}", kind),
    )))
}

/// POST /api/probe/token - issues a bearer token for any subject.
pub async fn issue_token(
    state: web::Data<AppState>,
    body: web::Json<TokenRequest>,
) -> AppResult<HttpResponse> {
    let tokens = state
        .token_service
        .as_ref()
        .ok_or_else(|| AppError::invalid_state("Token issuing is not enabled"))?;

    let req = body.into_inner();
    let access_token = tokens
        .issue_token(&req.subject, req.roles)
        .map_err(|e| AppError::bad_request(e.to_string()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(TokenResponse {
        access_token,
        token_type: "Bearer",
        expires_in: tokens.expiration_seconds(),
    })))
}
