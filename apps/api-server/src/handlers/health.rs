//! Health check endpoint.

use actix_web::{HttpResponse, web};
use faultgate_shared::ApiResponse;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub tracked_clients: usize,
}

/// Health check endpoint - returns server status.
///
/// GET /api/health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let response = HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        tracked_clients: state.tracker.len(),
    };

    HttpResponse::Ok().json(ApiResponse::ok(response))
}
