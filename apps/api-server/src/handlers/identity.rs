//! Caller identity endpoint.

use actix_web::{HttpResponse, web};
use faultgate_core::domain::{ClientKey, TrackerSnapshot, TrackerState};
use faultgate_shared::ApiResponse;
use serde::Serialize;

use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

#[derive(Serialize)]
pub struct IdentityResponse {
    pub subject: String,
    pub roles: Vec<String>,
    pub gate: Option<GateStatus>,
}

#[derive(Serialize)]
pub struct GateStatus {
    pub state: TrackerState,
    pub failures_in_window: u32,
    pub remaining_cooldown_secs: i64,
}

impl From<TrackerSnapshot> for GateStatus {
    fn from(snapshot: TrackerSnapshot) -> Self {
        Self {
            state: snapshot.state,
            failures_in_window: snapshot.failures_in_window,
            remaining_cooldown_secs: snapshot.remaining_cooldown.num_seconds(),
        }
    }
}

/// GET /api/me - requires a valid bearer token.
pub async fn me(identity: Identity, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let key = ClientKey::resolve(Some(&identity.subject), None);
    let gate = state.tracker.snapshot(&key).map(GateStatus::from);

    Ok(HttpResponse::Ok().json(ApiResponse::ok(IdentityResponse {
        subject: identity.subject,
        roles: identity.roles,
        gate,
    })))
}
