//! Application state - shared across all handlers and middleware.

use std::sync::Arc;

use faultgate_core::ports::{FailureTracker, TokenService};
use faultgate_infra::{InMemoryFailureTracker, SystemClock};

#[cfg(feature = "auth")]
use faultgate_infra::JwtTokenService;

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<dyn FailureTracker>,
    pub token_service: Option<Arc<dyn TokenService>>,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub fn new(config: &AppConfig) -> Self {
        let tracker: Arc<dyn FailureTracker> = Arc::new(InMemoryFailureTracker::new(
            config.gate.policy,
            Arc::new(SystemClock),
        ));

        #[cfg(feature = "auth")]
        let token_service: Option<Arc<dyn TokenService>> =
            Some(Arc::new(JwtTokenService::from_env()));

        #[cfg(not(feature = "auth"))]
        let token_service: Option<Arc<dyn TokenService>> = {
            tracing::info!("Running without auth feature - all clients keyed by address");
            None
        };

        tracing::info!(
            threshold = config.gate.policy.failure_threshold,
            window_secs = config.gate.policy.window.num_seconds(),
            cooldown_secs = config.gate.policy.cooldown.num_seconds(),
            "Application state initialized"
        );

        Self {
            tracker,
            token_service,
        }
    }
}
