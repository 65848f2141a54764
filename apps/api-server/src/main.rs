//! # Faultgate API Server
//!
//! Actix-web server with a per-client circuit gate in front of every route.

use actix_web::{App, HttpServer, web};
use faultgate_core::domain::{Classifier, DetailExposure};
use tracing_actix_web::TracingLogger;

mod background;
mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod telemetry;

use config::AppConfig;
use middleware::{Authenticate, CircuitGate, GateSettings};
use observability::CorrelationIdMiddleware;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env()?;
    let development = config.environment.is_development();

    tracing::info!(
        host = %config.host,
        port = config.port,
        development,
        "Starting Faultgate API Server"
    );

    let state = AppState::new(&config);
    let sweep = background::start_tracker_sweep(state.tracker.clone(), &config.sweep).await?;

    let settings = GateSettings {
        classifier: Classifier::new(DetailExposure::from_development(development)),
        support_contact: config.gate.support_contact.clone(),
        trust_forwarded: config.gate.trust_forwarded,
    };

    let server_state = state.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(CircuitGate::new(
                server_state.tracker.clone(),
                settings.clone(),
            ))
            .wrap(Authenticate::new(server_state.token_service.clone()))
            .wrap(CorrelationIdMiddleware)
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(server_state.clone()))
            .configure(|cfg| handlers::configure_routes(cfg, development))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    sweep.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}
