//! HTTP handlers and route configuration.

mod health;
mod identity;
mod probe;

use actix_web::web;

/// Configure all application routes. Probe routes are only mounted in development.
pub fn configure_routes(cfg: &mut web::ServiceConfig, development: bool) {
    let mut api = web::scope("/api")
        // Public routes
        .route("/health", web::get().to(health::health_check))
        // Identity-required routes
        .route("/me", web::get().to(identity::me));

    if development {
        api = api.service(
            web::scope("/probe")
                .route("/token", web::post().to(probe::issue_token))
                .route("/{kind}", web::get().to(probe::raise)),
        );
    }

    cfg.service(api);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use actix_web::{App, test};
    use faultgate_core::domain::GatePolicy;
    use faultgate_infra::{InMemoryFailureTracker, SystemClock};
    use serde_json::Value;

    use crate::state::AppState;

    fn state() -> AppState {
        AppState {
            tracker: Arc::new(InMemoryFailureTracker::new(
                GatePolicy::default(),
                Arc::new(SystemClock),
            )),
            token_service: None,
        }
    }

    macro_rules! routed_app {
        ($development:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(state()))
                    .configure(|cfg| configure_routes(cfg, $development)),
            )
            .await
        };
    }

    #[actix_rt::test]
    async fn test_health_is_wrapped_in_envelope() {
        let app = routed_app!(false);
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "ok");
        assert_eq!(body["data"]["tracked_clients"], 0);
    }

    #[actix_rt::test]
    async fn test_me_requires_identity() {
        let app = routed_app!(false);
        let req = test::TestRequest::get().uri("/api/me").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);
    }

    #[actix_rt::test]
    async fn test_failure_routes_only_mounted_in_development() {
        let app = routed_app!(false);
        let req = test::TestRequest::get().uri("/api/probe/not-found").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 404);
        assert!(res.response().error().is_none());

        let app = routed_app!(true);
        for (kind, status) in [
            ("unauthorized", 401),
            ("invalid-argument", 400),
            ("not-found", 404),
            ("invalid-state", 400),
            ("unclassified", 500),
        ] {
            let req = test::TestRequest::get()
                .uri(&format!("/api/probe/{}", kind))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), status, "{kind}");
        }
    }

    #[actix_rt::test]
    async fn test_unknown_failure_kind_is_bad_request() {
        let app = routed_app!(true);
        let req = test::TestRequest::get().uri("/api/probe/meltdown").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }

    #[actix_rt::test]
    async fn test_token_issuing_without_token_service_is_invalid_state() {
        let app = routed_app!(true);
        let req = test::TestRequest::post()
            .uri("/api/probe/token")
            .set_json(serde_json::json!({ "subject": "42" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }
}
