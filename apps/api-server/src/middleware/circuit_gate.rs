//! Circuit gate middleware.
//!
//! Sits at the request boundary and decides, per client key, whether a request reaches
//! the handlers at all:
//!
//! 1. Clients in cooldown get `429 Too Many Requests` without dispatch.
//! 2. Otherwise the request is dispatched. A failure coming back (an [`AppError`] attached
//!    to the response, or an error from the inner service) is classified, recorded on the
//!    client's tracker and rewritten into the failure envelope.
//!
//! A failure that pushes the tracker into cooldown is still answered with its classified
//! status. The block applies from the next request on.

use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::StatusCode,
};
use chrono::TimeDelta;
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use faultgate_core::domain::{ClientKey, Classifier, TrackerState};
use faultgate_core::ports::{CooldownStatus, FailureTracker};
use faultgate_core::{DomainError, FailureKind};
use faultgate_shared::ApiResponse;

use super::client_key::resolve_client_key;
use super::error::AppError;
use crate::observability::CorrelationId;

const BLOCKED_MESSAGE: &str = "Too many errors occurred. Please try again later or contact admin.";

/// Gate behaviour not covered by the tracker policy.
#[derive(Debug, Clone)]
pub struct GateSettings {
    pub classifier: Classifier,
    pub support_contact: String,
    pub trust_forwarded: bool,
}

/// Circuit gate middleware factory.
pub struct CircuitGate {
    tracker: Arc<dyn FailureTracker>,
    settings: Rc<GateSettings>,
}

impl CircuitGate {
    pub fn new(tracker: Arc<dyn FailureTracker>, settings: GateSettings) -> Self {
        Self {
            tracker,
            settings: Rc::new(settings),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CircuitGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = CircuitGateService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CircuitGateService {
            service,
            tracker: self.tracker.clone(),
            settings: self.settings.clone(),
        }))
    }
}

pub struct CircuitGateService<S> {
    service: S,
    tracker: Arc<dyn FailureTracker>,
    settings: Rc<GateSettings>,
}

impl<S, B> Service<ServiceRequest> for CircuitGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let key = resolve_client_key(req.request(), self.settings.trust_forwarded);
        let correlation_id = CorrelationId::of(req.request());

        if let CooldownStatus::Blocked { remaining } = self.tracker.check_cooldown(&key) {
            tracing::warn!(
                correlation_id = %correlation_id,
                client_key = %key,
                remaining_secs = remaining.num_seconds(),
                "Client has exceeded max error attempts. Blocked temporarily."
            );

            let response = blocked_response(remaining, &self.settings.support_contact);
            let (http_req, _payload) = req.into_parts();
            let srv_response = ServiceResponse::new(http_req, response);

            return Box::pin(async move { Ok(srv_response.map_into_right_body()) });
        }

        let http_req = req.request().clone();
        let fut = self.service.call(req);
        let gate = Gate {
            tracker: self.tracker.clone(),
            settings: self.settings.clone(),
            key,
            correlation_id,
        };

        Box::pin(async move {
            match fut.await {
                Ok(res) => {
                    let response = match res.response().error() {
                        Some(err) => match err.as_error::<AppError>() {
                            Some(failure) => Some(gate.failure_response(
                                failure.domain_error(),
                                failure.stack_trace(),
                            )),
                            None => Some(framework_response(
                                res.status(),
                                err,
                                &gate.settings.classifier,
                            )),
                        },
                        None => None,
                    };

                    match response {
                        Some(response) => {
                            let (http_req, _) = res.into_parts();
                            Ok(ServiceResponse::new(http_req, response).map_into_right_body())
                        }
                        None => Ok(res.map_into_left_body()),
                    }
                }
                Err(err) => {
                    let response = match err.as_error::<AppError>() {
                        Some(failure) => {
                            gate.failure_response(failure.domain_error(), failure.stack_trace())
                        }
                        None => gate.failure_response(
                            &DomainError::Internal(err.to_string()),
                            None,
                        ),
                    };
                    Ok(ServiceResponse::new(http_req, response).map_into_right_body())
                }
            }
        })
    }
}

/// Per-request context for handling a downstream failure.
struct Gate {
    tracker: Arc<dyn FailureTracker>,
    settings: Rc<GateSettings>,
    key: ClientKey,
    correlation_id: String,
}

impl Gate {
    fn failure_response(&self, error: &DomainError, stack_trace: Option<&str>) -> HttpResponse {
        let classifier = &self.settings.classifier;
        let classification = classifier.classify_error(error);

        let snapshot = self.tracker.record_failure(&self.key);
        let policy = self.tracker.policy();

        if error.kind() == FailureKind::Unclassified {
            tracing::error!(
                correlation_id = %self.correlation_id,
                client_key = %self.key,
                attempt = snapshot.failures_in_window,
                threshold = policy.failure_threshold,
                error = %error,
                "Unhandled failure at request boundary"
            );
        } else {
            tracing::warn!(
                correlation_id = %self.correlation_id,
                client_key = %self.key,
                attempt = snapshot.failures_in_window,
                threshold = policy.failure_threshold,
                kind = %error.kind(),
                error = %error,
                "Request failed"
            );
        }

        let mut errors = Vec::new();
        match snapshot.state {
            TrackerState::Warning => errors.push(format!(
                "Warning: You have {} attempt(s) remaining before temporary block.",
                policy.attempts_remaining(snapshot.failures_in_window)
            )),
            TrackerState::Cooldown => tracing::warn!(
                correlation_id = %self.correlation_id,
                client_key = %self.key,
                cooldown_secs = policy.cooldown.num_seconds(),
                "Client reached the failure threshold, blocking subsequent requests"
            ),
            TrackerState::Normal => {}
        }
        errors.extend(classifier.details(&error.to_string(), stack_trace));

        let status =
            StatusCode::from_u16(classification.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        HttpResponse::build(status).json(ApiResponse::failure(classification.message, errors))
    }
}

/// Extractor and framework errors keep their status and are not tracked.
fn framework_response(status: StatusCode, error: &Error, classifier: &Classifier) -> HttpResponse {
    let message = error.to_string();
    tracing::debug!(status = status.as_u16(), error = %message, "Framework error at request boundary");

    let errors = classifier.details(&message, None);
    HttpResponse::build(status).json(ApiResponse::failure(message, errors))
}

fn blocked_response(remaining: TimeDelta, support_contact: &str) -> HttpResponse {
    let body = ApiResponse::failure(
        BLOCKED_MESSAGE,
        vec![
            format!(
                "Please wait {} minutes before trying again.",
                remaining.num_minutes()
            ),
            format!(
                "If the issue persists, contact support at: {}",
                support_contact
            ),
        ],
    );

    HttpResponse::TooManyRequests()
        .insert_header(("Retry-After", retry_after_secs(remaining).to_string()))
        .json(body)
}

/// Whole seconds until the block lifts, rounded up.
fn retry_after_secs(remaining: TimeDelta) -> i64 {
    let millis = remaining.num_milliseconds().max(0);
    (millis + 999) / 1000
}
