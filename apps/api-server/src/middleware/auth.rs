//! Authentication middleware and extractors.
//!
//! [`Authenticate`] never rejects a request. It only attaches an [`Identity`] when a valid
//! bearer token is present, so the circuit gate can key the client by subject.

use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest,
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
};
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::sync::Arc;

use faultgate_core::ports::{AuthError, TokenClaims, TokenService};

use super::error::AppError;

/// Authenticated caller identity.
///
/// Use this in handlers to require authentication:
/// ```ignore
/// async fn protected_route(identity: Identity) -> impl Responder {
///     format!("Hello, {}!", identity.subject)
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub roles: Vec<String>,
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            subject: claims.subject,
            roles: claims.roles,
        }
    }
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let identity = req.extensions().get::<Identity>().cloned();
        ready(identity.ok_or_else(AppError::unauthorized))
    }
}

/// Extract the bearer token from the `Authorization` header.
fn bearer_token(req: &ServiceRequest) -> Result<&str, AuthError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?;

    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Invalid authorization header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidToken("Expected Bearer token".to_string()))
}

/// Middleware factory attaching [`Identity`] to authenticated requests.
pub struct Authenticate {
    tokens: Option<Arc<dyn TokenService>>,
}

impl Authenticate {
    /// Without a token service every request stays anonymous.
    pub fn new(tokens: Option<Arc<dyn TokenService>>) -> Self {
        Self { tokens }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authenticate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthenticateService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticateService {
            service,
            tokens: self.tokens.clone(),
        }))
    }
}

pub struct AuthenticateService<S> {
    service: S,
    tokens: Option<Arc<dyn TokenService>>,
}

impl<S, B> Service<ServiceRequest> for AuthenticateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(tokens) = &self.tokens {
            let claims = bearer_token(&req).and_then(|token| tokens.validate_token(token));

            match claims {
                Ok(claims) => {
                    req.extensions_mut().insert(Identity::from(claims));
                }
                Err(AuthError::MissingAuth) => {}
                Err(e) => tracing::debug!(error = %e, "Ignoring invalid bearer token"),
            }
        }

        Box::pin(self.service.call(req))
    }
}
