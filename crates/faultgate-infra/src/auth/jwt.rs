//! HS256 bearer tokens keyed by subject.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use faultgate_core::ports::{AuthError, TokenClaims, TokenService};

const DEFAULT_SECRET: &str = "change-me-in-production";
const DEFAULT_ISSUER: &str = "faultgate-api";

/// Signing secret, token lifetime and expected issuer.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_SECRET.to_string(),
            expiration_hours: 24,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }
}

impl JwtConfig {
    /// Read `JWT_SECRET`, `JWT_EXPIRATION_HOURS` and `JWT_ISSUER`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            secret: std::env::var("JWT_SECRET").unwrap_or(defaults.secret),
            expiration_hours: std::env::var("JWT_EXPIRATION_HOURS")
                .ok()
                .and_then(|hours| hours.parse().ok())
                .unwrap_or(defaults.expiration_hours),
            issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.issuer),
        };

        if config.secret == DEFAULT_SECRET {
            tracing::warn!("JWT_SECRET is unset, bearer tokens are signed with the default secret");
        }

        config
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    roles: Vec<String>,
    exp: i64,
    iat: i64,
    iss: String,
}

/// [`TokenService`] over `jsonwebtoken` with an issuer check.
pub struct JwtTokenService {
    keys: (EncodingKey, DecodingKey),
    config: JwtConfig,
}

impl JwtTokenService {
    pub fn new(config: JwtConfig) -> Self {
        let secret = config.secret.as_bytes();
        Self {
            keys: (EncodingKey::from_secret(secret), DecodingKey::from_secret(secret)),
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::new(JwtConfig::from_env())
    }
}

impl TokenService for JwtTokenService {
    fn issue_token(&self, subject: &str, roles: Vec<String>) -> Result<String, AuthError> {
        let issued_at = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            roles,
            exp: (issued_at + TimeDelta::hours(self.config.expiration_hours)).timestamp(),
            iat: issued_at.timestamp(),
            iss: self.config.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.keys.0)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    fn validate_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let claims = decode::<Claims>(token, &self.keys.1, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            })?
            .claims;

        // An empty subject would key the client as anonymous.
        if claims.sub.is_empty() {
            return Err(AuthError::InvalidToken("Empty subject".to_string()));
        }

        Ok(TokenClaims {
            subject: claims.sub,
            roles: claims.roles,
            exp: claims.exp,
        })
    }

    fn expiration_seconds(&self) -> i64 {
        self.config.expiration_hours * 3600
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtTokenService {
        JwtTokenService::new(JwtConfig {
            secret: "test-secret-key".to_string(),
            expiration_hours: 1,
            issuer: "test-issuer".to_string(),
        })
    }

    #[test]
    fn test_subject_survives_round_trip() {
        let service = service();
        let token = service.issue_token("42", vec!["agent".to_string()]).unwrap();

        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.subject, "42");
        assert_eq!(claims.roles, vec!["agent".to_string()]);
    }

    #[test]
    fn test_rejects_garbage_and_empty_subject() {
        let service = service();
        assert!(matches!(
            service.validate_token("not-a-jwt"),
            Err(AuthError::InvalidToken(_))
        ));

        let anonymous = service.issue_token("", vec![]).unwrap();
        assert!(matches!(
            service.validate_token(&anonymous),
            Err(AuthError::InvalidToken(_))
        ));
    }
}
