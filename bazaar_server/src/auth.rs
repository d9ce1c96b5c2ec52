//! JWT claims extraction and validation.
//!
//! The server does not register users or mint end-user tokens; an upstream identity service issues HS256 tokens
//! with the same shared secret. This module validates those tokens and exposes the claims to handlers via the
//! actix `FromRequest` machinery. [`TokenIssuer`] exists for tooling and tests.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpMessage, HttpRequest};
use bazaar_engine::db_types::Role;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{config::AuthConfig, errors::ServerError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user id.
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl JwtClaims {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Could not serialize access token. {0}")]
    CouldNotSerializeToken(String),
}

//-------------------------------------------------  JwtValidator  -----------------------------------------------------
/// Validates access tokens against the shared HS256 secret. Registered as app data so that both the claims
/// extractor and the ACL middleware can reach it.
#[derive(Clone)]
pub struct JwtValidator {
    decoding_key: DecodingKey,
}

impl JwtValidator {
    pub fn new(config: &AuthConfig) -> Self {
        Self { decoding_key: DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes()) }
    }

    pub fn validate(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<JwtClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::ValidationError(e.to_string()))
    }
}

//-------------------------------------------------  TokenIssuer  ------------------------------------------------------
pub struct TokenIssuer {
    encoding_key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { encoding_key: EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes()) }
    }

    pub fn issue_token(
        &self,
        user_id: &str,
        email: &str,
        role: Role,
        validity: Option<Duration>,
    ) -> Result<String, AuthError> {
        let validity = validity.unwrap_or_else(|| Duration::hours(24));
        let claims = JwtClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role,
            exp: (Utc::now() + validity).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::CouldNotSerializeToken(e.to_string()))
    }
}

/// Pulls the access token off a request: `Authorization: Bearer` first, then a `token` query parameter (the only
/// option browsers have for WebSocket upgrades).
fn access_token(req: &HttpRequest) -> Option<String> {
    let from_header = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string());
    from_header.or_else(|| {
        web::Query::<std::collections::HashMap<String, String>>::from_query(req.query_string())
            .ok()
            .and_then(|q| q.get("token").cloned())
    })
}

/// Validates the request's access token and returns its claims. Claims already validated by middleware earlier in
/// the chain are reused rather than re-checked.
pub(crate) fn extract_claims(req: &HttpRequest) -> Result<JwtClaims, ServerError> {
    if let Some(claims) = req.extensions().get::<JwtClaims>() {
        return Ok(claims.clone());
    }
    let validator = req
        .app_data::<web::Data<JwtValidator>>()
        .ok_or_else(|| ServerError::ConfigurationError("JWT validator is not registered".to_string()))?;
    let token = access_token(req).ok_or(ServerError::CouldNotDeserializeAuthToken)?;
    let claims = validator.validate(&token).map_err(|e| {
        debug!("💻️ Access token rejected. {e}");
        ServerError::CouldNotDeserializeAuthToken
    })?;
    req.extensions_mut().insert(claims.clone());
    Ok(claims)
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_claims(req))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig { jwt_secret: bazaar_common::Secret::new("test-secret-for-auth-module-tests".to_string()) }
    }

    #[test]
    fn issued_tokens_validate() {
        let issuer = TokenIssuer::new(&config());
        let validator = JwtValidator::new(&config());
        let token = issuer.issue_token("user-1", "user@example.com", Role::User, None).unwrap();
        let claims = validator.validate(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, Role::User);
        assert!(!claims.is_admin());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let issuer = TokenIssuer::new(&config());
        let validator = JwtValidator::new(&config());
        let token =
            issuer.issue_token("user-1", "user@example.com", Role::User, Some(Duration::seconds(-120))).unwrap();
        assert!(validator.validate(&token).is_err());
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let issuer = TokenIssuer::new(&config());
        let validator = JwtValidator::new(&config());
        let mut token = issuer.issue_token("user-1", "user@example.com", Role::Admin, None).unwrap();
        token.replace_range(token.len() - 5.., "AAAAA");
        assert!(validator.validate(&token).is_err());
    }
}
