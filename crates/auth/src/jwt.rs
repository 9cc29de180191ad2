//! Bearer-token issuance and validation.
//!
//! The spec calls for a token "signed with a JSON-Web-Key"; we model that as
//! an RS256 key pair (the JWK a client would fetch is the public half of
//! `key.encoding_key`/`key.decoding_key` below) rather than a shared HMAC
//! secret, so a deployment can expose a `/jwks.json` without handing out
//! signing material. Tests use [`SigningKey::hs256`] for speed — claims
//! validation is identical either way.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::principal::AuthenticatedUser;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImsClaims {
    /// Subject: the user's opaque directory uid.
    pub sub: String,
    pub short_names: Vec<String>,
    pub groups: Vec<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub iat: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub exp: DateTime<Utc>,
}

impl From<&ImsClaims> for AuthenticatedUser {
    fn from(claims: &ImsClaims) -> Self {
        AuthenticatedUser::new(claims.sub.clone(), claims.short_names.clone(), claims.groups.clone())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("missing bearer token")]
    Missing,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("token has expired")]
    Expired,
}

/// Key material used to sign and verify bearer tokens, plus the lifetime new
/// tokens are issued with (spec default: one hour).
pub struct SigningKey {
    algorithm: jsonwebtoken::Algorithm,
    encoding_key: jsonwebtoken::EncodingKey,
    decoding_key: jsonwebtoken::DecodingKey,
    pub token_lifetime: Duration,
}

impl SigningKey {
    /// RSA key pair, PEM-encoded. This is the production path: the public
    /// key can be published as a JWK without exposing signing material.
    pub fn rs256(private_pem: &[u8], public_pem: &[u8]) -> Result<Self, TokenError> {
        let encoding_key = jsonwebtoken::EncodingKey::from_rsa_pem(private_pem)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;
        let decoding_key = jsonwebtoken::DecodingKey::from_rsa_pem(public_pem)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;
        Ok(Self {
            algorithm: jsonwebtoken::Algorithm::RS256,
            encoding_key,
            decoding_key,
            token_lifetime: Duration::hours(1),
        })
    }

    /// HMAC-shared-secret key, used by tests and by deployments that choose
    /// not to run asymmetric key management.
    pub fn hs256(secret: impl AsRef<[u8]>) -> Self {
        Self {
            algorithm: jsonwebtoken::Algorithm::HS256,
            encoding_key: jsonwebtoken::EncodingKey::from_secret(secret.as_ref()),
            decoding_key: jsonwebtoken::DecodingKey::from_secret(secret.as_ref()),
            token_lifetime: Duration::hours(1),
        }
    }

    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    /// Issues a fresh bearer token for the given user, valid from `now` for
    /// `token_lifetime`.
    pub fn issue(&self, user: &AuthenticatedUser, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = ImsClaims {
            sub: user.uid.clone(),
            short_names: user.short_names.clone(),
            groups: user.groups.clone(),
            iat: now,
            exp: now + self.token_lifetime,
        };
        let header = jsonwebtoken::Header::new(self.algorithm);
        jsonwebtoken::encode(&header, &claims, &self.encoding_key).map_err(|e| TokenError::Malformed(e.to_string()))
    }

    /// Validates a bearer token's signature and expiry, returning its
    /// claims. Expiry is checked against `now` rather than wall-clock time
    /// so tests can exercise expiry deterministically.
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<ImsClaims, TokenError> {
        if token.trim().is_empty() {
            return Err(TokenError::Missing);
        }
        let mut validation = jsonwebtoken::Validation::new(self.algorithm);
        validation.validate_exp = false;
        let decoded = jsonwebtoken::decode::<ImsClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;
        if now >= decoded.claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(decoded.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> AuthenticatedUser {
        AuthenticatedUser::new("u1", vec!["alice".into()], vec!["dispatch".into()])
    }

    #[test]
    fn issue_then_validate_round_trips() {
        let key = SigningKey::hs256("test-secret");
        let now = Utc::now();
        let token = key.issue(&user(), now).unwrap();
        let claims = key.validate(&token, now).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.short_names, vec!["alice".to_string()]);
    }

    #[test]
    fn expired_token_is_rejected() {
        let key = SigningKey::hs256("test-secret").with_token_lifetime(Duration::minutes(1));
        let now = Utc::now();
        let token = key.issue(&user(), now).unwrap();
        let later = now + Duration::minutes(2);
        assert_eq!(key.validate(&token, later), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let key = SigningKey::hs256("test-secret");
        let other = SigningKey::hs256("other-secret");
        let now = Utc::now();
        let token = key.issue(&user(), now).unwrap();
        assert!(other.validate(&token, now).is_err());
    }

    #[test]
    fn empty_token_is_missing_not_malformed() {
        let key = SigningKey::hs256("test-secret");
        assert_eq!(key.validate("", Utc::now()), Err(TokenError::Missing));
    }
}
