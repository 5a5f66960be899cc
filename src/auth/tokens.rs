//! Stateless signed-token codec.
//!
//! Two token classes, signed with HS256 under distinct secrets so one class
//! never verifies as the other. Access tokens carry the account profile
//! snapshot; refresh tokens carry only the subject. Verification is pure;
//! whether a refresh token still maps to a live session is the session
//! store's question, not the codec's.

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config::{DEFAULT_ACCESS_TTL_SECONDS, DEFAULT_REFRESH_TTL_DAYS};
use super::storage::{AccountRecord, Role};

/// Claims embedded in an access token. A snapshot of the account at issue
/// time; holders present it for up to the access TTL without a database hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub ordinal: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub icon: String,
    pub role: Role,
    pub provider_subject: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Claims embedded in a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token is malformed or has a bad signature")]
    Malformed,
}

/// Signs and verifies both token classes. Cheap to clone behind the shared
/// state; secrets stay wrapped until the moment of key derivation.
#[derive(Clone)]
pub struct CredentialCodec {
    access_secret: SecretString,
    refresh_secret: SecretString,
    access_ttl_seconds: i64,
    refresh_ttl_days: i64,
}

impl CredentialCodec {
    #[must_use]
    pub fn new(access_secret: SecretString, refresh_secret: SecretString) -> Self {
        Self {
            access_secret,
            refresh_secret,
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_days: DEFAULT_REFRESH_TTL_DAYS,
        }
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_days(mut self, days: i64) -> Self {
        self.refresh_ttl_days = days;
        self
    }

    #[must_use]
    pub fn refresh_ttl_days(&self) -> i64 {
        self.refresh_ttl_days
    }

    pub fn issue_access_token(&self, account: &AccountRecord) -> Result<String> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: account.account_id.clone(),
            ordinal: account.ordinal,
            provider_subject: account.provider_subject.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            icon: account.icon.clone(),
            role: account.role,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.access_ttl_seconds)).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.access_secret.expose_secret().as_bytes()),
        )
        .map_err(|err| anyhow!("failed to sign access token: {err}"))
    }

    pub fn issue_refresh_token(&self, account_id: &str) -> Result<String> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: account_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(self.refresh_ttl_days)).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.refresh_secret.expose_secret().as_bytes()),
        )
        .map_err(|err| anyhow!("failed to sign refresh token: {err}"))
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let key = DecodingKey::from_secret(self.access_secret.expose_secret().as_bytes());
        decode::<AccessClaims>(token, &key, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(classify)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let key = DecodingKey::from_secret(self.refresh_secret.expose_secret().as_bytes());
        decode::<RefreshClaims>(token, &key, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(classify)
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}
