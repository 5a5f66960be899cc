//! Typed failure taxonomy for the auth core.
//!
//! Every operation returns one of these variants; the routing layer maps them
//! to a status code and a stable machine-readable code so clients never parse
//! human-readable messages.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Refresh token not found, revoked, or past expiry.
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    /// Logout with a token that matches no session. Callers treat this as
    /// idempotent success after clearing client-side state.
    #[error("session not found")]
    SessionNotFound,
    /// Unknown email or wrong password; deliberately collapsed into one
    /// variant so login responses do not reveal which part failed.
    #[error("email or password is incorrect")]
    InvalidCredentials,
    #[error("this email address is already registered")]
    EmailAlreadyRegistered,
    #[error("no pending registration for this email")]
    NoPendingRegistration,
    #[error("the verification code has expired")]
    CodeExpired,
    #[error("the verification code does not match")]
    CodeMismatch,
    #[error("no account is registered for this email")]
    AccountNotFound,
    #[error("invalid one-time password")]
    InvalidOtp,
    #[error("the one-time password has expired")]
    OtpExpired,
    #[error("this Google account is already registered")]
    AccountAlreadyLinked,
    #[error("this Google account is not registered")]
    AccountNotLinked,
    #[error("failed to obtain tokens from the provider")]
    TokenExchangeFailed,
    #[error("invalid identity token")]
    InvalidIdentityToken,
    #[error("failed to dispatch the verification email")]
    EmailDispatchFailed(#[source] anyhow::Error),
    /// Storage or signing failure; details are logged, not exposed.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRefreshToken => "invalid_refresh_token",
            Self::SessionNotFound => "session_not_found",
            Self::InvalidCredentials => "invalid_credentials",
            Self::EmailAlreadyRegistered => "email_already_registered",
            Self::NoPendingRegistration => "no_pending_registration",
            Self::CodeExpired => "code_expired",
            Self::CodeMismatch => "code_mismatch",
            Self::AccountNotFound => "account_not_found",
            Self::InvalidOtp => "invalid_otp",
            Self::OtpExpired => "otp_expired",
            Self::AccountAlreadyLinked => "account_already_linked",
            Self::AccountNotLinked => "account_not_linked",
            Self::TokenExchangeFailed => "token_exchange_failed",
            Self::InvalidIdentityToken => "invalid_identity_token",
            Self::EmailDispatchFailed(_) => "email_dispatch_failed",
            Self::Internal(_) => "internal",
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRefreshToken
            | Self::InvalidCredentials
            | Self::CodeExpired
            | Self::CodeMismatch
            | Self::InvalidOtp
            | Self::OtpExpired
            | Self::InvalidIdentityToken => StatusCode::UNAUTHORIZED,
            Self::SessionNotFound
            | Self::NoPendingRegistration
            | Self::AccountNotFound
            | Self::AccountNotLinked => StatusCode::NOT_FOUND,
            Self::EmailAlreadyRegistered | Self::AccountAlreadyLinked => StatusCode::CONFLICT,
            Self::TokenExchangeFailed | Self::EmailDispatchFailed(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        // Internal details stay in the logs; clients get the stable code only.
        match &self {
            Self::EmailDispatchFailed(err) => error!("email dispatch failed: {err:#}"),
            Self::Internal(err) => error!("internal auth failure: {err:#}"),
            _ => {}
        }
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn status_mapping_follows_taxonomy() {
        assert_eq!(
            AuthError::InvalidRefreshToken.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::CodeExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::AccountNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AuthError::EmailAlreadyRegistered.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AuthError::AccountAlreadyLinked.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AuthError::TokenExchangeFailed.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::Internal(anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(AuthError::InvalidRefreshToken.code(), "invalid_refresh_token");
        assert_eq!(AuthError::CodeMismatch.code(), "code_mismatch");
        assert_eq!(AuthError::AccountNotLinked.code(), "account_not_linked");
        assert_eq!(
            AuthError::EmailDispatchFailed(anyhow!("smtp down")).code(),
            "email_dispatch_failed"
        );
    }

    #[test]
    fn response_carries_code_and_status() {
        let response = AuthError::InvalidOtp.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
