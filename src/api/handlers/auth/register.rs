//! Registration endpoints.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::auth::{registration, AuthState};
use crate::auth::utils::{normalize_email, valid_email};

use super::types::{CompleteRegistrationRequest, MessageResponse, StartRegistrationRequest, TokenResponse};
use super::{refresh_cookie, valid_password};

/// Stage a registration and email a 6-digit code to the address.
pub async fn start(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<StartRegistrationRequest>>,
) -> impl IntoResponse {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    match registration::start_registration(&pool, &auth_state, &email).await {
        Ok(()) => Json(MessageResponse {
            message: "Verification code sent".to_string(),
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Verify the code, create the account, and answer with both credentials:
/// access token in the body, refresh token as the cookie.
pub async fn complete(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<CompleteRegistrationRequest>>,
) -> impl IntoResponse {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    if !valid_password(&request.password) {
        return (StatusCode::BAD_REQUEST, "Password is too short".to_string()).into_response();
    }

    let pair = match registration::complete_registration(
        &pool,
        &auth_state,
        &request.email,
        request.code.trim(),
        &request.password,
        request.device_id.as_deref(),
    )
    .await
    {
        Ok(pair) => pair,
        Err(err) => return err.into_response(),
    };

    let mut headers = HeaderMap::new();
    match refresh_cookie(auth_state.config(), &pair.refresh_token) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build refresh cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    (
        StatusCode::CREATED,
        headers,
        Json(TokenResponse {
            access_token: pair.access_token,
        }),
    )
        .into_response()
}
