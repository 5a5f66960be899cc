//! Password-reset endpoints. Three steps, each gated on the emailed code.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::utils::{normalize_email, valid_email};
use crate::auth::{password_reset, AuthState};

use super::types::{MessageResponse, ResetRequest, SetPasswordRequest, VerifyOtpRequest};
use super::valid_password;

pub async fn request(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetRequest>>,
) -> impl IntoResponse {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    match password_reset::request_reset(&pool, &auth_state, &email).await {
        Ok(()) => Json(MessageResponse {
            message: "Password reset code sent".to_string(),
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn verify(
    pool: Extension<PgPool>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> impl IntoResponse {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match password_reset::verify_otp(&pool, &request.email, request.code.trim()).await {
        Ok(()) => Json(MessageResponse {
            message: "Code verified".to_string(),
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn complete(
    pool: Extension<PgPool>,
    payload: Option<Json<SetPasswordRequest>>,
) -> impl IntoResponse {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    if !valid_password(&request.new_password) {
        return (StatusCode::BAD_REQUEST, "Password is too short".to_string()).into_response();
    }

    match password_reset::set_new_password(&pool, &request.email, &request.new_password).await {
        Ok(()) => Json(MessageResponse {
            message: "Password updated".to_string(),
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}
