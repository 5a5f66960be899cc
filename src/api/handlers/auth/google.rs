//! Google OAuth callback endpoints.
//!
//! Both callbacks end in a browser redirect to the frontend: success lands
//! on `/auth-success` with the access token in the query (the refresh token
//! rides the cookie), failure lands on `/error` with a message. The `state`
//! query value carries `<state>:<deviceId>` as the frontend composed it when
//! starting the flow.

use axum::{
    extract::{Extension, Query},
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Redirect},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, warn};
use url::Url;

use crate::auth::utils::split_oauth_state;
use crate::auth::{google, AuthState, TokenPair};

use super::refresh_cookie;
use super::types::CallbackParams;

fn frontend_redirect(base: &str, path: &str, params: &[(&str, &str)]) -> Redirect {
    match Url::parse(base).and_then(|url| url.join(path)) {
        Ok(mut url) => {
            url.query_pairs_mut().extend_pairs(params);
            Redirect::to(url.as_str())
        }
        // A bad frontend base URL is a deployment error; fall back to a bare
        // relative path so the response is still a redirect.
        Err(err) => {
            error!("Invalid frontend base URL: {err}");
            Redirect::to(path)
        }
    }
}

fn error_redirect(state: &AuthState, message: &str) -> Redirect {
    frontend_redirect(
        state.config().frontend_base_url(),
        "/error",
        &[("message", message)],
    )
}

fn success_response(
    state: &AuthState,
    pair: &TokenPair,
    is_login_flow: bool,
) -> axum::response::Response {
    let redirect = frontend_redirect(
        state.config().frontend_base_url(),
        "/auth-success",
        &[
            ("accessToken", pair.access_token.as_str()),
            ("isLoginFlow", if is_login_flow { "true" } else { "false" }),
        ],
    );

    let mut headers = HeaderMap::new();
    match refresh_cookie(state.config(), &pair.refresh_token) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build refresh cookie: {err}");
            return error_redirect(state, "Authentication failed").into_response();
        }
    }
    (headers, redirect).into_response()
}

fn callback_inputs(
    state: &AuthState,
    params: &CallbackParams,
) -> Result<(String, Option<String>), Redirect> {
    if let Some(provider_error) = params.error.as_deref() {
        warn!(provider_error, "provider declined the authorization");
        return Err(error_redirect(state, "Authentication was cancelled"));
    }
    let Some(code) = params.code.clone() else {
        return Err(error_redirect(state, "Missing authorization code"));
    };
    // The device id is optional; a malformed state value only loses session
    // reuse, not the login itself.
    let device_id = params
        .state
        .as_deref()
        .and_then(|received| split_oauth_state(received).ok())
        .map(|(_, device_id)| device_id.to_string());
    Ok((code, device_id))
}

pub async fn register_callback(
    Query(params): Query<CallbackParams>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let (code, device_id) = match callback_inputs(&auth_state, &params) {
        Ok(inputs) => inputs,
        Err(redirect) => return redirect.into_response(),
    };

    match google::register(&pool, &auth_state, &code, device_id.as_deref()).await {
        Ok(pair) => success_response(&auth_state, &pair, false),
        Err(err) => error_redirect(&auth_state, &err.to_string()).into_response(),
    }
}

pub async fn login_callback(
    Query(params): Query<CallbackParams>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let (code, device_id) = match callback_inputs(&auth_state, &params) {
        Ok(inputs) => inputs,
        Err(redirect) => return redirect.into_response(),
    };

    match google::login(&pool, &auth_state, &code, device_id.as_deref()).await {
        Ok(pair) => success_response(&auth_state, &pair, true),
        Err(err) => error_redirect(&auth_state, &err.to_string()).into_response(),
    }
}
