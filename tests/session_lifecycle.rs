//! Database-backed lifecycle tests.
//!
//! These run against a real Postgres named by `KIROKU_TEST_DSN` and skip
//! when it is not set. Each test uses a fresh random email so runs do not
//! interfere with each other or leave state that matters.

use std::sync::Arc;

use anyhow::Result;
use kiroku::auth::password_reset::{request_reset, set_new_password, verify_otp};
use kiroku::auth::registration::{complete_registration, start_registration};
use kiroku::auth::session::{login_with_email, refresh};
use kiroku::auth::tokens::CredentialCodec;
use kiroku::auth::{AuthConfig, AuthError, AuthState, GoogleConfig};
use kiroku::email::LogMailer;
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

async fn test_pool() -> Result<Option<PgPool>> {
    let Ok(dsn) = std::env::var("KIROKU_TEST_DSN") else {
        eprintln!("Skipping database test: KIROKU_TEST_DSN is not set");
        return Ok(None);
    };
    let pool = PgPoolOptions::new().max_connections(2).connect(&dsn).await?;
    sqlx::migrate!().run(&pool).await?;
    Ok(Some(pool))
}

fn auth_state() -> Result<AuthState> {
    let config = AuthConfig::new("http://localhost:5174".to_string());
    let google = GoogleConfig::new(
        "client-id".to_string(),
        SecretString::from("client-secret".to_string()),
        "http://localhost:8080/auth/google/login/callback".to_string(),
        "http://localhost:8080/auth/google/register/callback".to_string(),
    );
    let codec = CredentialCodec::new(
        SecretString::from("access-secret".to_string()),
        SecretString::from("refresh-secret".to_string()),
    );
    AuthState::new(config, google, codec, Arc::new(LogMailer))
}

fn unique_email() -> String {
    format!("{}@example.com", Uuid::new_v4().simple())
}

async fn staged_code(pool: &PgPool, email: &str) -> Result<String> {
    let row = sqlx::query("SELECT code FROM pending_registrations WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(row.get("code"))
}

async fn register_account(
    pool: &PgPool,
    state: &AuthState,
    email: &str,
    password: &str,
    device_id: Option<&str>,
) -> Result<String> {
    start_registration(pool, state, email).await?;
    let code = staged_code(pool, email).await?;
    complete_registration(pool, state, email, &code, password, device_id).await?;
    Ok(code)
}

#[tokio::test]
async fn restaging_replaces_the_pending_row() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let state = auth_state()?;
    let email = unique_email();

    start_registration(&pool, &state, &email).await?;
    start_registration(&pool, &state, &email).await?;

    let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM pending_registrations WHERE email = $1")
        .bind(&email)
        .fetch_one(&pool)
        .await?
        .get("n");
    assert_eq!(count, 1);

    // The surviving code is the newest one and completes the registration.
    let code = staged_code(&pool, &email).await?;
    complete_registration(&pool, &state, &email, &code, "hunter2-hunter2", Some("dev-1")).await?;
    Ok(())
}

#[tokio::test]
async fn login_reuses_the_single_active_session_per_device() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let state = auth_state()?;
    let email = unique_email();

    register_account(&pool, &state, &email, "hunter2-hunter2", Some("dev-1")).await?;
    login_with_email(&pool, &state, &email, "hunter2-hunter2", Some("dev-1")).await?;

    let count: i64 = sqlx::query(
        "SELECT COUNT(*) AS n FROM sessions \
         WHERE device_id = $1 AND NOT revoked AND expires_at > NOW() \
         AND account_id = (SELECT account_id FROM accounts WHERE email = $2)",
    )
    .bind("dev-1")
    .bind(&email)
    .fetch_one(&pool)
    .await?
    .get("n");
    assert_eq!(count, 1);
    Ok(())
}

#[tokio::test]
async fn rotated_out_refresh_token_is_rejected() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let state = auth_state()?;
    let email = unique_email();

    start_registration(&pool, &state, &email).await?;
    let code = staged_code(&pool, &email).await?;
    let pair =
        complete_registration(&pool, &state, &email, &code, "hunter2-hunter2", Some("dev-1"))
            .await?;

    // Push the session inside the rotation window so the next refresh
    // replaces it.
    sqlx::query("UPDATE sessions SET expires_at = NOW() + INTERVAL '10 days' WHERE token = $1")
        .bind(&pair.refresh_token)
        .execute(&pool)
        .await?;

    let outcome = refresh(&pool, &state, &pair.refresh_token).await?;
    assert!(outcome.rotated_refresh_token.is_some());

    let replayed = refresh(&pool, &state, &pair.refresh_token).await;
    assert!(matches!(replayed, Err(AuthError::InvalidRefreshToken)));
    Ok(())
}

#[tokio::test]
async fn password_change_closes_every_reset_challenge() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let state = auth_state()?;
    let email = unique_email();

    register_account(&pool, &state, &email, "hunter2-hunter2", None).await?;
    request_reset(&pool, &state, &email).await?;
    request_reset(&pool, &state, &email).await?;

    let codes: Vec<String> = sqlx::query(
        "SELECT code FROM password_resets \
         WHERE account_id = (SELECT account_id FROM accounts WHERE email = $1)",
    )
    .bind(&email)
    .fetch_all(&pool)
    .await?
    .into_iter()
    .map(|row| row.get("code"))
    .collect();
    assert_eq!(codes.len(), 2);
    verify_otp(&pool, &email, &codes[0]).await?;

    set_new_password(&pool, &email, "correct-horse-battery").await?;

    for code in &codes {
        let stale = verify_otp(&pool, &email, code).await;
        assert!(matches!(stale, Err(AuthError::InvalidOtp)));
    }
    login_with_email(&pool, &state, &email, "correct-horse-battery", None).await?;
    Ok(())
}
