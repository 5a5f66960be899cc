//! OTP-gated password reset.
//!
//! Three steps: request a code, prove possession of it, then set the new
//! password with the same code. Setting the password deletes every
//! outstanding challenge for the account, so nothing survives a successful
//! reset.

use anyhow::Context;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::info;

use super::error::AuthError;
use super::state::AuthState;
use super::storage;
use super::utils::{generate_otp_code, hash_password, normalize_email};
use crate::email::otp_message;

/// Issue a reset challenge for the account behind this email.
///
/// Earlier challenges stay valid until they expire or the password changes;
/// a user who requests twice can answer with either code.
pub async fn request_reset(pool: &PgPool, state: &AuthState, email: &str) -> Result<(), AuthError> {
    let email = normalize_email(email);
    let account = storage::find_account_by_email(pool, &email)
        .await?
        .ok_or(AuthError::AccountNotFound)?;

    let code = generate_otp_code();
    let expires_at = Utc::now() + Duration::minutes(state.config().otp_ttl_minutes());

    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    storage::insert_password_reset(&mut tx, &account.account_id, &code, expires_at).await?;

    let (subject, body) = otp_message(&code, state.config().otp_ttl_minutes());
    state
        .mailer()
        .send(&email, &subject, &body)
        .map_err(AuthError::EmailDispatchFailed)?;

    tx.commit().await.context("failed to commit transaction")?;
    info!(account_id = %account.account_id, "password reset challenge issued");
    Ok(())
}

/// Check a code without consuming it. The frontend calls this between the
/// code-entry and new-password screens.
pub async fn verify_otp(pool: &PgPool, email: &str, code: &str) -> Result<(), AuthError> {
    let email = normalize_email(email);
    let account = storage::find_account_by_email(pool, &email)
        .await?
        .ok_or(AuthError::AccountNotFound)?;

    let challenge = storage::find_password_reset(pool, &account.account_id, code)
        .await?
        .ok_or(AuthError::InvalidOtp)?;
    if challenge.expires_at <= Utc::now() {
        return Err(AuthError::OtpExpired);
    }
    Ok(())
}

/// Store the new password and delete every challenge for the account, not
/// just the one the caller verified; a password change closes the whole
/// reset window.
pub async fn set_new_password(
    pool: &PgPool,
    email: &str,
    new_password: &str,
) -> Result<(), AuthError> {
    let email = normalize_email(email);
    let account = storage::find_account_by_email(pool, &email)
        .await?
        .ok_or(AuthError::AccountNotFound)?;

    let password_hash = hash_password(new_password)?;

    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    storage::update_password(&mut tx, &account.account_id, &password_hash).await?;
    storage::delete_password_resets(&mut tx, &account.account_id).await?;
    tx.commit().await.context("failed to commit transaction")?;

    info!(account_id = %account.account_id, "password reset completed");
    Ok(())
}
