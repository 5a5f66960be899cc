//! OTP-gated registration.
//!
//! Registration is staged: the first call parks the email with a 6-digit
//! code, the second call proves code possession and creates the account.
//! Staged rows never become accounts on their own and only the final step
//! writes to `accounts`.

use anyhow::Context;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::info;

use super::error::AuthError;
use super::session::{login_or_create_session, TokenPair};
use super::state::AuthState;
use super::storage::{self, InsertAccountOutcome, NewAccount, Role};
use super::utils::{generate_account_id, generate_otp_code, hash_password, normalize_email};
use crate::email::otp_message;

/// Stage a registration and send the verification code.
///
/// Re-requesting replaces the previous staged row, so only the newest code
/// verifies. The staged row and the email dispatch commit together; if the
/// mail cannot be handed off the row is rolled back and the caller may retry.
pub async fn start_registration(
    pool: &PgPool,
    state: &AuthState,
    email: &str,
) -> Result<(), AuthError> {
    let email = normalize_email(email);

    if storage::find_account_by_email(pool, &email).await?.is_some() {
        return Err(AuthError::EmailAlreadyRegistered);
    }

    let code = generate_otp_code();
    let expires_at = Utc::now() + Duration::minutes(state.config().otp_ttl_minutes());

    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    storage::delete_pending_registration(&mut tx, &email).await?;
    storage::insert_pending_registration(&mut tx, &email, &code, expires_at).await?;

    let (subject, body) = otp_message(&code, state.config().otp_ttl_minutes());
    state
        .mailer()
        .send(&email, &subject, &body)
        .map_err(AuthError::EmailDispatchFailed)?;

    tx.commit().await.context("failed to commit transaction")?;
    info!(%email, "staged registration");
    Ok(())
}

/// Verify the code, create the account, and open a session.
pub async fn complete_registration(
    pool: &PgPool,
    state: &AuthState,
    email: &str,
    code: &str,
    password: &str,
    device_id: Option<&str>,
) -> Result<TokenPair, AuthError> {
    let email = normalize_email(email);

    let pending = storage::find_pending_registration(pool, &email)
        .await?
        .ok_or(AuthError::NoPendingRegistration)?;
    if pending.expires_at <= Utc::now() {
        return Err(AuthError::CodeExpired);
    }
    if pending.code != code {
        return Err(AuthError::CodeMismatch);
    }

    let password_hash = hash_password(password)?;
    let account = NewAccount {
        account_id: generate_account_id(),
        name: None,
        email: Some(email.clone()),
        icon: String::new(),
        password_hash: Some(password_hash),
        role: Role::Normal,
        provider_subject: None,
        email_verified: true,
        last_login: Some(Utc::now()),
    };

    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let account = match storage::insert_account(&mut tx, &account).await? {
        InsertAccountOutcome::Created(account) => account,
        // Raced by a parallel completion for the same email.
        InsertAccountOutcome::Conflict => return Err(AuthError::EmailAlreadyRegistered),
    };
    storage::delete_pending_registration(&mut tx, &email).await?;
    tx.commit().await.context("failed to commit transaction")?;

    info!(account_id = %account.account_id, "registration completed");
    login_or_create_session(pool, state, &account, device_id).await
}
