//! Session issuance, refresh with rotation, and logout.
//!
//! A session is one refresh-token record scoped to an account and a device.
//! Refresh verifies the presented token, locks its row, and only mints a
//! replacement refresh token when the record has entered the rotation window
//! (90 days or less of its 180-day lifetime remaining by default). Outside
//! the window the same refresh token keeps serving fresh access tokens.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::debug;

use super::error::AuthError;
use super::state::AuthState;
use super::storage::{self, AccountRecord, SessionRow};
use super::utils::{normalize_email, verify_password};

/// Both credentials minted at login.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a refresh call. `rotated_refresh_token` is set only when the
/// presented token was replaced; the caller must then re-issue the cookie.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub access_token: String,
    pub rotated_refresh_token: Option<String>,
}

/// What the store knows about a presented refresh token. The distinctions
/// matter for logging even though the client-facing failure is uniform.
#[derive(Debug)]
pub enum SessionLookup {
    Active(SessionRow),
    Revoked,
    Expired,
    NotFound,
}

pub(crate) fn classify(row: Option<SessionRow>, now: DateTime<Utc>) -> SessionLookup {
    match row {
        None => SessionLookup::NotFound,
        Some(row) if row.revoked => SessionLookup::Revoked,
        Some(row) if row.expires_at <= now => SessionLookup::Expired,
        Some(row) => SessionLookup::Active(row),
    }
}

/// A session rotates once its remaining lifetime drops to the threshold.
pub(crate) fn needs_rotation(
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
    threshold_days: i64,
) -> bool {
    expires_at - now <= Duration::days(threshold_days)
}

/// Ensure exactly one active session per (account, device) and mint both
/// credentials.
///
/// An active session already tied to the same device goes through the
/// refresh path instead of inserting a duplicate row, so rotation policy
/// applies on login too.
pub(crate) async fn login_or_create_session(
    pool: &PgPool,
    state: &AuthState,
    account: &AccountRecord,
    device_id: Option<&str>,
) -> Result<TokenPair, AuthError> {
    if let Some(device_id) = device_id {
        if let Some(existing) =
            storage::find_active_session_for_device(pool, &account.account_id, device_id).await?
        {
            debug!(account_id = %account.account_id, "reusing active session for device");
            match refresh(pool, state, &existing.token).await {
                Ok(outcome) => {
                    storage::update_last_login(pool, &account.account_id).await?;
                    return Ok(TokenPair {
                        access_token: outcome.access_token,
                        refresh_token: outcome
                            .rotated_refresh_token
                            .unwrap_or(existing.token),
                    });
                }
                // The row vanished or stopped verifying between lookup and
                // refresh; fall through and open a fresh session.
                Err(AuthError::InvalidRefreshToken) => {}
                Err(err) => return Err(err),
            }
        }
    }

    let access_token = state.codec().issue_access_token(account)?;
    let refresh_token = state.codec().issue_refresh_token(&account.account_id)?;
    let expires_at = Utc::now() + Duration::days(state.config().refresh_ttl_days());

    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    storage::insert_session(
        &mut tx,
        &refresh_token,
        expires_at,
        device_id,
        &account.account_id,
    )
    .await?;
    tx.commit().await.context("failed to commit transaction")?;

    storage::update_last_login(pool, &account.account_id).await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Email + password login.
pub async fn login_with_email(
    pool: &PgPool,
    state: &AuthState,
    email: &str,
    password: &str,
    device_id: Option<&str>,
) -> Result<TokenPair, AuthError> {
    let email = normalize_email(email);
    let account = storage::find_account_by_email(pool, &email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    // Accounts created through federation have no password to check.
    let Some(hash) = account.password_hash.as_deref() else {
        return Err(AuthError::InvalidCredentials);
    };
    if !verify_password(password, hash)? {
        return Err(AuthError::InvalidCredentials);
    }

    login_or_create_session(pool, state, &account, device_id).await
}

/// Exchange a refresh token for a fresh access token, rotating the session
/// when it is inside the rotation window.
pub async fn refresh(
    pool: &PgPool,
    state: &AuthState,
    refresh_token: &str,
) -> Result<RefreshOutcome, AuthError> {
    // Signature and expiry first; a token we never signed does not get a
    // database roundtrip.
    state
        .codec()
        .verify_refresh_token(refresh_token)
        .map_err(|_| AuthError::InvalidRefreshToken)?;

    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let row = storage::lock_session_by_token(&mut tx, refresh_token).await?;

    let session = match classify(row, Utc::now()) {
        SessionLookup::Active(session) => session,
        SessionLookup::Revoked => {
            debug!("refresh rejected: session revoked");
            return Err(AuthError::InvalidRefreshToken);
        }
        SessionLookup::Expired => {
            debug!("refresh rejected: session expired");
            return Err(AuthError::InvalidRefreshToken);
        }
        SessionLookup::NotFound => {
            debug!("refresh rejected: no session record");
            return Err(AuthError::InvalidRefreshToken);
        }
    };

    let account = storage::find_account_by_id_tx(&mut tx, &session.account_id)
        .await?
        .ok_or_else(|| anyhow!("session {} references a missing account", session.id))?;

    let rotated_refresh_token = if needs_rotation(
        session.expires_at,
        Utc::now(),
        state.config().rotation_threshold_days(),
    ) {
        let new_token = state.codec().issue_refresh_token(&account.account_id)?;
        let expires_at = Utc::now() + Duration::days(state.config().refresh_ttl_days());
        storage::revoke_session(&mut tx, session.id).await?;
        storage::insert_session(
            &mut tx,
            &new_token,
            expires_at,
            session.device_id.as_deref(),
            &account.account_id,
        )
        .await?;
        debug!(account_id = %account.account_id, "rotated refresh token");
        Some(new_token)
    } else {
        None
    };

    let access_token = state.codec().issue_access_token(&account)?;
    tx.commit().await.context("failed to commit transaction")?;

    Ok(RefreshOutcome {
        access_token,
        rotated_refresh_token,
    })
}

/// Remove the session for this refresh token. Absence is reported so the
/// caller can decide whether it matters; for cookie-driven logout it does
/// not.
pub async fn logout(pool: &PgPool, refresh_token: &str) -> Result<(), AuthError> {
    let deleted = storage::delete_session_by_token(pool, refresh_token).await?;
    if deleted == 0 {
        return Err(AuthError::SessionNotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn session_row(expires_at: DateTime<Utc>, revoked: bool) -> SessionRow {
        SessionRow {
            id: Uuid::nil(),
            token: "token".to_string(),
            expires_at,
            revoked,
            device_id: Some("dev-1".to_string()),
            account_id: "a1b2c3d4e5f6".to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn classify_missing_row() {
        assert!(matches!(classify(None, now()), SessionLookup::NotFound));
    }

    #[test]
    fn classify_revoked_wins_over_expiry() {
        let row = session_row(now() - Duration::days(1), true);
        assert!(matches!(classify(Some(row), now()), SessionLookup::Revoked));
    }

    #[test]
    fn classify_expired_row() {
        let row = session_row(now() - Duration::seconds(1), false);
        assert!(matches!(classify(Some(row), now()), SessionLookup::Expired));
    }

    #[test]
    fn classify_active_row() {
        let row = session_row(now() + Duration::days(100), false);
        assert!(matches!(
            classify(Some(row), now()),
            SessionLookup::Active(_)
        ));
    }

    #[test]
    fn rotation_triggers_at_threshold() {
        // Exactly 90 days remaining rotates.
        assert!(needs_rotation(now() + Duration::days(90), now(), 90));
        assert!(needs_rotation(now() + Duration::days(1), now(), 90));
    }

    #[test]
    fn rotation_skipped_above_threshold() {
        assert!(!needs_rotation(
            now() + Duration::days(90) + Duration::seconds(1),
            now(),
            90
        ));
        assert!(!needs_rotation(now() + Duration::days(180), now(), 90));
    }
}
