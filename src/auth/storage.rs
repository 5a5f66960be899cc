//! Database helpers for accounts, sessions, and staged OTP records.
//!
//! Four tables back the subsystem (see `migrations/`):
//! `accounts`, `sessions` (refresh-token records), `pending_registrations`,
//! and `password_resets`. Queries are runtime-bound; every call is wrapped in
//! a `db.query` span. Refresh-token strings are bound as parameters and never
//! interpolated into statements or logs.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::str::FromStr;
use tracing::Instrument;
use uuid::Uuid;

use super::utils::is_unique_violation;

/// Flat role field; there is no permission engine behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Normal,
    Admin,
    Guest,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Admin => "admin",
            Self::Guest => "guest",
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "normal" => Ok(Self::Normal),
            "admin" => Ok(Self::Admin),
            "guest" => Ok(Self::Guest),
            other => Err(anyhow!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub account_id: String,
    pub ordinal: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub icon: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub provider_subject: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Fields supplied when creating an account; ordinal and created_at are
/// assigned by the database.
#[derive(Debug)]
pub struct NewAccount {
    pub account_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub icon: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub provider_subject: Option<String>,
    pub email_verified: bool,
    pub last_login: Option<DateTime<Utc>>,
}

/// Outcome of an account insert; a unique violation on email or provider
/// subject surfaces as `Conflict` rather than an error.
#[derive(Debug)]
pub enum InsertAccountOutcome {
    Created(AccountRecord),
    Conflict,
}

/// One refresh-token record, scoped to an account and a device.
#[derive(Debug, Clone)]
pub struct SessionRow {
    pub id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub device_id: Option<String>,
    pub account_id: String,
}

#[derive(Debug, Clone)]
pub struct PendingRegistrationRow {
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PasswordResetRow {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub account_id: String,
}

const ACCOUNT_COLUMNS: &str = "account_id, ordinal, name, email, icon, password_hash, role, \
     provider_subject, email_verified, created_at, last_login";

fn row_to_account(row: &sqlx::postgres::PgRow) -> Result<AccountRecord> {
    let role: String = row.get("role");
    Ok(AccountRecord {
        account_id: row.get("account_id"),
        ordinal: row.get("ordinal"),
        name: row.get("name"),
        email: row.get("email"),
        icon: row.get("icon"),
        password_hash: row.get("password_hash"),
        role: role.parse()?,
        provider_subject: row.get("provider_subject"),
        email_verified: row.get("email_verified"),
        created_at: row.get("created_at"),
        last_login: row.get("last_login"),
    })
}

fn row_to_session(row: &sqlx::postgres::PgRow) -> SessionRow {
    SessionRow {
        id: row.get("id"),
        token: row.get("token"),
        expires_at: row.get("expires_at"),
        revoked: row.get("revoked"),
        device_id: row.get("device_id"),
        account_id: row.get("account_id"),
    }
}

pub(crate) async fn find_account_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<AccountRecord>> {
    let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account by email")?;
    row.as_ref().map(row_to_account).transpose()
}

pub(crate) async fn find_account_by_subject(
    pool: &PgPool,
    provider_subject: &str,
) -> Result<Option<AccountRecord>> {
    let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE provider_subject = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(provider_subject)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account by provider subject")?;
    row.as_ref().map(row_to_account).transpose()
}

pub(crate) async fn find_account_by_id_tx(
    tx: &mut Transaction<'_, Postgres>,
    account_id: &str,
) -> Result<Option<AccountRecord>> {
    let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(account_id)
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to lookup account by id")?;
    row.as_ref().map(row_to_account).transpose()
}

pub(crate) async fn insert_account(
    tx: &mut Transaction<'_, Postgres>,
    account: &NewAccount,
) -> Result<InsertAccountOutcome> {
    let query = format!(
        r"
        INSERT INTO accounts
            (account_id, name, email, icon, password_hash, role, provider_subject,
             email_verified, last_login)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {ACCOUNT_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(&account.account_id)
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.icon)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(&account.provider_subject)
        .bind(account.email_verified)
        .bind(account.last_login)
        .fetch_one(&mut **tx)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(InsertAccountOutcome::Created(row_to_account(&row)?)),
        Err(err) if is_unique_violation(&err) => Ok(InsertAccountOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert account"),
    }
}

pub(crate) async fn update_password(
    tx: &mut Transaction<'_, Postgres>,
    account_id: &str,
    password_hash: &str,
) -> Result<()> {
    let query = "UPDATE accounts SET password_hash = $2 WHERE account_id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(account_id)
        .bind(password_hash)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to update password hash")?;
    Ok(())
}

pub(crate) async fn update_last_login(pool: &PgPool, account_id: &str) -> Result<()> {
    let query = "UPDATE accounts SET last_login = NOW() WHERE account_id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(account_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update last login")?;
    Ok(())
}

/// Lock the session row for the given token so concurrent refresh calls on
/// the same token serialize on the rotation decision.
pub(crate) async fn lock_session_by_token(
    tx: &mut Transaction<'_, Postgres>,
    token: &str,
) -> Result<Option<SessionRow>> {
    let query = r"
        SELECT id, token, expires_at, revoked, device_id, account_id
        FROM sessions
        WHERE token = $1
        FOR UPDATE
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token)
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to lock session by token")?;
    Ok(row.as_ref().map(row_to_session))
}

pub(crate) async fn find_active_session_for_device(
    pool: &PgPool,
    account_id: &str,
    device_id: &str,
) -> Result<Option<SessionRow>> {
    let query = r"
        SELECT id, token, expires_at, revoked, device_id, account_id
        FROM sessions
        WHERE account_id = $1
          AND device_id = $2
          AND NOT revoked
          AND expires_at > NOW()
        ORDER BY expires_at DESC
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(account_id)
        .bind(device_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup session for device")?;
    Ok(row.as_ref().map(row_to_session))
}

pub(crate) async fn insert_session(
    tx: &mut Transaction<'_, Postgres>,
    token: &str,
    expires_at: DateTime<Utc>,
    device_id: Option<&str>,
    account_id: &str,
) -> Result<()> {
    let query = r"
        INSERT INTO sessions (token, expires_at, device_id, account_id)
        VALUES ($1, $2, $3, $4)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token)
        .bind(expires_at)
        .bind(device_id)
        .bind(account_id)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to insert session")?;
    Ok(())
}

/// Mark a session superseded. Revocation is one-way; nothing un-revokes.
pub(crate) async fn revoke_session(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<()> {
    let query = "UPDATE sessions SET revoked = TRUE WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to revoke session")?;
    Ok(())
}

/// Delete on logout. Returns the number of rows removed so the caller can
/// distinguish "already gone".
pub(crate) async fn delete_session_by_token(pool: &PgPool, token: &str) -> Result<u64> {
    let query = "DELETE FROM sessions WHERE token = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(token)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete session")?;
    Ok(result.rows_affected())
}

pub(crate) async fn delete_pending_registration(
    tx: &mut Transaction<'_, Postgres>,
    email: &str,
) -> Result<()> {
    let query = "DELETE FROM pending_registrations WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to delete pending registration")?;
    Ok(())
}

pub(crate) async fn insert_pending_registration(
    tx: &mut Transaction<'_, Postgres>,
    email: &str,
    code: &str,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    let query = r"
        INSERT INTO pending_registrations (email, code, expires_at)
        VALUES ($1, $2, $3)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind(code)
        .bind(expires_at)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to insert pending registration")?;
    Ok(())
}

pub(crate) async fn find_pending_registration(
    pool: &PgPool,
    email: &str,
) -> Result<Option<PendingRegistrationRow>> {
    let query = r"
        SELECT email, code, expires_at
        FROM pending_registrations
        WHERE email = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup pending registration")?;
    Ok(row.map(|row| PendingRegistrationRow {
        email: row.get("email"),
        code: row.get("code"),
        expires_at: row.get("expires_at"),
    }))
}

pub(crate) async fn insert_password_reset(
    tx: &mut Transaction<'_, Postgres>,
    account_id: &str,
    code: &str,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    let query = r"
        INSERT INTO password_resets (account_id, code, expires_at)
        VALUES ($1, $2, $3)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(account_id)
        .bind(code)
        .bind(expires_at)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to insert password reset challenge")?;
    Ok(())
}

pub(crate) async fn find_password_reset(
    pool: &PgPool,
    account_id: &str,
    code: &str,
) -> Result<Option<PasswordResetRow>> {
    let query = r"
        SELECT code, expires_at, account_id
        FROM password_resets
        WHERE account_id = $1
          AND code = $2
        ORDER BY expires_at DESC
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(account_id)
        .bind(code)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup password reset challenge")?;
    Ok(row.map(|row| PasswordResetRow {
        code: row.get("code"),
        expires_at: row.get("expires_at"),
        account_id: row.get("account_id"),
    }))
}

/// Remove every outstanding challenge for the account, not just the code
/// that was verified; a password change closes the whole reset window.
pub(crate) async fn delete_password_resets(
    tx: &mut Transaction<'_, Postgres>,
    account_id: &str,
) -> Result<()> {
    let query = "DELETE FROM password_resets WHERE account_id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(account_id)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to delete password reset challenges")?;
    Ok(())
}

pub(crate) async fn delete_expired_sessions(pool: &PgPool) -> Result<u64> {
    let query = "DELETE FROM sessions WHERE expires_at < NOW()";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete expired sessions")?;
    Ok(result.rows_affected())
}

pub(crate) async fn delete_expired_pending_registrations(pool: &PgPool) -> Result<u64> {
    let query = "DELETE FROM pending_registrations WHERE expires_at < NOW()";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete expired pending registrations")?;
    Ok(result.rows_affected())
}

pub(crate) async fn delete_expired_password_resets(pool: &PgPool) -> Result<u64> {
    let query = "DELETE FROM password_resets WHERE expires_at < NOW()";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete expired password reset challenges")?;
    Ok(result.rows_affected())
}
