//! Small helpers: identifier/code generation, email checks, password hashing.

use anyhow::{anyhow, Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng as SaltRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use regex::Regex;

const ACCOUNT_ID_LEN: usize = 12;

/// Random external-facing account id (12 alphanumeric characters).
pub(crate) fn generate_account_id() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(ACCOUNT_ID_LEN)
        .map(char::from)
        .collect()
}

/// 6-digit one-time code for registration and password-reset emails.
pub(crate) fn generate_otp_code() -> String {
    OsRng.gen_range(100_000..1_000_000).to_string()
}

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

pub(crate) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut SaltRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

pub(crate) fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|err| anyhow!("stored password hash is malformed: {err}"))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(anyhow!("failed to verify password: {err}")),
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Split the OAuth `state` query value into its CSRF state and device id
/// halves (`<state>:<deviceId>`).
pub(crate) fn split_oauth_state(received: &str) -> Result<(&str, &str)> {
    let (state, device_id) = received
        .split_once(':')
        .context("malformed OAuth state value")?;
    if state.is_empty() || device_id.is_empty() {
        return Err(anyhow!("malformed OAuth state value"));
    }
    Ok((state, device_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_length_and_charset() {
        let id = generate_account_id();
        assert_eq!(id.len(), ACCOUNT_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn account_ids_are_random() {
        assert_ne!(generate_account_id(), generate_account_id());
    }

    #[test]
    fn otp_code_is_six_digits() {
        for _ in 0..32 {
            let code = generate_otp_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(code.as_bytes()[0], b'0');
        }
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn password_hash_round_trip() -> Result<()> {
        let hash = hash_password("hunter2hunter2")?;
        assert!(verify_password("hunter2hunter2", &hash)?);
        assert!(!verify_password("wrong-password", &hash)?);
        Ok(())
    }

    #[test]
    fn verify_password_rejects_malformed_hash() {
        assert!(verify_password("pw", "not-a-phc-string").is_err());
    }

    #[test]
    fn split_oauth_state_extracts_device_id() -> Result<()> {
        let (state, device_id) = split_oauth_state("csrf-token:dev-1")?;
        assert_eq!(state, "csrf-token");
        assert_eq!(device_id, "dev-1");
        Ok(())
    }

    #[test]
    fn split_oauth_state_rejects_missing_halves() {
        assert!(split_oauth_state("no-separator").is_err());
        assert!(split_oauth_state(":dev-1").is_err());
        assert!(split_oauth_state("csrf:").is_err());
    }
}
