//! Outbound mail seam.
//!
//! The auth core only needs "deliver this one-time code"; everything behind
//! that is a [`Mailer`] implementation. [`LogMailer`] is the default wiring
//! and writes the message to the logs, which is what local development and
//! the test suite want.

use anyhow::Result;
use tracing::info;

pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Logs instead of delivering.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        info!(%to, %subject, "email (log only): {body}");
        Ok(())
    }
}

/// Subject and body for a one-time code email.
#[must_use]
pub fn otp_message(code: &str, ttl_minutes: i64) -> (String, String) {
    (
        "Your verification code".to_string(),
        format!(
            "Your verification code is {code}. It expires in {ttl_minutes} minutes.\n\
             If you did not request this code, you can ignore this message."
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_mailer_always_succeeds() {
        assert!(LogMailer.send("a@example.com", "subject", "body").is_ok());
    }

    #[test]
    fn otp_message_includes_code_and_deadline() {
        let (subject, body) = otp_message("123456", 30);
        assert_eq!(subject, "Your verification code");
        assert!(body.contains("123456"));
        assert!(body.contains("30 minutes"));
    }
}
