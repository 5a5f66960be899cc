//! Shared per-process auth state, built once at startup and handed to the
//! router behind an `Arc`.

use std::sync::Arc;

use anyhow::{Context, Result};
use std::time::Duration;

use super::config::{AuthConfig, GoogleConfig};
use super::tokens::CredentialCodec;
use crate::email::Mailer;
use crate::APP_USER_AGENT;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AuthState {
    config: AuthConfig,
    google: GoogleConfig,
    codec: CredentialCodec,
    mailer: Arc<dyn Mailer>,
    http: reqwest::Client,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        google: GoogleConfig,
        codec: CredentialCodec,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            config,
            google,
            codec,
            mailer,
            http,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn google(&self) -> &GoogleConfig {
        &self.google
    }

    #[must_use]
    pub fn codec(&self) -> &CredentialCodec {
        &self.codec
    }

    #[must_use]
    pub fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::auth_state;
    use crate::auth::config::{DEFAULT_OTP_TTL_MINUTES, DEFAULT_REFRESH_TTL_DAYS};

    #[test]
    fn state_exposes_injected_configuration() {
        let state = auth_state();
        assert_eq!(state.google().client_id(), "client-id");
        assert_eq!(state.config().refresh_ttl_days(), DEFAULT_REFRESH_TTL_DAYS);
        assert_eq!(state.config().otp_ttl_minutes(), DEFAULT_OTP_TTL_MINUTES);
        assert!(!state.config().refresh_cookie_secure());
    }
}
