//! Auth configuration: token lifetimes, OTP deadlines, and OAuth client
//! settings. Built once at startup and injected; business logic never reads
//! ambient environment state.

use secrecy::SecretString;

pub const DEFAULT_ACCESS_TTL_SECONDS: i64 = 3 * 60 * 60;
pub const DEFAULT_REFRESH_TTL_DAYS: i64 = 180;
pub const DEFAULT_ROTATION_THRESHOLD_DAYS: i64 = 90;
pub const DEFAULT_OTP_TTL_MINUTES: i64 = 30;

const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_JWKS_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v3/certs";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    access_ttl_seconds: i64,
    refresh_ttl_days: i64,
    rotation_threshold_days: i64,
    otp_ttl_minutes: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_days: DEFAULT_REFRESH_TTL_DAYS,
            rotation_threshold_days: DEFAULT_ROTATION_THRESHOLD_DAYS,
            otp_ttl_minutes: DEFAULT_OTP_TTL_MINUTES,
        }
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_days(mut self, days: i64) -> Self {
        self.refresh_ttl_days = days;
        self
    }

    #[must_use]
    pub fn with_rotation_threshold_days(mut self, days: i64) -> Self {
        self.rotation_threshold_days = days;
        self
    }

    #[must_use]
    pub fn with_otp_ttl_minutes(mut self, minutes: i64) -> Self {
        self.otp_ttl_minutes = minutes;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }

    #[must_use]
    pub fn refresh_ttl_days(&self) -> i64 {
        self.refresh_ttl_days
    }

    #[must_use]
    pub fn rotation_threshold_days(&self) -> i64 {
        self.rotation_threshold_days
    }

    #[must_use]
    pub fn otp_ttl_minutes(&self) -> i64 {
        self.otp_ttl_minutes
    }

    /// Only mark the refresh cookie secure when the frontend is served over HTTPS.
    #[must_use]
    pub fn refresh_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

/// Google OAuth client settings. Register and login flows use different
/// redirect URIs; the token exchange must present the one the flow started
/// with or the provider rejects the code.
#[derive(Clone, Debug)]
pub struct GoogleConfig {
    client_id: String,
    client_secret: SecretString,
    login_redirect_uri: String,
    register_redirect_uri: String,
    token_endpoint: String,
    jwks_endpoint: String,
}

impl GoogleConfig {
    #[must_use]
    pub fn new(
        client_id: String,
        client_secret: SecretString,
        login_redirect_uri: String,
        register_redirect_uri: String,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            login_redirect_uri,
            register_redirect_uri,
            token_endpoint: GOOGLE_TOKEN_ENDPOINT.to_string(),
            jwks_endpoint: GOOGLE_JWKS_ENDPOINT.to_string(),
        }
    }

    #[must_use]
    pub fn with_token_endpoint(mut self, endpoint: String) -> Self {
        self.token_endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn with_jwks_endpoint(mut self, endpoint: String) -> Self {
        self.jwks_endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }

    #[must_use]
    pub fn login_redirect_uri(&self) -> &str {
        &self.login_redirect_uri
    }

    #[must_use]
    pub fn register_redirect_uri(&self) -> &str {
        &self.register_redirect_uri
    }

    #[must_use]
    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }

    #[must_use]
    pub fn jwks_endpoint(&self) -> &str {
        &self.jwks_endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new("https://kiroku.app".to_string());

        assert_eq!(config.frontend_base_url(), "https://kiroku.app");
        assert_eq!(config.access_ttl_seconds(), DEFAULT_ACCESS_TTL_SECONDS);
        assert_eq!(config.refresh_ttl_days(), DEFAULT_REFRESH_TTL_DAYS);
        assert_eq!(
            config.rotation_threshold_days(),
            DEFAULT_ROTATION_THRESHOLD_DAYS
        );
        assert_eq!(config.otp_ttl_minutes(), DEFAULT_OTP_TTL_MINUTES);

        let config = config
            .with_access_ttl_seconds(60)
            .with_refresh_ttl_days(30)
            .with_rotation_threshold_days(15)
            .with_otp_ttl_minutes(5);

        assert_eq!(config.access_ttl_seconds(), 60);
        assert_eq!(config.refresh_ttl_days(), 30);
        assert_eq!(config.rotation_threshold_days(), 15);
        assert_eq!(config.otp_ttl_minutes(), 5);
    }

    #[test]
    fn refresh_cookie_secure_follows_scheme() {
        assert!(AuthConfig::new("https://kiroku.app".to_string()).refresh_cookie_secure());
        assert!(!AuthConfig::new("http://localhost:5174".to_string()).refresh_cookie_secure());
    }

    #[test]
    fn google_config_defaults_and_overrides() {
        let config = GoogleConfig::new(
            "client-id".to_string(),
            SecretString::from("client-secret".to_string()),
            "https://kiroku.app/google/login".to_string(),
            "https://kiroku.app/google/register".to_string(),
        );

        assert_eq!(config.client_id(), "client-id");
        assert_eq!(config.token_endpoint(), GOOGLE_TOKEN_ENDPOINT);
        assert_eq!(config.jwks_endpoint(), GOOGLE_JWKS_ENDPOINT);
        assert_eq!(config.login_redirect_uri(), "https://kiroku.app/google/login");

        let config = config
            .with_token_endpoint("http://localhost:9000/token".to_string())
            .with_jwks_endpoint("http://localhost:9000/certs".to_string());

        assert_eq!(config.token_endpoint(), "http://localhost:9000/token");
        assert_eq!(config.jwks_endpoint(), "http://localhost:9000/certs");
    }
}
