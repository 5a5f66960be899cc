//! Auth-related CLI arguments: signing secrets, the frontend base URL, and
//! the Google OAuth client.

use anyhow::{Context, Result};
use clap::{Arg, Command};
use secrecy::SecretString;

pub const ARG_FRONTEND_URL: &str = "frontend-url";
pub const ARG_ACCESS_SECRET: &str = "access-token-secret";
pub const ARG_REFRESH_SECRET: &str = "refresh-token-secret";
pub const ARG_GOOGLE_CLIENT_ID: &str = "google-client-id";
pub const ARG_GOOGLE_CLIENT_SECRET: &str = "google-client-secret";
pub const ARG_GOOGLE_LOGIN_REDIRECT: &str = "google-login-redirect-uri";
pub const ARG_GOOGLE_REGISTER_REDIRECT: &str = "google-register-redirect-uri";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_URL)
                .long(ARG_FRONTEND_URL)
                .help("Base URL of the frontend, used for CORS and redirects")
                .default_value("http://localhost:5174")
                .env("KIROKU_FRONTEND_URL"),
        )
        .arg(
            Arg::new(ARG_ACCESS_SECRET)
                .long(ARG_ACCESS_SECRET)
                .help("HMAC secret for signing access tokens")
                .env("KIROKU_ACCESS_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_REFRESH_SECRET)
                .long(ARG_REFRESH_SECRET)
                .help("HMAC secret for signing refresh tokens")
                .env("KIROKU_REFRESH_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_ID)
                .long(ARG_GOOGLE_CLIENT_ID)
                .help("Google OAuth client id")
                .env("KIROKU_GOOGLE_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_SECRET)
                .long(ARG_GOOGLE_CLIENT_SECRET)
                .help("Google OAuth client secret")
                .env("KIROKU_GOOGLE_CLIENT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_GOOGLE_LOGIN_REDIRECT)
                .long(ARG_GOOGLE_LOGIN_REDIRECT)
                .help("Redirect URI registered for the Google login flow")
                .env("KIROKU_GOOGLE_LOGIN_REDIRECT_URI")
                .required(true),
        )
        .arg(
            Arg::new(ARG_GOOGLE_REGISTER_REDIRECT)
                .long(ARG_GOOGLE_REGISTER_REDIRECT)
                .help("Redirect URI registered for the Google register flow")
                .env("KIROKU_GOOGLE_REGISTER_REDIRECT_URI")
                .required(true),
        )
}

#[derive(Debug)]
pub struct Options {
    pub frontend_base_url: String,
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    pub google_client_id: String,
    pub google_client_secret: SecretString,
    pub google_login_redirect_uri: String,
    pub google_register_redirect_uri: String,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let get = |name: &str| -> Result<String> {
            matches
                .get_one::<String>(name)
                .cloned()
                .with_context(|| format!("missing required argument: --{name}"))
        };
        Ok(Self {
            frontend_base_url: get(ARG_FRONTEND_URL)?,
            access_secret: SecretString::from(get(ARG_ACCESS_SECRET)?),
            refresh_secret: SecretString::from(get(ARG_REFRESH_SECRET)?),
            google_client_id: get(ARG_GOOGLE_CLIENT_ID)?,
            google_client_secret: SecretString::from(get(ARG_GOOGLE_CLIENT_SECRET)?),
            google_login_redirect_uri: get(ARG_GOOGLE_LOGIN_REDIRECT)?,
            google_register_redirect_uri: get(ARG_GOOGLE_REGISTER_REDIRECT)?,
        })
    }
}
