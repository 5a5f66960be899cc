use crate::{
    api,
    auth::{
        tokens::CredentialCodec, AuthConfig, AuthState, GoogleConfig, SweeperConfig,
    },
    email::LogMailer,
};
use anyhow::Result;
use secrecy::SecretString;
use std::sync::Arc;

/// Everything the server action needs, resolved from CLI arguments.
#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub frontend_base_url: String,
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    pub google_client_id: String,
    pub google_client_secret: SecretString,
    pub google_login_redirect_uri: String,
    pub google_register_redirect_uri: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the shared state cannot be built or the server fails
/// to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = AuthConfig::new(args.frontend_base_url);
    let google = GoogleConfig::new(
        args.google_client_id,
        args.google_client_secret,
        args.google_login_redirect_uri,
        args.google_register_redirect_uri,
    );
    let codec = CredentialCodec::new(args.access_secret, args.refresh_secret)
        .with_access_ttl_seconds(config.access_ttl_seconds())
        .with_refresh_ttl_days(config.refresh_ttl_days());

    let auth_state = Arc::new(AuthState::new(config, google, codec, Arc::new(LogMailer))?);

    api::new(args.port, args.dsn, auth_state, SweeperConfig::default()).await
}
