//! Google OAuth code exchange and identity-token verification.
//!
//! The frontend drives the authorization redirect; this module picks up at
//! the callback. The authorization code is exchanged at the token endpoint,
//! and the returned identity token is verified against Google's published
//! RS256 keys before any claim is trusted. Register and login flows differ
//! only in their redirect URI and in how an existing account link is
//! treated.

use anyhow::{anyhow, Context, Result};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use super::error::AuthError;
use super::session::{login_or_create_session, TokenPair};
use super::state::AuthState;
use super::storage::{self, InsertAccountOutcome, NewAccount, Role};
use super::utils::generate_account_id;

/// Which redirect URI the flow started with. The token exchange must repeat
/// the exact URI or the provider rejects the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthFlow {
    Login,
    Register,
}

/// Both tokens must be present; a response missing either one is treated as
/// a failed exchange.
#[derive(Debug, Deserialize)]
struct ProviderTokens {
    access_token: String,
    id_token: String,
}

/// Claims taken from a verified Google identity token.
#[derive(Debug, Deserialize)]
pub(crate) struct IdTokenClaims {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

fn redirect_uri<'a>(state: &'a AuthState, flow: OAuthFlow) -> &'a str {
    match flow {
        OAuthFlow::Login => state.google().login_redirect_uri(),
        OAuthFlow::Register => state.google().register_redirect_uri(),
    }
}

async fn exchange_code(
    state: &AuthState,
    code: &str,
    flow: OAuthFlow,
) -> Result<ProviderTokens, AuthError> {
    let google = state.google();
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("client_id", google.client_id()),
        ("client_secret", google.client_secret().expose_secret()),
        ("redirect_uri", redirect_uri(state, flow)),
    ];

    let response = state
        .http()
        .post(google.token_endpoint())
        .form(&params)
        .send()
        .await
        .map_err(|err| {
            warn!("token endpoint unreachable: {err}");
            AuthError::TokenExchangeFailed
        })?;

    if !response.status().is_success() {
        warn!(status = %response.status(), "token endpoint rejected the code");
        return Err(AuthError::TokenExchangeFailed);
    }

    let tokens = response.json::<ProviderTokens>().await.map_err(|err| {
        warn!("token endpoint returned an unreadable body: {err}");
        AuthError::TokenExchangeFailed
    })?;
    if tokens.access_token.is_empty() || tokens.id_token.is_empty() {
        warn!("token endpoint answered without both tokens");
        return Err(AuthError::TokenExchangeFailed);
    }
    Ok(tokens)
}

/// Expectations for a Google identity token: RS256, our client id as the
/// audience, Google as the issuer, 5 seconds of clock leeway.
fn validation_for(client_id: &str) -> Validation {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[client_id]);
    validation.set_issuer(&["https://accounts.google.com", "accounts.google.com"]);
    validation.leeway = 5;
    validation
}

fn decode_id_token(
    id_token: &str,
    key: &DecodingKey,
    validation: &Validation,
) -> Result<IdTokenClaims, AuthError> {
    decode::<IdTokenClaims>(id_token, key, validation)
        .map(|data| data.claims)
        .map_err(|err| {
            debug!("identity token rejected: {err}");
            AuthError::InvalidIdentityToken
        })
}

// A key set that cannot be fetched or read means the token cannot be
// verified, which is an identity failure, not a server fault.
async fn fetch_signing_key(state: &AuthState, kid: &str) -> Result<DecodingKey, AuthError> {
    let jwks: JwkSet = state
        .http()
        .get(state.google().jwks_endpoint())
        .send()
        .await
        .map_err(|err| {
            warn!("provider key set unreachable: {err}");
            AuthError::InvalidIdentityToken
        })?
        .json()
        .await
        .map_err(|err| {
            warn!("provider key set unreadable: {err}");
            AuthError::InvalidIdentityToken
        })?;

    let jwk = jwks
        .keys
        .into_iter()
        .find(|key| key.kid == kid)
        .ok_or(AuthError::InvalidIdentityToken)?;

    DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
        .map_err(|err| AuthError::Internal(anyhow!("provider key is unusable: {err}")))
}

async fn verify_id_token(state: &AuthState, id_token: &str) -> Result<IdTokenClaims, AuthError> {
    let header = decode_header(id_token).map_err(|err| {
        debug!("identity token header unreadable: {err}");
        AuthError::InvalidIdentityToken
    })?;
    let kid = header.kid.ok_or(AuthError::InvalidIdentityToken)?;

    let key = fetch_signing_key(state, &kid).await?;
    decode_id_token(id_token, &key, &validation_for(state.google().client_id()))
}

/// Register callback: verify the identity and create a linked account.
pub async fn register(
    pool: &PgPool,
    state: &AuthState,
    code: &str,
    device_id: Option<&str>,
) -> Result<TokenPair, AuthError> {
    let tokens = exchange_code(state, code, OAuthFlow::Register).await?;
    let claims = verify_id_token(state, &tokens.id_token).await?;

    if storage::find_account_by_subject(pool, &claims.sub)
        .await?
        .is_some()
    {
        return Err(AuthError::AccountAlreadyLinked);
    }

    let account = NewAccount {
        account_id: generate_account_id(),
        name: claims.name,
        email: claims.email,
        icon: claims.picture.unwrap_or_default(),
        password_hash: None,
        role: Role::Normal,
        provider_subject: Some(claims.sub),
        email_verified: true,
        last_login: Some(chrono::Utc::now()),
    };

    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let account = match storage::insert_account(&mut tx, &account).await? {
        InsertAccountOutcome::Created(account) => account,
        InsertAccountOutcome::Conflict => return Err(AuthError::AccountAlreadyLinked),
    };
    tx.commit().await.context("failed to commit transaction")?;

    info!(account_id = %account.account_id, "federated account created");
    login_or_create_session(pool, state, &account, device_id).await
}

/// Login callback: verify the identity and open a session on the linked
/// account.
pub async fn login(
    pool: &PgPool,
    state: &AuthState,
    code: &str,
    device_id: Option<&str>,
) -> Result<TokenPair, AuthError> {
    let tokens = exchange_code(state, code, OAuthFlow::Login).await?;
    let claims = verify_id_token(state, &tokens.id_token).await?;

    let account = storage::find_account_by_subject(pool, &claims.sub)
        .await?
        .ok_or(AuthError::AccountNotLinked)?;

    login_or_create_session(pool, state, &account, device_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct ForgedClaims {
        sub: String,
        aud: String,
        iss: String,
        exp: i64,
        iat: i64,
    }

    fn forged_claims() -> ForgedClaims {
        let now = chrono::Utc::now().timestamp();
        ForgedClaims {
            sub: "1234567890".to_string(),
            aud: "client-id".to_string(),
            iss: "https://accounts.google.com".to_string(),
            exp: now + 600,
            iat: now,
        }
    }

    // A 2048-bit modulus in base64url, as the JWKS endpoint publishes it.
    // The matching private key is unknown, which is the point: nothing signed
    // outside Google verifies against it.
    const TEST_MODULUS: &str = "3TSg0pmZLcZHrfsoEdcTQFJ77cIeHWJTZuItUlWUGJXFmUcc8tSWIvh1AojSLzek\
        tSGldeQF34mQTHezBkMCs2HKLLAlLQ26pAh7w0QqUU94bUSHOimNAzaqGS8KkQNj\
        zPUjpe91radav8LCFFG6vf2ZVVkYjcv2tW58gqO1HcIEWuf6hnWbY3Nnu1PNSFVj\
        zHCVzIPLBrEXC849a06byHAGZLBwOFnHmnBPVgpCmyxRWhPmGAErqPmvSA6RmvQf\
        GAQQyafASGFdopiRCznxenSYjmJjbWK2sX8zE6CJXxDy2njfbDS6wFHWsyrkvzJv\
        ZfmrtU4us5yCLogYYN1RWGSQ5Q";

    #[test]
    fn validation_pins_audience_and_issuer() {
        let validation = validation_for("client-id");
        assert_eq!(validation.algorithms, vec![Algorithm::RS256]);
        assert_eq!(validation.leeway, 5);
    }

    #[test]
    fn hs256_token_never_verifies_as_identity_token() {
        // An attacker who knows the expected claims but not Google's private
        // key can at best sign with some other key or algorithm.
        let forged = encode(
            &Header::default(),
            &forged_claims(),
            &EncodingKey::from_secret(b"attacker-secret"),
        )
        .unwrap();

        let key = DecodingKey::from_rsa_components(TEST_MODULUS, "AQAB").unwrap();
        let result = decode_id_token(&forged, &key, &validation_for("client-id"));
        assert!(matches!(result, Err(AuthError::InvalidIdentityToken)));
    }

    #[test]
    fn garbage_identity_token_is_rejected() {
        let key = DecodingKey::from_rsa_components(TEST_MODULUS, "AQAB").unwrap();
        let result = decode_id_token("definitely.not.ajwt", &key, &validation_for("client-id"));
        assert!(matches!(result, Err(AuthError::InvalidIdentityToken)));
    }

    #[tokio::test]
    async fn unreachable_key_set_rejects_the_identity_token() {
        use crate::auth::tokens::CredentialCodec;
        use crate::auth::{AuthConfig, GoogleConfig};
        use crate::email::LogMailer;
        use secrecy::SecretString;
        use std::sync::Arc;

        let google = GoogleConfig::new(
            "client-id".to_string(),
            SecretString::from("client-secret".to_string()),
            "http://localhost:8080/auth/google/login/callback".to_string(),
            "http://localhost:8080/auth/google/register/callback".to_string(),
        )
        .with_jwks_endpoint("http://127.0.0.1:1/certs".to_string());
        let state = AuthState::new(
            AuthConfig::new("http://localhost:5174".to_string()),
            google,
            CredentialCodec::new(
                SecretString::from("access-secret".to_string()),
                SecretString::from("refresh-secret".to_string()),
            ),
            Arc::new(LogMailer),
        )
        .unwrap();

        let result = fetch_signing_key(&state, "some-kid").await;
        assert!(matches!(result, Err(AuthError::InvalidIdentityToken)));
    }
}
