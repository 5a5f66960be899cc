//! Request and response payloads for the auth endpoints. The wire format is
//! camelCase.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRegistrationRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRegistrationRequest {
    pub email: String,
    pub code: String,
    pub password: String,
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPasswordRequest {
    pub email: String,
    pub new_password: String,
}

/// The access token travels in the body; the refresh token only ever rides
/// the `HttpOnly` cookie.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Query parameters Google appends to the callback redirect.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_registration_reads_camel_case() {
        let request: CompleteRegistrationRequest = serde_json::from_str(
            r#"{"email":"a@example.com","code":"123456","password":"pw","deviceId":"dev-1"}"#,
        )
        .unwrap();
        assert_eq!(request.email, "a@example.com");
        assert_eq!(request.device_id.as_deref(), Some("dev-1"));
    }

    #[test]
    fn device_id_is_optional() {
        let request: LoginRequest =
            serde_json::from_str(r#"{"email":"a@example.com","password":"pw"}"#).unwrap();
        assert!(request.device_id.is_none());
    }

    #[test]
    fn set_password_reads_camel_case() {
        let request: SetPasswordRequest =
            serde_json::from_str(r#"{"email":"a@example.com","newPassword":"pw12345678"}"#)
                .unwrap();
        assert_eq!(request.new_password, "pw12345678");
    }

    #[test]
    fn token_response_writes_camel_case() {
        let json = serde_json::to_string(&TokenResponse {
            access_token: "abc".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"accessToken":"abc"}"#);
    }

    #[test]
    fn callback_params_tolerate_missing_fields() {
        let params: CallbackParams = serde_json::from_str(r#"{"error":"access_denied"}"#).unwrap();
        assert!(params.code.is_none());
        assert_eq!(params.error.as_deref(), Some("access_denied"));
    }
}
