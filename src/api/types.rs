//! Request and response types for the `/api/auth` endpoints
//!
//! Field names follow the backend's JSON contract; Rust-side names are
//! mapped through serde renames where the two differ.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Login request body
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access-token lifetime in seconds, relative to now
    pub expires_in: u64,
    pub username: String,
}

/// Refresh request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Successful refresh payload. The refresh token rotates: the returned
/// one replaces the one that was just spent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

/// Logout request body (server-side refresh-token revocation)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// Registration request body
#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    /// Display name ("nome" on the wire)
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// Email verification request body
#[derive(Debug, Serialize)]
pub struct VerifyRequest {
    pub email: String,
    pub code: String,
}

/// Password reset request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

/// Request body for the email-only flows (forgot, resend verify,
/// resend reset)
#[derive(Debug, Serialize)]
pub struct EmailRequest {
    pub email: String,
}

/// Generic `{message}` success payload
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error body returned on non-2xx responses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "fieldErrors")]
    pub field_errors: Option<HashMap<String, String>>,
    /// Cooldown in seconds on throttled (429) responses
    #[serde(default)]
    pub retry_after: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response_deserializes_wire_names() {
        let body = r#"{
            "accessToken": "at",
            "refreshToken": "rt",
            "expiresIn": 300,
            "username": "maria"
        }"#;
        let res: LoginResponse = serde_json::from_str(body).unwrap();
        assert_eq!(res.access_token, "at");
        assert_eq!(res.refresh_token, "rt");
        assert_eq!(res.expires_in, 300);
        assert_eq!(res.username, "maria");
    }

    #[test]
    fn test_register_request_uses_nome_on_wire() {
        let req = RegisterRequest {
            name: "Maria".to_string(),
            email: "maria@example.com".to_string(),
            phone: "11999990000".to_string(),
            password: "s3cr3t!pass".to_string(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["nome"], "Maria");
        assert!(json.get("name").is_none());
    }

    #[test]
    fn test_error_body_tolerates_partial_payloads() {
        let body: ApiErrorBody = serde_json::from_str(r#"{"message":"Aguarde 45s"}"#).unwrap();
        assert_eq!(body.message.as_deref(), Some("Aguarde 45s"));
        assert_eq!(body.retry_after, None);

        let body: ApiErrorBody =
            serde_json::from_str(r#"{"status":429,"retry_after":45}"#).unwrap();
        assert_eq!(body.retry_after, Some(45));
    }
}
