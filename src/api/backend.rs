//! Auth transport: the `/api/auth` endpoints behind a pluggable trait
//!
//! `SessionManager` talks to the backend exclusively through
//! [`AuthBackend`], so tests can substitute an in-process fake the same
//! way storage backends are swapped elsewhere in the crate.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::api::types::{
    ApiErrorBody, EmailRequest, LoginRequest, LoginResponse, LogoutRequest, MessageResponse,
    RefreshRequest, RefreshResponse, RegisterRequest, ResetRequest, VerifyRequest,
};
use crate::auth::lockout::cooldown_secs_from_message;
use crate::config::ClientConfig;
use crate::constants::AUTH_BASE_PATH;
use crate::error::{ClientError, Result};

/// Operations of the authentication API
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, req: &LoginRequest) -> Result<LoginResponse>;

    /// Spends `refresh_token` and mints a new credential pair. Must run
    /// under a bounded timeout: waiters of an in-flight refresh are
    /// released only when this resolves.
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse>;

    /// Asks the server to revoke `refresh_token`. Response payload is
    /// ignored by callers.
    async fn logout(&self, refresh_token: &str) -> Result<()>;

    async fn register(&self, req: &RegisterRequest) -> Result<MessageResponse>;
    async fn verify(&self, req: &VerifyRequest) -> Result<MessageResponse>;
    async fn resend_verify(&self, email: &str) -> Result<MessageResponse>;
    async fn forgot(&self, email: &str) -> Result<MessageResponse>;
    async fn reset(&self, req: &ResetRequest) -> Result<MessageResponse>;
    async fn resend_reset(&self, email: &str) -> Result<MessageResponse>;
}

/// reqwest-backed implementation of [`AuthBackend`]
pub struct HttpAuthBackend {
    http: reqwest::Client,
    base_url: String,
    refresh_timeout: Duration,
    lockout_fallback_secs: u64,
}

impl HttpAuthBackend {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            refresh_timeout: config.refresh_timeout,
            lockout_fallback_secs: config.lockout_fallback_secs,
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}{}/{}", self.base_url, AUTH_BASE_PATH, name)
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        name: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<T> {
        let mut request = self.http.post(self.endpoint(name)).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        // Capture the header before the body consumes the response
        let retry_after_header = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let text = response.text().await.unwrap_or_default();
        let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();

        log::debug!("auth endpoint '{}' rejected with status {}", name, status);
        Err(self.map_rejection(status.as_u16(), retry_after_header, body))
    }

    /// Map a non-2xx auth response into the error taxonomy.
    ///
    /// For 429, the cooldown source order is: explicit `retry_after`
    /// body field, a duration embedded in the human message ("Aguarde
    /// 45s"), the `Retry-After` header, then the configured fallback.
    fn map_rejection(
        &self,
        status: u16,
        retry_after_header: Option<u64>,
        body: ApiErrorBody,
    ) -> ClientError {
        let message = body
            .message
            .or(body.error)
            .unwrap_or_else(|| format!("request failed with status {}", status));

        if status == 429 {
            let retry_after_secs = body
                .retry_after
                .or_else(|| cooldown_secs_from_message(&message))
                .or(retry_after_header)
                .unwrap_or(self.lockout_fallback_secs);
            return ClientError::TooManyAttempts { retry_after_secs };
        }

        ClientError::ApiError {
            status,
            message,
            field_errors: body.field_errors.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, req: &LoginRequest) -> Result<LoginResponse> {
        self.post("login", req, None).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse> {
        let req = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        self.post("refresh", &req, Some(self.refresh_timeout)).await
    }

    async fn logout(&self, refresh_token: &str) -> Result<()> {
        let req = LogoutRequest {
            refresh_token: refresh_token.to_string(),
        };
        // Response body is ignored; only the revocation matters
        let response = self
            .http
            .post(self.endpoint("logout"))
            .json(&req)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
            return Err(self.map_rejection(status, None, body));
        }
        Ok(())
    }

    async fn register(&self, req: &RegisterRequest) -> Result<MessageResponse> {
        self.post("register", req, None).await
    }

    async fn verify(&self, req: &VerifyRequest) -> Result<MessageResponse> {
        self.post("verify", req, None).await
    }

    async fn resend_verify(&self, email: &str) -> Result<MessageResponse> {
        let req = EmailRequest {
            email: email.to_string(),
        };
        self.post("resend-verify", &req, None).await
    }

    async fn forgot(&self, email: &str) -> Result<MessageResponse> {
        let req = EmailRequest {
            email: email.to_string(),
        };
        self.post("forgot", &req, None).await
    }

    async fn reset(&self, req: &ResetRequest) -> Result<MessageResponse> {
        self.post("reset", req, None).await
    }

    async fn resend_reset(&self, email: &str) -> Result<MessageResponse> {
        let req = EmailRequest {
            email: email.to_string(),
        };
        self.post("resend-reset", &req, None).await
    }
}
