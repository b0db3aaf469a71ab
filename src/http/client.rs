//! Authorized request path
//!
//! `AuthorizedClient` is the one road for ordinary API calls: it
//! attaches the bearer credential, and on a 401 runs the coalesced
//! refresh protocol and retries the original call exactly once. Calls
//! to the authentication endpoints themselves bypass all of this (a
//! refresh answering 401 must never trigger another refresh).

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::SessionManager;
use crate::config::ClientConfig;
use crate::constants::AUTH_BASE_PATH;
use crate::error::{ClientError, Result};

/// HTTP client for authenticated API calls
pub struct AuthorizedClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionManager>,
}

impl AuthorizedClient {
    pub fn new(config: &ClientConfig, session: Arc<SessionManager>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        self.execute(Method::GET, path, None).await
    }

    pub async fn delete(&self, path: &str) -> Result<reqwest::Response> {
        self.execute(Method::DELETE, path, None).await
    }

    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let body = serde_json::to_value(body)
            .map_err(|e| ClientError::NetworkError(format!("serialize request body: {}", e)))?;
        self.execute(Method::POST, path, Some(body)).await
    }

    pub async fn put<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let body = serde_json::to_value(body)
            .map_err(|e| ClientError::NetworkError(format!("serialize request body: {}", e)))?;
        self.execute(Method::PUT, path, Some(body)).await
    }

    /// GET a JSON payload into a typed value
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.get(path).await?;
        Ok(response.json::<T>().await?)
    }

    /// One dispatch of the request, with the bearer header when a token
    /// is available
    async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        body: Option<&serde_json::Value>,
        token: Option<&str>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response> {
        // Authentication endpoints are never intercepted: no bearer
        // attach, no 401 recovery
        if path.starts_with(AUTH_BASE_PATH) {
            return self.dispatch(&method, path, body.as_ref(), None).await;
        }

        let token = self.session.access_token().await;
        let response = self
            .dispatch(&method, path, body.as_ref(), token.as_deref())
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        log::debug!("{} {} answered 401, entering refresh protocol", method, path);
        self.session
            .refresh_after_unauthorized(token.as_deref())
            .await?;

        // Exactly one retry with the post-refresh credential
        let token = self.session.access_token().await;
        let retried = self
            .dispatch(&method, path, body.as_ref(), token.as_deref())
            .await?;

        if retried.status() == StatusCode::UNAUTHORIZED {
            // Freshly minted credentials rejected: nothing left to try
            log::warn!("{} {} still unauthorized after refresh", method, path);
            return Err(ClientError::SessionExpired);
        }

        Ok(retried)
    }
}
