//! Client configuration module
//! Handles runtime configuration for the API client and session layer

use crate::constants::{
    DEFAULT_LANDING_ROUTE, DEFAULT_LOCKOUT_FALLBACK_SECS, DEFAULT_REFRESH_TIMEOUT_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::error::{ClientError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration parameters
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend, e.g. `https://crm.example.com`
    pub base_url: String,
    /// Timeout applied to ordinary API requests
    pub request_timeout: Duration,
    /// Timeout applied to the token refresh call. Kept short so a hung
    /// refresh resolves as a failure instead of suspending every waiter.
    pub refresh_timeout: Duration,
    /// Route to land on after a login with no stored redirect target
    pub landing_route: String,
    /// Cooldown applied when a 429 response carries no usable duration
    pub lockout_fallback_secs: u64,
    /// Where the file-backed session store persists state; None keeps
    /// the session in memory only
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        panic!("ClientConfig::default() is not allowed. Use ClientConfig::from_env() instead.");
    }
}

impl ClientConfig {
    /// Create a test configuration - only for testing!
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            base_url: "http://127.0.0.1:3030".to_string(),
            request_timeout: Duration::from_secs(5),
            refresh_timeout: Duration::from_secs(2),
            landing_route: DEFAULT_LANDING_ROUTE.to_string(),
            lockout_fallback_secs: DEFAULT_LOCKOUT_FALLBACK_SECS,
            session_file: None,
        }
    }

    /// Validate that a base URL is usable for building endpoint URLs
    fn validate_base_url(base_url: &str) -> Result<()> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| ClientError::ConfigError(format!("Invalid base URL '{}': {}", base_url, e)))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ClientError::ConfigError(format!(
                "Base URL must be http or https, got '{}'",
                parsed.scheme()
            )));
        }

        if parsed.host_str().is_none() {
            return Err(ClientError::ConfigError(
                "Base URL must include a host".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let base_url = env::var("CRM_API_BASE_URL").map_err(|_| {
            ClientError::ConfigError(
                "CRM_API_BASE_URL environment variable is required, \
                 e.g. https://crm.example.com"
                    .to_string(),
            )
        })?;
        Self::validate_base_url(&base_url)?;

        let request_timeout_secs = env::var("CRM_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let refresh_timeout_secs = env::var("CRM_REFRESH_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(DEFAULT_REFRESH_TIMEOUT_SECS);

        let landing_route = env::var("CRM_LANDING_ROUTE")
            .unwrap_or_else(|_| DEFAULT_LANDING_ROUTE.to_string());

        let lockout_fallback_secs = env::var("CRM_LOCKOUT_FALLBACK_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(DEFAULT_LOCKOUT_FALLBACK_SECS);

        let session_file = env::var("CRM_SESSION_FILE").ok().map(PathBuf::from);

        Ok(Self {
            base_url,
            request_timeout: Duration::from_secs(request_timeout_secs),
            refresh_timeout: Duration::from_secs(refresh_timeout_secs),
            landing_route,
            lockout_fallback_secs,
            session_file,
        })
    }
}
