//! Abstract storage interface for persisted client-side state
//!
//! Everything that must survive a process restart goes through here:
//! the credential set, per-purpose lockout expiries, and the one-shot
//! redirect-after-login target.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Credential set as persisted between runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub access_token: String,
    /// Absolute expiry instant of the access token
    pub expires_at: DateTime<Utc>,
    /// Absent when the server granted no refresh token; the session
    /// then ends for good when the access token expires
    pub refresh_token: Option<String>,
    /// Display identity
    pub username: String,
}

/// Persisted client-side state interface
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the persisted session, if any
    async fn load_session(&self) -> Result<Option<SessionRecord>>;

    /// Persist the session, replacing any previous record
    async fn save_session(&self, record: &SessionRecord) -> Result<()>;

    /// Remove the persisted session
    async fn clear_session(&self) -> Result<()>;

    /// Lockout expiry for a purpose key ("login", "resend-reset", ...)
    async fn lockout_until(&self, purpose: &str) -> Result<Option<DateTime<Utc>>>;

    /// Set or clear the lockout expiry for a purpose key
    async fn set_lockout_until(
        &self,
        purpose: &str,
        until: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Consume the one-shot redirect-after-login target
    async fn take_redirect_target(&self) -> Result<Option<String>>;

    /// Store the redirect-after-login target, replacing any previous one
    async fn set_redirect_target(&self, target: &str) -> Result<()>;
}
