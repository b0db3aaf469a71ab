//! File-backed storage implementation
//!
//! Persists client-side state as a JSON document so sessions and
//! lockouts survive a process restart. All reads are served from an
//! in-memory copy; every mutation writes through to disk.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

use super::traits::{SessionRecord, SessionStore};
use crate::error::{ClientError, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    session: Option<SessionRecord>,
    #[serde(default)]
    lockouts: HashMap<String, DateTime<Utc>>,
    redirect_target: Option<String>,
}

/// JSON-file session store
pub struct FileSessionStore {
    path: PathBuf,
    state: RwLock<PersistedState>,
}

impl FileSessionStore {
    /// Open the store, loading existing state from `path` if present.
    /// An unreadable or corrupt file starts the store empty rather than
    /// failing: stale local state must never block a fresh login.
    pub async fn open(path: PathBuf) -> Result<Self> {
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                log::warn!(
                    "Discarding unreadable session state at {}: {}",
                    path.display(),
                    e
                );
                PersistedState::default()
            }),
            Err(_) => PersistedState::default(),
        };

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    /// Serialize the given state snapshot to disk.
    async fn flush(&self, state: &PersistedState) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| ClientError::StorageError(format!("serialize session state: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ClientError::StorageError(format!("create {}: {}", parent.display(), e))
            })?;
        }

        tokio::fs::write(&self.path, bytes).await.map_err(|e| {
            ClientError::StorageError(format!("write {}: {}", self.path.display(), e))
        })
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load_session(&self) -> Result<Option<SessionRecord>> {
        Ok(self.state.read().await.session.clone())
    }

    async fn save_session(&self, record: &SessionRecord) -> Result<()> {
        let mut state = self.state.write().await;
        state.session = Some(record.clone());
        self.flush(&state).await
    }

    async fn clear_session(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.session = None;
        self.flush(&state).await
    }

    async fn lockout_until(&self, purpose: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.state.read().await.lockouts.get(purpose).copied())
    }

    async fn set_lockout_until(
        &self,
        purpose: &str,
        until: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        match until {
            Some(instant) => {
                state.lockouts.insert(purpose.to_string(), instant);
            }
            None => {
                state.lockouts.remove(purpose);
            }
        }
        self.flush(&state).await
    }

    async fn take_redirect_target(&self) -> Result<Option<String>> {
        let mut state = self.state.write().await;
        let target = state.redirect_target.take();
        if target.is_some() {
            self.flush(&state).await?;
        }
        Ok(target)
    }

    async fn set_redirect_target(&self, target: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.redirect_target = Some(target.to_string());
        self.flush(&state).await
    }
}
