//! In-memory storage implementation for development and testing
//!
//! Keeps all persisted client-side state in process memory. Suitable
//! for tests and for ephemeral sessions that should not outlive the
//! process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::traits::{SessionRecord, SessionStore};
use crate::error::Result;

#[derive(Default)]
struct MemoryState {
    session: Option<SessionRecord>,
    lockouts: HashMap<String, DateTime<Utc>>,
    redirect_target: Option<String>,
}

/// In-memory session store
#[derive(Default)]
pub struct MemorySessionStore {
    state: RwLock<MemoryState>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load_session(&self) -> Result<Option<SessionRecord>> {
        Ok(self.state.read().await.session.clone())
    }

    async fn save_session(&self, record: &SessionRecord) -> Result<()> {
        self.state.write().await.session = Some(record.clone());
        Ok(())
    }

    async fn clear_session(&self) -> Result<()> {
        self.state.write().await.session = None;
        Ok(())
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
        Ok(())
    }

    async fn take_redirect_target(&self) -> Result<Option<String>> {
        Ok(self.state.write().await.redirect_target.take())
    }

    async fn set_redirect_target(&self, target: &str) -> Result<()> {
        self.state.write().await.redirect_target = Some(target.to_string());
        Ok(())
    }
}
