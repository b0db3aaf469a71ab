//! Client-side login lockout
//!
//! Mirrors server-imposed cooldowns (HTTP 429) locally so the UI can
//! reject submissions without a round-trip and show a live countdown.
//! Advisory only: the server remains the authority on throttling.

use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::error::{ClientError, Result};
use crate::storage::SessionStore;

/// Purpose keys for independently tracked cooldowns
pub mod purpose {
    pub const LOGIN: &str = "login";
    pub const RESEND_VERIFY: &str = "resend-verify";
    pub const RESEND_RESET: &str = "resend-reset";
}

/// Parse a cooldown duration out of a human-readable throttle message,
/// e.g. "Aguarde 45s" -> 45. Takes the first digit run immediately
/// followed by 's'.
pub fn cooldown_secs_from_message(message: &str) -> Option<u64> {
    let bytes = message.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if bytes.get(i) == Some(&b's') {
                return message[start..i].parse().ok();
            }
        } else {
            i += 1;
        }
    }
    None
}

/// Persisted cooldown bookkeeping, keyed by purpose so the login gate
/// and the resend-code flows count down independently.
pub struct LoginLockout {
    store: Arc<dyn SessionStore>,
    fallback_secs: u64,
}

impl LoginLockout {
    pub fn new(store: Arc<dyn SessionStore>, fallback_secs: u64) -> Self {
        Self {
            store,
            fallback_secs,
        }
    }

    /// Reject locally while a cooldown is active; clears an expired
    /// entry on the way through. Call before any network submission.
    pub async fn guard(&self, purpose: &str) -> Result<()> {
        let remaining = self.seconds_remaining(purpose).await?;
        if remaining > 0 {
            return Err(ClientError::Locked {
                remaining_secs: remaining,
            });
        }
        Ok(())
    }

    /// Live countdown value for the UI. Returns 0 once expired and
    /// removes the spent entry from the store.
    pub async fn seconds_remaining(&self, purpose: &str) -> Result<u64> {
        let Some(until) = self.store.lockout_until(purpose).await? else {
            return Ok(0);
        };

        let remaining_ms = (until - Utc::now()).num_milliseconds();
        if remaining_ms <= 0 {
            self.store.set_lockout_until(purpose, None).await?;
            return Ok(0);
        }

        // Round up so the countdown never shows 0 while still locked
        Ok(((remaining_ms as u64) + 999) / 1000)
    }

    /// Start a cooldown of the configured fallback duration.
    pub async fn arm_default(&self, purpose: &str) -> Result<()> {
        self.arm(purpose, self.fallback_secs).await
    }

    /// Start a cooldown of `secs` seconds from now.
    pub async fn arm(&self, purpose: &str, secs: u64) -> Result<()> {
        let until = Utc::now() + Duration::seconds(secs as i64);
        log::info!("{} locked for {}s", purpose, secs);
        self.store.set_lockout_until(purpose, Some(until)).await
    }

    /// Arm the cooldown if `err` is a throttle rejection; other errors
    /// are left untouched. Returns whether a cooldown was started.
    pub async fn note_rejection(&self, purpose: &str, err: &ClientError) -> Result<bool> {
        if let ClientError::TooManyAttempts { retry_after_secs } = err {
            let secs = if *retry_after_secs > 0 {
                *retry_after_secs
            } else {
                self.fallback_secs
            };
            self.arm(purpose, secs).await?;
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySessionStore;

    fn lockout() -> LoginLockout {
        LoginLockout::new(Arc::new(MemorySessionStore::new()), 60)
    }

    #[test]
    fn test_cooldown_parse_from_message() {
        assert_eq!(cooldown_secs_from_message("Aguarde 45s"), Some(45));
        assert_eq!(
            cooldown_secs_from_message("Tente novamente em 120s."),
            Some(120)
        );
        assert_eq!(cooldown_secs_from_message("Aguarde um momento"), None);
        assert_eq!(cooldown_secs_from_message("code 123 sent"), None);
        assert_eq!(cooldown_secs_from_message(""), None);
    }

    #[tokio::test]
    async fn test_guard_rejects_while_locked() {
        let lockout = lockout();
        lockout.arm(purpose::LOGIN, 45).await.unwrap();

        match lockout.guard(purpose::LOGIN).await {
            Err(ClientError::Locked { remaining_secs }) => {
                assert!(remaining_secs > 0 && remaining_secs <= 45);
            }
            other => panic!("expected Locked, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_expired_lockout_clears_and_allows() {
        let store = Arc::new(MemorySessionStore::new());
        let lockout = LoginLockout::new(store.clone(), 60);

        // Entry already in the past
        store
            .set_lockout_until(purpose::LOGIN, Some(Utc::now() - Duration::seconds(5)))
            .await
            .unwrap();

        assert_eq!(lockout.seconds_remaining(purpose::LOGIN).await.unwrap(), 0);
        assert!(lockout.guard(purpose::LOGIN).await.is_ok());
        assert!(store
            .lockout_until(purpose::LOGIN)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_purposes_do_not_interfere() {
        let lockout = lockout();
        lockout.arm(purpose::RESEND_RESET, 60).await.unwrap();

        assert!(lockout.guard(purpose::LOGIN).await.is_ok());
        assert!(lockout.guard(purpose::RESEND_RESET).await.is_err());
    }

    #[tokio::test]
    async fn test_note_rejection_arms_only_on_throttle() {
        let throttled = lockout();
        let armed = throttled
            .note_rejection(
                purpose::LOGIN,
                &ClientError::TooManyAttempts {
                    retry_after_secs: 45,
                },
            )
            .await
            .unwrap();
        assert!(armed);
        assert!(throttled.seconds_remaining(purpose::LOGIN).await.unwrap() > 0);

        let rejected = lockout();
        let armed = rejected
            .note_rejection(
                purpose::LOGIN,
                &ClientError::InvalidCredentials("no".to_string()),
            )
            .await
            .unwrap();
        assert!(!armed);
        assert_eq!(rejected.seconds_remaining(purpose::LOGIN).await.unwrap(), 0);
    }
}
