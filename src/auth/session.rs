//! Session lifecycle management
//!
//! `SessionManager` is the single source of truth for "am I logged in,
//! as whom, with what roles". It owns the one live credential set,
//! persists it through a [`SessionStore`], publishes auth-state changes
//! over a watch channel, and coordinates token refreshes so that any
//! storm of concurrent authorization failures costs exactly one
//! network refresh.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};

use crate::api::types::{
    LoginRequest, MessageResponse, RegisterRequest, ResetRequest, VerifyRequest,
};
use crate::api::AuthBackend;
use crate::auth::claims;
use crate::auth::lockout::{purpose, LoginLockout};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::storage::{SessionRecord, SessionStore};

/// Live credential set. All fields swap together; no component ever
/// observes a new access token paired with an old refresh token.
#[derive(Debug, Clone)]
pub struct Session {
    access_token: String,
    expires_at: DateTime<Utc>,
    refresh_token: Option<String>,
    username: String,
}

impl Session {
    fn from_record(record: SessionRecord) -> Self {
        Self {
            access_token: record.access_token,
            expires_at: record.expires_at,
            refresh_token: record.refresh_token,
            username: record.username,
        }
    }

    fn to_record(&self) -> SessionRecord {
        SessionRecord {
            access_token: self.access_token.clone(),
            expires_at: self.expires_at,
            refresh_token: self.refresh_token.clone(),
            username: self.username.clone(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Conceptual authentication state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated,
    RefreshPending,
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub username: String,
    /// Route to navigate to: the stored redirect-after-login target if
    /// one was set, the default landing route otherwise
    pub redirect_to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshOutcome {
    Refreshed,
    Failed,
}

/// Either side of an in-flight refresh round
enum RefreshRole {
    Leader(watch::Sender<Option<RefreshOutcome>>),
    Follower(watch::Receiver<Option<RefreshOutcome>>),
}

/// Owner of the credential lifecycle
pub struct SessionManager {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn SessionStore>,
    session: RwLock<Option<Session>>,
    auth_tx: watch::Sender<bool>,
    /// Single-slot coordination for in-flight refreshes: occupied while
    /// a refresh round is running, holding the receiver followers wait on
    refresh_slot: Mutex<Option<watch::Receiver<Option<RefreshOutcome>>>>,
    lockout: LoginLockout,
    landing_route: String,
}

impl SessionManager {
    /// Build the manager, rehydrating any persisted session. The watch
    /// channel starts at the rehydrated authentication state.
    pub async fn new(
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn SessionStore>,
        config: &ClientConfig,
    ) -> Result<Self> {
        let session = store.load_session().await?.map(Session::from_record);
        let authenticated = session.as_ref().map(|s| !s.is_expired()).unwrap_or(false);
        let (auth_tx, _) = watch::channel(authenticated);

        Ok(Self {
            backend,
            store: store.clone(),
            session: RwLock::new(session),
            auth_tx,
            refresh_slot: Mutex::new(None),
            lockout: LoginLockout::new(store, config.lockout_fallback_secs),
            landing_route: config.landing_route.clone(),
        })
    }

    // ---- state accessors -------------------------------------------------

    /// Pure predicate: token present and not yet past its expiry. No
    /// network, no side effects.
    pub async fn is_authenticated(&self) -> bool {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| !s.is_expired())
            .unwrap_or(false)
    }

    /// Current access token, if any
    pub async fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    /// Display identity of the logged-in user, if any
    pub async fn username(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.username.clone())
    }

    /// Roles decoded on demand from the current access token. Never
    /// cached: a token swap is immediately reflected here.
    pub async fn current_roles(&self) -> HashSet<String> {
        match self.access_token().await {
            Some(token) => claims::roles_from_token(&token),
            None => HashSet::new(),
        }
    }

    pub async fn has_role(&self, role: &str) -> bool {
        self.current_roles().await.contains(role)
    }

    /// Subscribe to authentication-state changes. The receiver yields
    /// the current value immediately and every transition after it.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.auth_tx.subscribe()
    }

    pub async fn state(&self) -> AuthState {
        if self.refresh_slot.lock().await.is_some() {
            return AuthState::RefreshPending;
        }
        if self.is_authenticated().await {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        }
    }

    /// Lockout countdowns for the login/resend flows
    pub fn lockout(&self) -> &LoginLockout {
        &self.lockout
    }

    /// Store the route to return to after the next successful login
    pub async fn remember_redirect(&self, target: &str) -> Result<()> {
        self.store.set_redirect_target(target).await
    }

    // ---- lifecycle operations --------------------------------------------

    /// Authenticate and install a fresh session.
    ///
    /// Rejected locally without a network call while the login lockout
    /// is counting down. A server 429 arms that lockout; a credential
    /// rejection or network failure leaves any existing session alone.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        self.lockout.guard(purpose::LOGIN).await?;

        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let response = match self.backend.login(&request).await {
            Ok(response) => response,
            Err(err) => {
                if let Err(e) = self.lockout.note_rejection(purpose::LOGIN, &err).await {
                    log::warn!("failed to persist login lockout: {}", e);
                }
                return Err(match err {
                    ClientError::ApiError {
                        status: 401 | 403,
                        message,
                        ..
                    } => ClientError::InvalidCredentials(message),
                    other => other,
                });
            }
        };

        let session = Session {
            access_token: response.access_token,
            expires_at: Utc::now() + Duration::seconds(response.expires_in as i64),
            refresh_token: Some(response.refresh_token),
            username: response.username.clone(),
        };
        self.install(session).await;
        log::info!("login succeeded for {}", response.username);

        let redirect_to = self
            .store
            .take_redirect_target()
            .await?
            .unwrap_or_else(|| self.landing_route.clone());

        Ok(LoginOutcome {
            username: response.username,
            redirect_to,
        })
    }

    /// Mint a new credential pair from the current refresh token.
    ///
    /// The refresh token rotates on success. Any failure is terminal
    /// for the session: credentials are cleared and `false` published
    /// before the error propagates.
    pub async fn refresh(&self) -> Result<()> {
        let refresh_token = {
            let guard = self.session.read().await;
            guard.as_ref().and_then(|s| s.refresh_token.clone())
        };

        let Some(refresh_token) = refresh_token else {
            // Nothing to mint from; drop any expired remnant
            self.clear().await;
            return Err(ClientError::NoRefreshToken);
        };

        match self.backend.refresh(&refresh_token).await {
            Ok(response) => {
                let mut guard = self.session.write().await;
                let username = guard
                    .as_ref()
                    .map(|s| s.username.clone())
                    .unwrap_or_default();
                let session = Session {
                    access_token: response.access_token,
                    expires_at: Utc::now() + Duration::seconds(response.expires_in as i64),
                    refresh_token: Some(response.refresh_token),
                    username,
                };
                if let Err(e) = self.store.save_session(&session.to_record()).await {
                    log::warn!("refreshed session not persisted: {}", e);
                }
                *guard = Some(session);
                drop(guard);

                self.publish(true);
                log::debug!("access token refreshed");
                Ok(())
            }
            Err(err) => {
                log::warn!("refresh rejected, clearing session: {}", err);
                self.clear().await;
                Err(ClientError::RefreshFailed(err.to_string()))
            }
        }
    }

    /// Tear down the session. The server-side revoke is fired off on
    /// the runtime and never blocks the local teardown; its failure is
    /// logged and otherwise ignored.
    pub async fn logout(&self) {
        let refresh_token = {
            let guard = self.session.read().await;
            guard.as_ref().and_then(|s| s.refresh_token.clone())
        };

        if let Some(refresh_token) = refresh_token {
            let backend = Arc::clone(&self.backend);
            tokio::spawn(async move {
                if let Err(e) = backend.logout(&refresh_token).await {
                    log::warn!("server-side token revoke failed: {}", e);
                }
            });
        }

        self.clear().await;
        log::info!("logged out");
    }

    /// Recovery entry point for the request authorization layer after a
    /// 401. `observed_token` is the access token the failed request
    /// carried (None if it went out unauthenticated).
    ///
    /// The first caller of a storm becomes the leader and performs the
    /// one network refresh; everyone arriving before that round settles
    /// waits on its outcome. A caller whose observed token already
    /// differs from the current unexpired one missed a finished round
    /// and proceeds straight to its retry.
    pub async fn refresh_after_unauthorized(&self, observed_token: Option<&str>) -> Result<()> {
        {
            let guard = self.session.read().await;
            if let Some(session) = guard.as_ref() {
                if !session.is_expired()
                    && Some(session.access_token.as_str()) != observed_token
                {
                    return Ok(());
                }
            }
        }

        let role = {
            let mut slot = self.refresh_slot.lock().await;
            match slot.as_ref() {
                Some(rx) => RefreshRole::Follower(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    *slot = Some(rx);
                    RefreshRole::Leader(tx)
                }
            }
        };

        match role {
            RefreshRole::Leader(tx) => {
                let result = self.refresh().await;
                let outcome = if result.is_ok() {
                    RefreshOutcome::Refreshed
                } else {
                    RefreshOutcome::Failed
                };

                // Free the slot before publishing so a 401 arriving
                // after this round starts a new one instead of joining
                // a settled round
                *self.refresh_slot.lock().await = None;
                let _ = tx.send(Some(outcome));

                result.map_err(|_| ClientError::SessionExpired)
            }
            RefreshRole::Follower(mut rx) => {
                match rx.wait_for(|outcome| outcome.is_some()).await {
                    Ok(outcome) if *outcome == Some(RefreshOutcome::Refreshed) => Ok(()),
                    // Failed round, or the leader vanished without settling
                    _ => Err(ClientError::SessionExpired),
                }
            }
        }
    }

    // ---- account flows ---------------------------------------------------

    pub async fn register(&self, request: &RegisterRequest) -> Result<MessageResponse> {
        self.backend.register(request).await
    }

    pub async fn verify(&self, email: &str, code: &str) -> Result<MessageResponse> {
        let request = VerifyRequest {
            email: email.to_string(),
            code: code.to_string(),
        };
        self.backend.verify(&request).await
    }

    /// Resend the account-verification code. Carries the same local
    /// cooldown mechanics as login: armed from a 429, and armed with
    /// the default duration after a successful send.
    pub async fn resend_verify(&self, email: &str) -> Result<MessageResponse> {
        self.resend(purpose::RESEND_VERIFY, || self.backend.resend_verify(email))
            .await
    }

    pub async fn forgot(&self, email: &str) -> Result<MessageResponse> {
        self.backend.forgot(email).await
    }

    pub async fn reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<MessageResponse> {
        let request = ResetRequest {
            email: email.to_string(),
            code: code.to_string(),
            new_password: new_password.to_string(),
        };
        self.backend.reset(&request).await
    }

    /// Resend the password-reset code, with the same cooldown handling
    /// as [`resend_verify`](Self::resend_verify).
    pub async fn resend_reset(&self, email: &str) -> Result<MessageResponse> {
        self.resend(purpose::RESEND_RESET, || self.backend.resend_reset(email))
            .await
    }

    // ---- internals -------------------------------------------------------

    async fn resend<F, Fut>(&self, purpose_key: &str, call: F) -> Result<MessageResponse>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<MessageResponse>>,
    {
        self.lockout.guard(purpose_key).await?;

        match call().await {
            Ok(response) => {
                if let Err(e) = self.lockout.arm_default(purpose_key).await {
                    log::warn!("failed to persist resend cooldown: {}", e);
                }
                Ok(response)
            }
            Err(err) => {
                if let Err(e) = self.lockout.note_rejection(purpose_key, &err).await {
                    log::warn!("failed to persist resend cooldown: {}", e);
                }
                Err(err)
            }
        }
    }

    /// Atomic credential swap: persisted copy and in-memory state move
    /// together under the write lock so no reader observes a half
    /// updated session. A failed disk write only degrades reload
    /// continuity and is not allowed to fail the swap.
    async fn install(&self, session: Session) {
        let record = session.to_record();
        let mut guard = self.session.write().await;
        if let Err(e) = self.store.save_session(&record).await {
            log::warn!("session not persisted: {}", e);
        }
        *guard = Some(session);
        drop(guard);

        self.publish(true);
    }

    async fn clear(&self) {
        let mut guard = self.session.write().await;
        if let Err(e) = self.store.clear_session().await {
            log::warn!("persisted session not cleared: {}", e);
        }
        *guard = None;
        drop(guard);

        self.publish(false);
    }

    fn publish(&self, authenticated: bool) {
        self.auth_tx.send_if_modified(|current| {
            if *current != authenticated {
                *current = authenticated;
                true
            } else {
                false
            }
        });
    }
}
