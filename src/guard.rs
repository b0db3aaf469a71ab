//! Route guard decisions
//!
//! Guards answer "may this navigation proceed" from the session state
//! alone; actually moving between routes belongs to the UI shell. A
//! denied navigation stores the intended URL so the next successful
//! login returns there.

use std::sync::Arc;

use crate::auth::SessionManager;
use crate::constants::LOGIN_ROUTE;
use crate::error::Result;

/// Outcome of a guard check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Navigate to the given route instead
    Redirect(String),
}

/// Session-backed route guard
pub struct RouteGuard {
    session: Arc<SessionManager>,
    landing_route: String,
}

impl RouteGuard {
    pub fn new(session: Arc<SessionManager>, landing_route: impl Into<String>) -> Self {
        Self {
            session,
            landing_route: landing_route.into(),
        }
    }

    /// Gate a route on being logged in. On denial the intended URL is
    /// remembered for the post-login redirect.
    pub async fn require_authenticated(&self, intended: &str) -> Result<GuardDecision> {
        if self.session.is_authenticated().await {
            return Ok(GuardDecision::Allow);
        }

        self.session.remember_redirect(intended).await?;
        Ok(GuardDecision::Redirect(LOGIN_ROUTE.to_string()))
    }

    /// Gate a route on being logged in with a given role, decoded from
    /// the live access token. An authenticated user lacking the role is
    /// sent to the landing route, not to login.
    pub async fn require_role(&self, role: &str, intended: &str) -> Result<GuardDecision> {
        if !self.session.is_authenticated().await {
            self.session.remember_redirect(intended).await?;
            return Ok(GuardDecision::Redirect(LOGIN_ROUTE.to_string()));
        }

        if self.session.has_role(role).await {
            Ok(GuardDecision::Allow)
        } else {
            Ok(GuardDecision::Redirect(self.landing_route.clone()))
        }
    }
}
