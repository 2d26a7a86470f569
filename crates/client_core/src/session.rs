use std::sync::Arc;

use async_trait::async_trait;
use shared::domain::AppUser;
use tokio::sync::Mutex;
use tracing::{info, warn};
use url::Url;

use crate::error::{ApiFailure, ControllerError};

pub const DEFAULT_LOGIN_PROVIDER: &str = "github";

/// Asks the back office who the current principal is.
#[async_trait]
pub trait SessionProbe: Send + Sync {
    /// `Ok(None)` when the session is anonymous or rejected with 401/403.
    async fn current_user(&self) -> Result<Option<AppUser>, ApiFailure>;
}

pub struct MissingSessionProbe;

#[async_trait]
impl SessionProbe for MissingSessionProbe {
    async fn current_user(&self) -> Result<Option<AppUser>, ApiFailure> {
        Ok(None)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Unknown,
    Authenticated(AppUser),
    Anonymous,
}

/// Proof that the back office accepted the session. Only [`SessionGate`]
/// hands these out.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedContext {
    user: AppUser,
}

impl AuthenticatedContext {
    pub fn user(&self) -> &AppUser {
        &self.user
    }

    #[cfg(test)]
    pub(crate) fn for_tests(user: AppUser) -> Self {
        Self { user }
    }
}

pub struct SessionGate {
    probe: Arc<dyn SessionProbe>,
    state: Mutex<SessionState>,
}

impl SessionGate {
    pub fn new(probe: Arc<dyn SessionProbe>) -> Self {
        Self {
            probe,
            state: Mutex::new(SessionState::Unknown),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Probes the session and returns a context when a user is signed in.
    ///
    /// A failed probe leaves the previous state in place.
    pub async fn confirm(&self) -> Result<AuthenticatedContext, ControllerError> {
        let outcome = self.probe.current_user().await;
        let mut state = self.state.lock().await;
        match outcome {
            Ok(Some(user)) => {
                info!(username = %user.username, "session confirmed");
                *state = SessionState::Authenticated(user.clone());
                Ok(AuthenticatedContext { user })
            }
            Ok(None) => {
                *state = SessionState::Anonymous;
                Err(ControllerError::Unauthenticated)
            }
            Err(err) => {
                warn!(error = %err, "session probe failed");
                Err(ControllerError::Unauthenticated)
            }
        }
    }

    pub async fn forget(&self) {
        *self.state.lock().await = SessionState::Anonymous;
    }
}

fn origin_path(api_base_url: &str, path: &str) -> Result<Url, ApiFailure> {
    let base = Url::parse(api_base_url.trim())
        .map_err(|err| ApiFailure::InvalidUrl(format!("{api_base_url}: {err}")))?;
    base.join(path)
        .map_err(|err| ApiFailure::InvalidUrl(format!("{path}: {err}")))
}

/// Where a browser goes to start the OAuth login with `provider`.
pub fn login_url(api_base_url: &str, provider: &str) -> Result<Url, ApiFailure> {
    origin_path(api_base_url, &format!("/oauth2/authorization/{provider}"))
}

pub fn logout_url(api_base_url: &str) -> Result<Url, ApiFailure> {
    origin_path(api_base_url, "/logout")
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
