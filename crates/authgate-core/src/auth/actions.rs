//! Login, registration, and logout as the user triggers them.

use std::sync::Arc;

use tracing::{debug, error, info};

use super::manager::SessionManager;
use super::session::{strip_scheme, ActionTicket, AuthPayload, User};
use crate::api::{ApiClient, ApiError, Credentials, ErrorKind, Registration};
use crate::cache::QueryCache;
use crate::nav::{Navigator, DASHBOARD_PATH, LOGIN_PATH};

/// How a successful auth call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The session now belongs to this user
    Authenticated(User),
    /// A newer action (another login, or a logout) started while this one
    /// was in flight; the result was discarded
    Superseded,
}

#[derive(Clone)]
pub struct AuthActions {
    api: ApiClient,
    session: Arc<SessionManager>,
    cache: Arc<QueryCache>,
    navigator: Arc<dyn Navigator>,
}

impl AuthActions {
    pub fn new(
        api: ApiClient,
        session: Arc<SessionManager>,
        cache: Arc<QueryCache>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            api,
            session,
            cache,
            navigator,
        }
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<AuthOutcome, ApiError> {
        info!(email = %credentials.email, "Attempting login");
        let ticket = self.session.begin_action();
        let result = self.api.login(credentials).await;
        self.settle("Login", ticket, result)
    }

    pub async fn register(&self, registration: &Registration) -> Result<AuthOutcome, ApiError> {
        info!(email = %registration.email, "Attempting registration");
        let ticket = self.session.begin_action();
        let result = self.api.register(registration).await;
        self.settle("Registration", ticket, result)
    }

    /// Cache first, so nothing fetched under the old session survives it
    pub fn logout(&self) {
        self.cache.clear();
        self.session.logout();
        self.navigator.navigate(LOGIN_PATH);
    }

    fn settle(
        &self,
        action: &str,
        ticket: ActionTicket,
        result: Result<AuthPayload, ApiError>,
    ) -> Result<AuthOutcome, ApiError> {
        let result = result.and_then(|payload| {
            if strip_scheme(&payload.token).is_empty() {
                Err(ApiError::new(
                    ErrorKind::Unknown,
                    200,
                    "Invalid response body: no token in auth response",
                ))
            } else {
                Ok(payload)
            }
        });
        match result {
            Ok(payload) => match self.session.commit_login(ticket, &payload) {
                Some(user) => {
                    self.navigator.navigate(DASHBOARD_PATH);
                    Ok(AuthOutcome::Authenticated(user))
                }
                None => {
                    debug!(action, "Completion superseded");
                    Ok(AuthOutcome::Superseded)
                }
            },
            Err(e) => {
                self.session.abandon(ticket);
                error!(action, error = %e, "Auth action failed");
                Err(e)
            }
        }
    }
}
