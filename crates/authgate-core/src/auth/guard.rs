use std::sync::Arc;

use super::manager::SessionManager;
use crate::api::ApiError;

/// Read-only role checks for route guards. Holds no state of its own.
#[derive(Clone)]
pub struct RoleGuard {
    session: Arc<SessionManager>,
}

impl RoleGuard {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.session.has_role(role)
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.session.has_role(role))
    }

    pub fn check_auth(&self) -> bool {
        self.session.check_auth()
    }

    /// Unauthorized when signed out, Forbidden when signed in with another role
    pub fn require(&self, role: &str) -> Result<(), ApiError> {
        if !self.check_auth() {
            return Err(ApiError::unauthorized("Not signed in"));
        }
        if !self.has_role(role) {
            return Err(ApiError::forbidden(format!("Requires role {}", role)));
        }
        Ok(())
    }
}
