//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionState`: the token, user, and loading flag of one client
//! - `SessionManager`: commits state changes and persists them to a `DurableStore`
//! - `AuthActions`: login, registration, and logout flows
//! - `RoleGuard`: read-only role checks
//!
//! A session is authenticated only while it holds both a token and a user.

pub mod actions;
pub mod guard;
pub mod manager;
pub mod persist;
pub mod session;

pub use actions::{AuthActions, AuthOutcome};
pub use guard::RoleGuard;
pub use manager::SessionManager;
pub use persist::{PersistedSession, SESSION_SLOT, TOKEN_SLOT};
pub use session::{strip_scheme, ActionTicket, AuthPayload, Role, SessionState, User};
