//! authgate core library.
//!
//! Client-side authentication for a REST backend: the session and its
//! persistence, the request/response pipeline every API call runs through,
//! the login/register/logout flows, and role checks for guarded screens.

pub mod api;
pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod nav;
pub mod store;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiError, Credentials, ErrorKind, Registration};
pub use app::{open_store, App};
pub use auth::{AuthActions, AuthOutcome, Role, RoleGuard, SessionManager, User};
pub use cache::QueryCache;
pub use config::Config;
pub use nav::{MemoryNavigator, Navigator};
pub use store::DurableStore;
