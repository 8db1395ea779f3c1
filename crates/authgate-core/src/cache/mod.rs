//! Query cache for server-derived data.
//!
//! This module provides the `QueryCache` used by the application layer to
//! hold responses from the backend. Entries are considered stale after
//! 5 minutes. Logout clears the cache before the session, so no
//! authenticated-only data outlives the session.

pub mod manager;

pub use manager::{CachedData, QueryCache, QueryKey};
