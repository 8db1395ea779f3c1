//! Serialization boundary between `SessionState` and the durable store.
//!
//! The persisted subset is `{token, user, isAuthenticated}` plus a schema
//! version and a save timestamp. Loading state and the action generation are
//! never written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::session::{SessionState, User};

/// Slot holding the bare token
pub const TOKEN_SLOT: &str = "authToken";

/// Slot holding the persisted session blob
pub const SESSION_SLOT: &str = "auth-storage";

/// Current blob schema version.
/// Version 0 is the unversioned layout, optionally wrapped as `{"state": {...}}`.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Malformed session blob: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Session blob version {0} is newer than supported version {max}", max = SCHEMA_VERSION)]
    UnsupportedVersion(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl PersistedSession {
    /// Capture the persisted subset of `state`
    pub fn capture(state: &SessionState) -> Self {
        Self {
            version: SCHEMA_VERSION,
            token: state.token().map(str::to_string),
            user: state.user().cloned(),
            is_authenticated: state.is_authenticated(),
            saved_at: Some(Utc::now()),
        }
    }

    pub fn encode(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a stored blob, accepting the current and legacy layouts.
    pub fn decode(raw: &str) -> Result<Self, PersistError> {
        let mut value: Value = serde_json::from_str(raw)?;

        // Legacy envelope: {"state": {...}, "version": 0}
        if let Some(inner) = value.get_mut("state").map(Value::take) {
            if inner.is_object() {
                let mut legacy: PersistedSession = serde_json::from_value(inner)?;
                legacy.version = 0;
                return Ok(legacy);
            }
        }

        let blob: PersistedSession = serde_json::from_value(value)?;
        if blob.version > SCHEMA_VERSION {
            return Err(PersistError::UnsupportedVersion(blob.version));
        }
        Ok(blob)
    }

    /// Rebuild session state. `isAuthenticated` is recomputed, not trusted.
    pub fn restore(self) -> SessionState {
        SessionState::restored(self.token, self.user)
    }
}
