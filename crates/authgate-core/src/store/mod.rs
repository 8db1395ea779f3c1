//! Durable storage for the persisted session.
//!
//! This module provides:
//! - `DurableStore`: read/write/remove a named blob ("slot")
//! - `MemoryStore`: in-process slots, used by tests and ephemeral sessions
//! - `FileStore`: one file per slot, optionally sealed with a passphrase
//! - `KeyringStore`: one OS keychain entry per slot
//!
//! Stores hold opaque strings. Serialization of the session lives in
//! `auth::persist`.

pub mod file;
pub mod keychain;
pub mod memory;
pub mod seal;

pub use file::FileStore;
pub use keychain::KeyringStore;
pub use memory::MemoryStore;
pub use seal::Sealer;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Invalid slot name: {0:?}")]
    InvalidSlot(String),

    #[error("Sealed blob error: {0}")]
    Seal(String),

    #[error("Stored blob is not valid UTF-8")]
    Encoding,
}

/// A persistent key-value slot holder.
pub trait DurableStore: Send + Sync {
    /// Read a slot, `None` if it was never written or has been removed.
    fn read(&self, slot: &str) -> Result<Option<String>, StoreError>;

    fn write(&self, slot: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a slot. Removing an absent slot is not an error.
    fn remove(&self, slot: &str) -> Result<(), StoreError>;
}

/// Slot names end up in file names and keychain entries.
pub(crate) fn validate_slot(slot: &str) -> Result<(), StoreError> {
    let valid = !slot.is_empty()
        && slot
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidSlot(slot.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_slot() {
        assert!(validate_slot("auth-storage").is_ok());
        assert!(validate_slot("authToken").is_ok());
        assert!(validate_slot("a_b").is_ok());

        assert!(validate_slot("").is_err());
        assert!(validate_slot("../etc/passwd").is_err());
        assert!(validate_slot("with space").is_err());
    }
}
