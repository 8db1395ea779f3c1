use keyring::Entry;
use tracing::debug;

use super::{validate_slot, DurableStore, StoreError};

/// Default keychain service name
pub const SERVICE_NAME: &str = "authgate";

/// Slots stored as entries in the OS keychain, one entry per slot.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, slot: &str) -> Result<Entry, StoreError> {
        validate_slot(slot)?;
        Ok(Entry::new(&self.service, slot)?)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(SERVICE_NAME)
    }
}

impl DurableStore for KeyringStore {
    fn read(&self, slot: &str) -> Result<Option<String>, StoreError> {
        match self.entry(slot)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, slot: &str, value: &str) -> Result<(), StoreError> {
        self.entry(slot)?.set_password(value)?;
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<(), StoreError> {
        match self.entry(slot)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => {
                debug!(slot, "Keychain entry already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
