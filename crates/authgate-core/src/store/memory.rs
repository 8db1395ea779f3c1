use std::collections::HashMap;

use parking_lot::Mutex;

use super::{validate_slot, DurableStore, StoreError};

/// Slots kept in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the slots currently holding a value, sorted
    pub fn slots(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

impl DurableStore for MemoryStore {
    fn read(&self, slot: &str) -> Result<Option<String>, StoreError> {
        validate_slot(slot)?;
        Ok(self.slots.lock().get(slot).cloned())
    }

    fn write(&self, slot: &str, value: &str) -> Result<(), StoreError> {
        validate_slot(slot)?;
        self.slots.lock().insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<(), StoreError> {
        validate_slot(slot)?;
        self.slots.lock().remove(slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_read_write_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.read("authToken").unwrap(), None);

        store.write("authToken", "abc").unwrap();
        assert_eq!(store.read("authToken").unwrap().as_deref(), Some("abc"));
        assert_eq!(store.slots(), vec!["authToken".to_string()]);

        store.remove("authToken").unwrap();
        assert_eq!(store.read("authToken").unwrap(), None);

        // Removing twice is fine
        store.remove("authToken").unwrap();
    }

    #[test]
    fn test_memory_store_rejects_bad_slot() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.write("a/b", "x"),
            Err(StoreError::InvalidSlot(_))
        ));
    }
}
