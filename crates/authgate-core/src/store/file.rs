use std::path::PathBuf;

use tracing::debug;

use super::{validate_slot, DurableStore, Sealer, StoreError};

/// Slots stored as files in a directory: `<dir>/<slot>.json`, or
/// `<dir>/<slot>.sealed` when a passphrase is configured.
pub struct FileStore {
    dir: PathBuf,
    sealer: Option<Sealer>,
}

impl FileStore {
    /// Open a plain-text store rooted at `dir`
    pub fn open(dir: PathBuf) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, sealer: None })
    }

    /// Open a store whose slots are sealed under `passphrase`
    pub fn open_sealed(dir: PathBuf, passphrase: &str) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&dir)?;
        let sealer = Sealer::for_dir(passphrase, &dir)?;
        Ok(Self {
            dir,
            sealer: Some(sealer),
        })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn slot_path(&self, slot: &str) -> Result<PathBuf, StoreError> {
        validate_slot(slot)?;
        let ext = if self.sealer.is_some() { "sealed" } else { "json" };
        Ok(self.dir.join(format!("{}.{}", slot, ext)))
    }
}

impl DurableStore for FileStore {
    fn read(&self, slot: &str) -> Result<Option<String>, StoreError> {
        let path = self.slot_path(slot)?;
        if !path.exists() {
            return Ok(None);
        }

        let bytes = std::fs::read(&path)?;
        let bytes = match self.sealer {
            Some(ref sealer) => sealer.open(&bytes)?,
            None => bytes,
        };
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| StoreError::Encoding)
    }

    fn write(&self, slot: &str, value: &str) -> Result<(), StoreError> {
        let path = self.slot_path(slot)?;
        let bytes = match self.sealer {
            Some(ref sealer) => sealer.seal(value.as_bytes())?,
            None => value.as_bytes().to_vec(),
        };

        // Write then rename so a crash never leaves a half-written slot
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;
        debug!(slot, path = %path.display(), "Slot written");
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<(), StoreError> {
        let path = self.slot_path(slot)?;
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}
