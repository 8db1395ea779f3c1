//! Passphrase sealing for blobs written to disk.
//!
//! Layout of a sealed blob: `MAGIC || nonce (12 bytes) || ciphertext+tag`.
//! The key is derived once per store with Argon2id from the passphrase and a
//! per-directory random salt.

use std::path::Path;

use argon2::Argon2;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;

use super::StoreError;

const MAGIC: &[u8; 4] = b"AGS1";
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
pub const SALT_LEN: usize = 16;

/// Salt file name inside the store directory
const SALT_FILE: &str = ".salt";

pub struct Sealer {
    cipher: ChaCha20Poly1305,
}

impl Sealer {
    /// Derive the sealing key from a passphrase and salt.
    pub fn derive(passphrase: &str, salt: &[u8]) -> Result<Self, StoreError> {
        let mut key = [0u8; KEY_LEN];
        Argon2::default()
            .hash_password_into(passphrase.as_bytes(), salt, &mut key)
            .map_err(|e| StoreError::Seal(format!("key derivation failed: {}", e)))?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        Ok(Self { cipher })
    }

    /// Derive the key using the salt stored in `dir`, creating one if needed.
    pub fn for_dir(passphrase: &str, dir: &Path) -> Result<Self, StoreError> {
        let salt = load_or_create_salt(dir)?;
        Self::derive(passphrase, &salt)
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, StoreError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| StoreError::Seal("encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(MAGIC.len() + NONCE_LEN + ciphertext.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, StoreError> {
        let header = MAGIC.len() + NONCE_LEN;
        if sealed.len() < header || &sealed[..MAGIC.len()] != MAGIC {
            return Err(StoreError::Seal("not a sealed blob".to_string()));
        }
        let nonce = Nonce::from_slice(&sealed[MAGIC.len()..header]);
        self.cipher
            .decrypt(nonce, &sealed[header..])
            .map_err(|_| StoreError::Seal("wrong passphrase or corrupted blob".to_string()))
    }
}

fn load_or_create_salt(dir: &Path) -> Result<[u8; SALT_LEN], StoreError> {
    let path = dir.join(SALT_FILE);
    if path.exists() {
        let bytes = std::fs::read(&path)?;
        return bytes
            .try_into()
            .map_err(|_| StoreError::Seal(format!("salt file {} is malformed", path.display())));
    }

    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    std::fs::create_dir_all(dir)?;
    std::fs::write(&path, salt)?;
    Ok(salt)
}
