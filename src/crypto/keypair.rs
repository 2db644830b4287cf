//! KEM keypair persistence.
//!
//! The public key encrypts new entries and the secret key decrypts them.
//! Both live in their own files next to the vault: the public key is
//! world-readable, the secret key is written owner-only (0600 on Unix).
//! Neither file is ever overwritten; losing the secret key loses every
//! entry encapsulated to it.

use std::fs;
use std::path::Path;

use tracing::info;
use zeroize::Zeroizing;

use super::kem::Kem;
use crate::errors::{PqVaultError, Result};

/// A KEM public/secret keypair as raw bytes.
pub struct KemKeypair {
    public_key: Vec<u8>,
    secret_key: Zeroizing<Vec<u8>>,
}

impl KemKeypair {
    /// Wrap raw key bytes.
    pub fn new(public_key: Vec<u8>, secret_key: Zeroizing<Vec<u8>>) -> Self {
        Self {
            public_key,
            secret_key,
        }
    }

    /// The public (encapsulation) key.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// The secret (decapsulation) key.
    pub fn secret_key(&self) -> &[u8] {
        &self.secret_key
    }

    /// Write the keypair to `pub_path` and `sec_path`.
    ///
    /// Refuses to overwrite either file.
    pub fn save(&self, pub_path: &Path, sec_path: &Path) -> Result<()> {
        for path in [pub_path, sec_path] {
            if path.exists() {
                return Err(PqVaultError::KeypairError(format!(
                    "key file already exists at {}",
                    path.display()
                )));
            }
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent).map_err(|e| {
                        PqVaultError::KeypairError(format!("cannot create key directory: {e}"))
                    })?;
                }
            }
        }

        fs::write(pub_path, &self.public_key)
            .map_err(|e| PqVaultError::KeypairError(format!("failed to write public key: {e}")))?;
        write_private(sec_path, &self.secret_key)?;

        Ok(())
    }

    /// Load a keypair from disk, checking sizes against `kem`.
    pub fn load(kem: &dyn Kem, pub_path: &Path, sec_path: &Path) -> Result<Self> {
        let public_key = read_key(pub_path, "public", kem.public_key_len())?;
        let secret_key = Zeroizing::new(read_key(sec_path, "secret", kem.secret_key_len())?);
        Ok(Self::new(public_key, secret_key))
    }

    /// Load the keypair, or generate and save a new one if neither file exists.
    ///
    /// If exactly one of the two files exists the keypair is considered
    /// damaged and an error is returned rather than replacing it.
    pub fn load_or_generate(kem: &dyn Kem, pub_path: &Path, sec_path: &Path) -> Result<Self> {
        match (pub_path.exists(), sec_path.exists()) {
            (true, true) => Self::load(kem, pub_path, sec_path),
            (false, false) => {
                let keypair = kem.generate_keypair()?;
                keypair.save(pub_path, sec_path)?;
                info!(algorithm = kem.name(), "Generated new KEM keypair");
                Ok(keypair)
            }
            _ => Err(PqVaultError::KeypairError(format!(
                "only one of {} and {} exists",
                pub_path.display(),
                sec_path.display()
            ))),
        }
    }
}

impl std::fmt::Debug for KemKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KemKeypair")
            .field("public_key_len", &self.public_key.len())
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

fn read_key(path: &Path, which: &str, expected_len: usize) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(PqVaultError::KeypairError(format!(
            "{which} key not found at {}",
            path.display()
        )));
    }

    let data = fs::read(path)
        .map_err(|e| PqVaultError::KeypairError(format!("failed to read {which} key: {e}")))?;

    if data.len() != expected_len {
        return Err(PqVaultError::KeypairError(format!(
            "{which} key must be exactly {expected_len} bytes, got {}",
            data.len()
        )));
    }

    Ok(data)
}

/// Create `path` with owner-only permissions and write `data` to it.
fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    use std::io::Write;

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .map_err(|e| PqVaultError::KeypairError(format!("failed to create secret key: {e}")))?;
    file.write_all(data)
        .map_err(|e| PqVaultError::KeypairError(format!("failed to write secret key: {e}")))?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kem::MlKem768;
    use tempfile::TempDir;

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let pub_path = dir.path().join("kem.pub");
        let sec_path = dir.path().join("kem.key");

        let generated = MlKem768.generate_keypair().unwrap();
        generated.save(&pub_path, &sec_path).unwrap();

        let loaded = KemKeypair::load(&MlKem768, &pub_path, &sec_path).unwrap();
        assert_eq!(generated.public_key(), loaded.public_key());
        assert_eq!(generated.secret_key(), loaded.secret_key());
    }

    #[test]
    fn save_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let pub_path = dir.path().join("kem.pub");
        let sec_path = dir.path().join("kem.key");

        let keypair = MlKem768.generate_keypair().unwrap();
        keypair.save(&pub_path, &sec_path).unwrap();
        assert!(keypair.save(&pub_path, &sec_path).is_err());
    }

    #[test]
    fn load_rejects_wrong_length() {
        let dir = TempDir::new().unwrap();
        let pub_path = dir.path().join("kem.pub");
        let sec_path = dir.path().join("kem.key");
        fs::write(&pub_path, [0u8; 16]).unwrap();
        fs::write(&sec_path, [0u8; 16]).unwrap();

        assert!(KemKeypair::load(&MlKem768, &pub_path, &sec_path).is_err());
    }

    #[test]
    fn load_or_generate_is_stable() {
        let dir = TempDir::new().unwrap();
        let pub_path = dir.path().join("keys").join("kem.pub");
        let sec_path = dir.path().join("keys").join("kem.key");

        let first = KemKeypair::load_or_generate(&MlKem768, &pub_path, &sec_path).unwrap();
        let second = KemKeypair::load_or_generate(&MlKem768, &pub_path, &sec_path).unwrap();
        assert_eq!(first.public_key(), second.public_key());
    }

    #[test]
    fn load_or_generate_refuses_half_keypair() {
        let dir = TempDir::new().unwrap();
        let pub_path = dir.path().join("kem.pub");
        let sec_path = dir.path().join("kem.key");
        fs::write(&pub_path, [0u8; 4]).unwrap();

        let result = KemKeypair::load_or_generate(&MlKem768, &pub_path, &sec_path);
        assert!(matches!(result, Err(PqVaultError::KeypairError(_))));
    }

    #[cfg(unix)]
    #[test]
    fn secret_key_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let pub_path = dir.path().join("kem.pub");
        let sec_path = dir.path().join("kem.key");
        MlKem768
            .generate_keypair()
            .unwrap()
            .save(&pub_path, &sec_path)
            .unwrap();

        let mode = fs::metadata(&sec_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
