//! Vault sessions: create, unlock, add, list, lock.
//!
//! A `Session` bundles the collaborators every vault operation needs (the
//! KEM, its keypair, and the Argon2 cost for new vaults). Creating or
//! unlocking a vault yields a `VaultHandle` that owns the derived keys
//! until `lock` is called or the handle is dropped.
//!
//! Every mutation is a read-modify-write of the whole file, so the handle
//! holds its mutex across the full cycle to avoid lost updates between
//! threads of one process. Separate processes must not share a vault.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::encryption::{decrypt_detached, encrypt_detached};
use crate::crypto::kdf::{derive_keys, Argon2Params, DerivedKeys, KdfParams};
use crate::crypto::kem::Kem;
use crate::crypto::keypair::KemKeypair;
use crate::errors::{PqVaultError, Result};
use crate::vault::cipher::open;
use crate::vault::entry::EntryShape;
use crate::vault::store::{self, decode_entries};
use crate::vault::{Entry, EntryId};

/// Shared collaborators for opening vaults.
pub struct Session {
    kem: Arc<dyn Kem>,
    keypair: Arc<KemKeypair>,
    kdf_cost: Argon2Params,
}

impl Session {
    /// Build a session around a KEM and the keypair entries are sealed to.
    pub fn new(kem: Arc<dyn Kem>, keypair: KemKeypair) -> Self {
        Self {
            kem,
            keypair: Arc::new(keypair),
            kdf_cost: Argon2Params::default(),
        }
    }

    /// Argon2 cost used when creating new vaults.
    ///
    /// Existing vaults always use the parameters stored in their file.
    pub fn with_kdf_cost(mut self, cost: Argon2Params) -> Self {
        self.kdf_cost = cost;
        self
    }

    /// Create a new, empty vault file at `path`.
    pub fn create_vault(&self, path: &Path, master_password: &[u8]) -> Result<VaultHandle> {
        if store::vault_exists(path) {
            return Err(PqVaultError::VaultAlreadyExists(path.to_path_buf()));
        }

        let mut kdf_params = KdfParams::generate(self.kdf_cost)?;
        let keys = derive_keys(master_password, &mut kdf_params)?;

        store::write_vault(
            &[],
            path,
            keys.encryption_key(),
            keys.verification_key(),
            &kdf_params,
        )?;

        info!(path = %path.display(), "Created vault");
        Ok(self.handle(path, keys, kdf_params))
    }

    /// Unlock an existing vault with its master password.
    ///
    /// A wrong password and a damaged or modified file both fail with
    /// `IntegrityViolation`.
    pub fn unlock_vault(&self, path: &Path, master_password: &[u8]) -> Result<VaultHandle> {
        let container = match store::read_container(path) {
            Ok(Some(container)) => container,
            Ok(None) => return Err(PqVaultError::VaultNotFound(path.to_path_buf())),
            // The KDF block is covered by the tag; a version-1 container
            // with any other KDF version has been modified.
            Err(PqVaultError::UnsupportedKdfVersion(version)) => {
                debug!(version, "Stored KDF parameter version rejected");
                return Err(PqVaultError::IntegrityViolation);
            }
            Err(e) => return Err(e),
        };

        let mut kdf_params = container.kdf_params.clone();
        let keys = match derive_keys(master_password, &mut kdf_params) {
            Ok(keys) => keys,
            // Out-of-range parameters were never written by `create_vault`.
            Err(PqVaultError::InvalidKdfParams(reason)) => {
                debug!(%reason, "Stored KDF parameters rejected");
                return Err(PqVaultError::IntegrityViolation);
            }
            Err(e) => return Err(e),
        };

        let plaintext = Zeroizing::new(open(
            &container,
            keys.encryption_key(),
            keys.verification_key(),
        )?);
        let report = decode_entries(&plaintext, EntryShape::of(self.kem.as_ref()));

        info!(
            path = %path.display(),
            entries = report.entries.len(),
            skipped = report.skipped.len(),
            "Unlocked vault"
        );
        Ok(self.handle(path, keys, kdf_params))
    }

    /// Unlock the vault at `path`, creating it first if it does not exist.
    pub fn open_or_create(&self, path: &Path, master_password: &[u8]) -> Result<VaultHandle> {
        if store::vault_exists(path) {
            self.unlock_vault(path, master_password)
        } else {
            self.create_vault(path, master_password)
        }
    }

    /// Irreversibly delete the vault file at `path`.
    pub fn destroy_vault(path: &Path) -> Result<()> {
        if !store::vault_exists(path) {
            return Err(PqVaultError::VaultNotFound(path.to_path_buf()));
        }
        store::delete_vault(path)?;
        warn!(path = %path.display(), "Vault destroyed");
        Ok(())
    }

    fn handle(&self, path: &Path, keys: DerivedKeys, kdf_params: KdfParams) -> VaultHandle {
        VaultHandle {
            path: path.to_path_buf(),
            kem: Arc::clone(&self.kem),
            keypair: Arc::clone(&self.keypair),
            state: Mutex::new(Some(Unlocked { keys, kdf_params })),
        }
    }
}

/// Key material held while a vault is unlocked.
struct Unlocked {
    keys: DerivedKeys,
    kdf_params: KdfParams,
}

/// One decrypted listing row.
///
/// `value` is per entry so a single undecryptable entry does not hide
/// the others.
pub struct ListedSecret {
    pub id: EntryId,
    pub value: Result<Zeroizing<Vec<u8>>>,
}

impl ListedSecret {
    /// The plaintext, if this entry decrypted.
    pub fn plaintext(&self) -> Option<&[u8]> {
        self.value.as_ref().ok().map(|v| v.as_slice())
    }
}

impl std::fmt::Debug for ListedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match &self.value {
            Ok(_) => "[REDACTED]".to_string(),
            Err(e) => e.to_string(),
        };
        f.debug_struct("ListedSecret")
            .field("id", &self.id)
            .field("value", &value)
            .finish()
    }
}

/// An unlocked vault.
pub struct VaultHandle {
    path: PathBuf,
    kem: Arc<dyn Kem>,
    keypair: Arc<KemKeypair>,
    state: Mutex<Option<Unlocked>>,
}

impl VaultHandle {
    /// Encrypt `plaintext` into a new entry and persist the vault.
    ///
    /// Returns the id assigned to the new entry.
    pub fn add_secret(&self, plaintext: &[u8]) -> Result<EntryId> {
        let guard = self.state();
        let unlocked = guard.as_ref().ok_or(PqVaultError::VaultLocked)?;

        let mut entries = self.read_entries(unlocked)?;

        let (encapsulated_secret, shared_secret) =
            self.kem.encapsulate(self.keypair.public_key())?;
        let (nonce, ciphertext) = encrypt_detached(&shared_secret[..], plaintext)?;

        let id = fresh_id(&entries)?;
        entries.push(Entry {
            id,
            encapsulated_secret,
            nonce,
            ciphertext,
        });

        self.write_entries(unlocked, &entries)?;
        debug!(%id, total = entries.len(), "Added secret");
        Ok(id)
    }

    /// Decrypt every entry, in stored order.
    pub fn list_secrets(&self) -> Result<Vec<ListedSecret>> {
        let guard = self.state();
        let unlocked = guard.as_ref().ok_or(PqVaultError::VaultLocked)?;

        let listed = self
            .read_entries(unlocked)?
            .iter()
            .map(|entry| ListedSecret {
                id: entry.id,
                value: self.decrypt_entry(entry),
            })
            .collect();
        Ok(listed)
    }

    /// Decrypt a single entry by id.
    pub fn get_secret(&self, id: EntryId) -> Result<Zeroizing<Vec<u8>>> {
        let guard = self.state();
        let unlocked = guard.as_ref().ok_or(PqVaultError::VaultLocked)?;

        let entries = self.read_entries(unlocked)?;
        let entry = entries
            .iter()
            .find(|e| e.id == id)
            .ok_or(PqVaultError::SecretNotFound(id))?;
        self.decrypt_entry(entry)
    }

    /// Remove an entry and persist the vault.
    pub fn remove_secret(&self, id: EntryId) -> Result<()> {
        let guard = self.state();
        let unlocked = guard.as_ref().ok_or(PqVaultError::VaultLocked)?;

        let mut entries = self.read_entries(unlocked)?;
        let index = entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(PqVaultError::SecretNotFound(id))?;
        entries.remove(index);

        self.write_entries(unlocked, &entries)?;
        debug!(%id, total = entries.len(), "Removed secret");
        Ok(())
    }

    /// Ids of all entries, in stored order, without decrypting values.
    pub fn entry_ids(&self) -> Result<Vec<EntryId>> {
        let guard = self.state();
        let unlocked = guard.as_ref().ok_or(PqVaultError::VaultLocked)?;
        Ok(self.read_entries(unlocked)?.iter().map(|e| e.id).collect())
    }

    /// Forget the derived keys. Every later operation fails with `VaultLocked`.
    pub fn lock(&self) {
        if let Some(mut unlocked) = self.state().take() {
            unlocked.keys.zeroize();
            info!(path = %self.path.display(), "Locked vault");
        }
    }

    /// Returns `true` once `lock` has been called.
    pub fn is_locked(&self) -> bool {
        self.state().is_none()
    }

    /// Path of the vault file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn state(&self) -> MutexGuard<'_, Option<Unlocked>> {
        // A panic mid-write leaves the file as it was; the keys are still valid.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_entries(&self, unlocked: &Unlocked) -> Result<Vec<Entry>> {
        let report = store::read_vault_with_report(
            &self.path,
            unlocked.keys.encryption_key(),
            unlocked.keys.verification_key(),
            EntryShape::of(self.kem.as_ref()),
        )?;
        Ok(report.entries)
    }

    fn write_entries(&self, unlocked: &Unlocked, entries: &[Entry]) -> Result<()> {
        store::write_vault(
            entries,
            &self.path,
            unlocked.keys.encryption_key(),
            unlocked.keys.verification_key(),
            &unlocked.kdf_params,
        )
    }

    fn decrypt_entry(&self, entry: &Entry) -> Result<Zeroizing<Vec<u8>>> {
        let result = self
            .kem
            .decapsulate(&entry.encapsulated_secret, self.keypair.secret_key())
            .and_then(|shared| decrypt_detached(&shared[..], &entry.nonce, &entry.ciphertext))
            .map(Zeroizing::new);

        result.map_err(|e| {
            warn!(id = %entry.id, error = %e, "Failed to decrypt entry");
            PqVaultError::EntryDecryptionFailed(entry.id)
        })
    }
}

impl std::fmt::Debug for VaultHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultHandle")
            .field("path", &self.path)
            .field("kem", &self.kem.name())
            .finish()
    }
}

/// A random id not already used by `entries`.
fn fresh_id(entries: &[Entry]) -> Result<EntryId> {
    loop {
        let id = EntryId::random()?;
        if entries.iter().all(|e| e.id != id) {
            return Ok(id);
        }
    }
}
