//! Integration tests for vault sessions: create, unlock, add, list, lock.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use pqvault::crypto::{Argon2Params, Kem, MlKem768};
use pqvault::vault::EntryId;
use pqvault::{PqVaultError, Session};
use tempfile::TempDir;

const PASSWORD: &[u8] = b"Tr0ub4dor&3";

fn fast_cost() -> Argon2Params {
    Argon2Params {
        memory_kib: 8192,
        iterations: 1,
        parallelism: 1,
    }
}

fn session() -> Session {
    let kem: Arc<dyn Kem> = Arc::new(MlKem768);
    let keypair = kem.generate_keypair().unwrap();
    Session::new(kem, keypair).with_kdf_cost(fast_cost())
}

fn vault_path() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("vault.pqdb");
    (dir, path)
}

fn plaintexts(handle: &pqvault::VaultHandle) -> Vec<Vec<u8>> {
    handle
        .list_secrets()
        .unwrap()
        .iter()
        .map(|s| s.plaintext().expect("entry decrypts").to_vec())
        .collect()
}

// ---------------------------------------------------------------------------
// Full lifecycle
// ---------------------------------------------------------------------------

#[test]
fn add_lock_unlock_recovers_the_secret() {
    let (_dir, path) = vault_path();
    let session = session();

    let handle = session.create_vault(&path, PASSWORD).unwrap();
    let id = handle.add_secret(b"hunter2").unwrap();
    handle.lock();

    let reopened = session.unlock_vault(&path, PASSWORD).unwrap();
    let listed = reopened.list_secrets().unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);
    assert_eq!(listed[0].plaintext(), Some(&b"hunter2"[..]));
}

#[test]
fn wrong_password_is_rejected_and_file_is_untouched() {
    let (_dir, path) = vault_path();
    let session = session();

    let handle = session.create_vault(&path, PASSWORD).unwrap();
    handle.add_secret(b"hunter2").unwrap();
    handle.lock();

    let before = fs::read(&path).unwrap();
    let result = session.unlock_vault(&path, b"wrong-pw");
    let after = fs::read(&path).unwrap();

    assert!(matches!(result, Err(PqVaultError::IntegrityViolation)));
    assert_eq!(before, after);
}

#[test]
fn modified_kdf_version_reads_as_integrity_failure() {
    let (_dir, path) = vault_path();
    let session = session();
    session.create_vault(&path, PASSWORD).unwrap().lock();

    // version(1) | kdf_len(1) | salt(16) | memory(4) | time(4) | parallelism(1) | kdf version(1)
    let mut bytes = fs::read(&path).unwrap();
    bytes[27] ^= 0x01;
    fs::write(&path, &bytes).unwrap();

    let result = session.unlock_vault(&path, PASSWORD);
    assert!(matches!(result, Err(PqVaultError::IntegrityViolation)));
}

#[test]
fn secrets_keep_insertion_order() {
    let (_dir, path) = vault_path();
    let handle = session().create_vault(&path, PASSWORD).unwrap();

    handle.add_secret(b"first").unwrap();
    handle.add_secret(b"second").unwrap();
    handle.add_secret(b"third").unwrap();

    assert_eq!(
        plaintexts(&handle),
        vec![b"first".to_vec(), b"second".to_vec(), b"third".to_vec()]
    );
}

#[test]
fn ids_are_unique() {
    let (_dir, path) = vault_path();
    let handle = session().create_vault(&path, PASSWORD).unwrap();

    let a = handle.add_secret(b"a").unwrap();
    let b = handle.add_secret(b"b").unwrap();
    assert_ne!(a, b);
    assert_eq!(handle.entry_ids().unwrap(), vec![a, b]);
}

#[test]
fn empty_secret_round_trips() {
    let (_dir, path) = vault_path();
    let handle = session().create_vault(&path, PASSWORD).unwrap();

    let id = handle.add_secret(b"").unwrap();
    assert!(handle.get_secret(id).unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Single-entry operations
// ---------------------------------------------------------------------------

#[test]
fn get_secret_by_id() {
    let (_dir, path) = vault_path();
    let handle = session().create_vault(&path, PASSWORD).unwrap();

    handle.add_secret(b"one").unwrap();
    let id = handle.add_secret(b"two").unwrap();

    assert_eq!(handle.get_secret(id).unwrap().as_slice(), b"two");
}

#[test]
fn get_unknown_id_fails() {
    let (_dir, path) = vault_path();
    let handle = session().create_vault(&path, PASSWORD).unwrap();

    let result = handle.get_secret(EntryId(42));
    assert!(matches!(result, Err(PqVaultError::SecretNotFound(EntryId(42)))));
}

#[test]
fn remove_secret_persists() {
    let (_dir, path) = vault_path();
    let session = session();
    let handle = session.create_vault(&path, PASSWORD).unwrap();

    let keep = handle.add_secret(b"keep").unwrap();
    let gone = handle.add_secret(b"gone").unwrap();
    handle.remove_secret(gone).unwrap();
    handle.lock();

    let reopened = session.unlock_vault(&path, PASSWORD).unwrap();
    assert_eq!(reopened.entry_ids().unwrap(), vec![keep]);
    assert!(matches!(
        reopened.remove_secret(gone),
        Err(PqVaultError::SecretNotFound(_))
    ));
}

// ---------------------------------------------------------------------------
// Locking
// ---------------------------------------------------------------------------

#[test]
fn locked_handle_refuses_operations() {
    let (_dir, path) = vault_path();
    let handle = session().create_vault(&path, PASSWORD).unwrap();
    assert!(!handle.is_locked());

    handle.lock();
    assert!(handle.is_locked());

    assert!(matches!(handle.add_secret(b"x"), Err(PqVaultError::VaultLocked)));
    assert!(matches!(handle.list_secrets(), Err(PqVaultError::VaultLocked)));
    assert!(matches!(handle.entry_ids(), Err(PqVaultError::VaultLocked)));

    // Locking twice is harmless.
    handle.lock();
    assert!(handle.is_locked());
}

// ---------------------------------------------------------------------------
// Create / open / destroy
// ---------------------------------------------------------------------------

#[test]
fn create_refuses_existing_vault() {
    let (_dir, path) = vault_path();
    let session = session();
    session.create_vault(&path, PASSWORD).unwrap();

    let result = session.create_vault(&path, PASSWORD);
    assert!(matches!(result, Err(PqVaultError::VaultAlreadyExists(_))));
}

#[test]
fn unlock_missing_vault_fails() {
    let (_dir, path) = vault_path();
    let result = session().unlock_vault(&path, PASSWORD);
    assert!(matches!(result, Err(PqVaultError::VaultNotFound(_))));
}

#[test]
fn open_or_create_creates_then_unlocks() {
    let (_dir, path) = vault_path();
    let session = session();

    let first = session.open_or_create(&path, PASSWORD).unwrap();
    let id = first.add_secret(b"hunter2").unwrap();
    first.lock();

    let second = session.open_or_create(&path, PASSWORD).unwrap();
    assert_eq!(second.entry_ids().unwrap(), vec![id]);

    let wrong = session.open_or_create(&path, b"wrong-pw");
    assert!(matches!(wrong, Err(PqVaultError::IntegrityViolation)));
}

#[test]
fn destroy_vault_deletes_the_file() {
    let (_dir, path) = vault_path();
    session().create_vault(&path, PASSWORD).unwrap();

    Session::destroy_vault(&path).unwrap();
    assert!(!path.exists());

    let again = Session::destroy_vault(&path);
    assert!(matches!(again, Err(PqVaultError::VaultNotFound(_))));
}

// ---------------------------------------------------------------------------
// Keys and concurrency
// ---------------------------------------------------------------------------

#[test]
fn entries_sealed_to_another_keypair_fail_individually() {
    let (_dir, path) = vault_path();

    let handle = session().create_vault(&path, PASSWORD).unwrap();
    handle.add_secret(b"sealed to the first keypair").unwrap();
    handle.lock();

    // Same password, different KEM keypair: the vault opens but the
    // entry cannot be decapsulated.
    let other = session().unlock_vault(&path, PASSWORD).unwrap();
    let listed = other.list_secrets().unwrap();
    assert_eq!(listed.len(), 1);
    assert!(matches!(
        listed[0].value,
        Err(PqVaultError::EntryDecryptionFailed(_))
    ));
}

#[test]
fn concurrent_adds_are_all_persisted() {
    let (_dir, path) = vault_path();
    let session = session();
    let handle = Arc::new(session.create_vault(&path, PASSWORD).unwrap());

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let handle = Arc::clone(&handle);
            thread::spawn(move || {
                for j in 0..3 {
                    handle.add_secret(format!("secret-{i}-{j}").as_bytes()).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    handle.lock();

    let reopened = session.unlock_vault(&path, PASSWORD).unwrap();
    let mut values: Vec<String> = plaintexts(&reopened)
        .into_iter()
        .map(|v| String::from_utf8(v).unwrap())
        .collect();
    values.sort();

    let mut expected: Vec<String> = (0..4)
        .flat_map(|i| (0..3).map(move |j| format!("secret-{i}-{j}")))
        .collect();
    expected.sort();
    assert_eq!(values, expected);
}
