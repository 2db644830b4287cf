//! Cryptographic primitives for PqVault.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - Argon2id password-based key derivation with domain separation (`kdf`)
//! - The key-encapsulation capability and its ML-KEM-768 adapter (`kem`)
//! - KEM keypair persistence (`keypair`)

pub mod encryption;
pub mod kdf;
pub mod kem;
pub mod keypair;

use rand::rngs::OsRng;
use rand::TryRngCore;

use crate::errors::{PqVaultError, Result};

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{derive_keys, KdfParams, ...};
pub use encryption::{decrypt, decrypt_detached, encrypt, encrypt_detached, NONCE_LEN};
pub use kdf::{derive_keys, generate_salt, Argon2Params, DerivedKeys, KdfParams};
pub use kem::{Kem, MlKem768, SharedSecret};
pub use keypair::KemKeypair;

/// Fill `buf` from the operating system's CSPRNG.
///
/// Every nonce, salt and entry id in the crate comes through here, so an
/// unavailable entropy source surfaces as one typed error.
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| PqVaultError::EntropySourceUnavailable(e.to_string()))
}
