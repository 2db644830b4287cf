//! Key encapsulation.
//!
//! The vault treats the KEM as a black box with fixed-size outputs:
//! `generate_keypair`, `encapsulate(public_key) -> (ciphertext, secret)`
//! and `decapsulate(ciphertext, secret_key) -> secret`. Keys and
//! ciphertexts cross the trait as raw bytes so the session can hold any
//! implementation behind `Arc<dyn Kem>`.
//!
//! `MlKem768` is the production implementation (FIPS 203 ML-KEM-768).

use pqcrypto_mlkem::mlkem768;
use pqcrypto_traits::kem::{
    Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _,
};
use zeroize::Zeroizing;

use super::keypair::KemKeypair;
use crate::errors::{PqVaultError, Result};

/// Length of every shared secret handed to the entry cipher (AES-256 key).
pub const SHARED_SECRET_LEN: usize = 32;

/// A KEM shared secret, zeroed on drop.
pub type SharedSecret = Zeroizing<[u8; SHARED_SECRET_LEN]>;

/// The key-encapsulation capability used for per-entry encryption.
pub trait Kem: Send + Sync {
    /// Short algorithm name, for logs.
    fn name(&self) -> &'static str;

    /// Size of an encoded public key.
    fn public_key_len(&self) -> usize;

    /// Size of an encoded secret key.
    fn secret_key_len(&self) -> usize;

    /// Size of an encapsulation ciphertext.
    fn ciphertext_len(&self) -> usize;

    /// Generate a fresh keypair.
    fn generate_keypair(&self) -> Result<KemKeypair>;

    /// Produce a ciphertext and the shared secret it carries.
    fn encapsulate(&self, public_key: &[u8]) -> Result<(Vec<u8>, SharedSecret)>;

    /// Recover the shared secret from a ciphertext.
    fn decapsulate(&self, ciphertext: &[u8], secret_key: &[u8]) -> Result<SharedSecret>;
}

/// ML-KEM-768 backed by `pqcrypto-mlkem`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MlKem768;

impl Kem for MlKem768 {
    fn name(&self) -> &'static str {
        "ML-KEM-768"
    }

    fn public_key_len(&self) -> usize {
        mlkem768::public_key_bytes()
    }

    fn secret_key_len(&self) -> usize {
        mlkem768::secret_key_bytes()
    }

    fn ciphertext_len(&self) -> usize {
        mlkem768::ciphertext_bytes()
    }

    fn generate_keypair(&self) -> Result<KemKeypair> {
        let (pk, sk) = mlkem768::keypair();
        Ok(KemKeypair::new(
            pk.as_bytes().to_vec(),
            Zeroizing::new(sk.as_bytes().to_vec()),
        ))
    }

    fn encapsulate(&self, public_key: &[u8]) -> Result<(Vec<u8>, SharedSecret)> {
        let pk = mlkem768::PublicKey::from_bytes(public_key)
            .map_err(|e| PqVaultError::Kem(format!("invalid public key: {e:?}")))?;

        let (ss, ct) = mlkem768::encapsulate(&pk);
        Ok((ct.as_bytes().to_vec(), to_shared_secret(ss.as_bytes())?))
    }

    fn decapsulate(&self, ciphertext: &[u8], secret_key: &[u8]) -> Result<SharedSecret> {
        let ct = mlkem768::Ciphertext::from_bytes(ciphertext)
            .map_err(|e| PqVaultError::Kem(format!("invalid ciphertext: {e:?}")))?;
        let sk = mlkem768::SecretKey::from_bytes(secret_key)
            .map_err(|e| PqVaultError::Kem(format!("invalid secret key: {e:?}")))?;

        let ss = mlkem768::decapsulate(&ct, &sk);
        to_shared_secret(ss.as_bytes())
    }
}

fn to_shared_secret(bytes: &[u8]) -> Result<SharedSecret> {
    if bytes.len() != SHARED_SECRET_LEN {
        return Err(PqVaultError::Kem(format!(
            "shared secret is {} bytes, expected {SHARED_SECRET_LEN}",
            bytes.len()
        )));
    }
    let mut secret = Zeroizing::new([0u8; SHARED_SECRET_LEN]);
    secret.copy_from_slice(bytes);
    Ok(secret)
}
