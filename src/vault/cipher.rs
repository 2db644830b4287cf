//! Vault payload encryption and container integrity.
//!
//! `seal` encrypts the concatenated entry records with AES-256-GCM under
//! the encryption key, then computes an HMAC-SHA256 tag under the
//! verification key over `version || kdf_params || encrypted_payload`.
//!
//! `open` checks that tag in constant time **before** touching the
//! ciphertext. A tag mismatch is `IntegrityViolation`, whether the cause
//! was a wrong password or a modified file. An AEAD failure after a
//! matching tag is reported separately as `DecryptionFailed`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::error;

use super::format::{VaultContainer, CURRENT_VERSION, TAG_LEN};
use crate::crypto::encryption::{decrypt, encrypt};
use crate::crypto::kdf::KdfParams;
use crate::errors::{PqVaultError, Result};

/// Encrypt `plaintext` and assemble a tagged container.
pub fn seal(
    plaintext: &[u8],
    encryption_key: &[u8],
    verification_key: &[u8],
    kdf_params: &KdfParams,
) -> Result<VaultContainer> {
    let encrypted_payload = encrypt(encryption_key, plaintext)?;
    let kdf_bytes = kdf_params.to_bytes()?;
    let integrity_tag =
        compute_tag(verification_key, CURRENT_VERSION, &kdf_bytes, &encrypted_payload)?;

    Ok(VaultContainer {
        format_version: CURRENT_VERSION,
        kdf_params: kdf_params.clone(),
        integrity_tag,
        encrypted_payload,
    })
}

/// Verify the container tag, then decrypt the payload.
pub fn open(
    container: &VaultContainer,
    encryption_key: &[u8],
    verification_key: &[u8],
) -> Result<Vec<u8>> {
    verify_tag(container, verification_key)?;

    decrypt(encryption_key, &container.encrypted_payload).map_err(|_| {
        error!(
            payload_len = container.encrypted_payload.len(),
            "Vault payload failed AEAD authentication after its integrity tag verified"
        );
        PqVaultError::DecryptionFailed
    })
}

/// Check `container.integrity_tag` against a freshly computed one.
pub fn verify_tag(container: &VaultContainer, verification_key: &[u8]) -> Result<()> {
    // Parameters that cannot be encoded cannot have been sealed.
    let kdf_bytes = container
        .kdf_params
        .to_bytes()
        .map_err(|_| PqVaultError::IntegrityViolation)?;

    let expected = compute_tag(
        verification_key,
        container.format_version,
        &kdf_bytes,
        &container.encrypted_payload,
    )?;

    if expected[..].ct_eq(&container.integrity_tag[..]).into() {
        Ok(())
    } else {
        Err(PqVaultError::IntegrityViolation)
    }
}

/// HMAC-SHA256 over `version || kdf_bytes || payload`.
pub fn compute_tag(
    verification_key: &[u8],
    version: u8,
    kdf_bytes: &[u8],
    payload: &[u8],
) -> Result<[u8; TAG_LEN]> {
    let mut mac = Hmac::<Sha256>::new_from_slice(verification_key)
        .map_err(|e| PqVaultError::EncryptionFailed(format!("invalid HMAC key: {e}")))?;

    mac.update(&[version]);
    mac.update(kdf_bytes);
    mac.update(payload);

    Ok(mac.finalize().into_bytes().into())
}
