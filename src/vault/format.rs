//! Binary vault container format.
//!
//! A `.pqdb` file has this layout (all integers big-endian):
//!
//! ```text
//! offset  size  field
//! 0       1     format_version (currently 1)
//! 1       1     kdf_params_len (currently 26)
//! 2       N     kdf_params: salt(16) | memory(4) | time(4) | parallelism(1) | kdf_version(1)
//! 2+N     32    integrity_tag: HMAC-SHA256 over version || kdf_params || payload
//! 34+N    4     encrypted_payload_len
//! 38+N    M     encrypted_payload: nonce(12) | AES-256-GCM ciphertext
//! ```
//!
//! This module only moves bytes; sealing and verification live in
//! `cipher`.

use crate::crypto::kdf::KdfParams;
use crate::errors::{PqVaultError, Result};

/// Current container format version.
pub const CURRENT_VERSION: u8 = 1;

/// Size of the HMAC-SHA256 integrity tag.
pub const TAG_LEN: usize = 32;

/// Fixed bytes around the KDF block and payload: version, kdf_len, tag, payload_len.
const FIXED_LEN: usize = 1 + 1 + TAG_LEN + 4;

/// An encrypted vault as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultContainer {
    pub format_version: u8,
    pub kdf_params: KdfParams,
    pub integrity_tag: [u8; TAG_LEN],
    /// `nonce(12) || AEAD ciphertext` of the concatenated entry records.
    pub encrypted_payload: Vec<u8>,
}

impl VaultContainer {
    /// Serialize to the on-disk layout.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let kdf_bytes = self.kdf_params.to_bytes()?;
        let kdf_len = u8::try_from(kdf_bytes.len()).map_err(|_| {
            PqVaultError::InvalidKdfParams(format!(
                "KDF parameter block of {} bytes does not fit a 1-byte length",
                kdf_bytes.len()
            ))
        })?;
        let payload_len = u32::try_from(self.encrypted_payload.len())
            .map_err(|_| PqVaultError::PayloadTooLarge(self.encrypted_payload.len()))?;

        let mut buf = Vec::with_capacity(FIXED_LEN + kdf_bytes.len() + self.encrypted_payload.len());
        buf.push(self.format_version);
        buf.push(kdf_len);
        buf.extend_from_slice(&kdf_bytes);
        buf.extend_from_slice(&self.integrity_tag);
        buf.extend_from_slice(&payload_len.to_be_bytes());
        buf.extend_from_slice(&self.encrypted_payload);
        Ok(buf)
    }

    /// Parse the on-disk layout.
    ///
    /// Only structure is checked here. The integrity tag is verified by
    /// `cipher::open`.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let Some(&format_version) = data.first() else {
            return Err(PqVaultError::TruncatedContainer("file is empty".into()));
        };
        if format_version != CURRENT_VERSION {
            return Err(PqVaultError::UnsupportedVersion(format_version));
        }

        if data.len() < FIXED_LEN {
            return Err(PqVaultError::TruncatedContainer(format!(
                "file is {} bytes, smaller than the {FIXED_LEN}-byte minimum",
                data.len()
            )));
        }

        let kdf_len = usize::from(data[1]);
        let kdf_end = 2 + kdf_len;
        let tag_end = kdf_end + TAG_LEN;
        let len_end = tag_end + 4;
        if data.len() < len_end {
            return Err(PqVaultError::TruncatedContainer(
                "KDF parameter length exceeds file size".into(),
            ));
        }

        let kdf_params = KdfParams::from_bytes(&data[2..kdf_end])?;

        let mut integrity_tag = [0u8; TAG_LEN];
        integrity_tag.copy_from_slice(&data[kdf_end..tag_end]);

        let payload_len_u32 =
            u32::from_be_bytes([data[tag_end], data[tag_end + 1], data[tag_end + 2], data[tag_end + 3]]);
        let payload_len = usize::try_from(payload_len_u32).map_err(|_| {
            PqVaultError::TruncatedContainer(format!(
                "payload length {payload_len_u32} exceeds platform address space"
            ))
        })?;

        let remaining = data.len() - len_end;
        if payload_len != remaining {
            return Err(PqVaultError::TruncatedContainer(format!(
                "declared payload length {payload_len} does not match the {remaining} bytes present"
            )));
        }

        Ok(Self {
            format_version,
            kdf_params,
            integrity_tag,
            encrypted_payload: data[len_end..].to_vec(),
        })
    }
}
