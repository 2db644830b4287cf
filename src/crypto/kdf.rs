//! Password-based key derivation using Argon2id.
//!
//! The master password is stretched by Argon2id into a 64-byte master
//! secret, which is then split into two domain-separated 256-bit keys:
//!
//! ```text
//! encryption_key   = SHA-256("encryption"   || master_secret)
//! verification_key = SHA-256("verification" || master_secret)
//! ```
//!
//! The KDF parameters (salt and cost) are stored in the vault container
//! so the keys can be re-derived from the master password alone.

use argon2::{Algorithm, Argon2, Params, Version};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::fill_random;
use crate::errors::{PqVaultError, Result};

/// Length of the salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Length of each derived key in bytes (256 bits, for AES-256 / HMAC-SHA256).
pub const KEY_LEN: usize = 32;

/// Length of the Argon2id output before domain separation.
const MASTER_SECRET_LEN: usize = 64;

/// Current encoding version of the KDF parameter block.
pub const KDF_FORMAT_VERSION: u8 = 1;

/// Encoded size: salt(16) | memory(4) | time(4) | parallelism(1) | version(1).
pub const KDF_PARAMS_LEN: usize = SALT_LEN + 4 + 4 + 1 + 1;

const ENCRYPTION_DOMAIN: &[u8] = b"encryption";
const VERIFICATION_DOMAIN: &[u8] = b"verification";

/// Minimum safe memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;

/// Maximum accepted memory cost in KiB (1 GB).
const MAX_MEMORY_KIB: u32 = 1_048_576;

/// Maximum accepted iteration count.
const MAX_ITERATIONS: u32 = 64;

/// Argon2id cost settings, independent of any particular salt.
///
/// These map 1:1 to the fields in `Settings` so the CLI can pass
/// whatever the user configured in `.pqvault.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 1).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u8,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 1,
            parallelism: 4,
        }
    }
}

impl Argon2Params {
    /// Reject cost settings that are dangerously weak or absurdly expensive.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_MEMORY_KIB..=MAX_MEMORY_KIB).contains(&self.memory_kib) {
            return Err(PqVaultError::InvalidKdfParams(format!(
                "memory_kib must be between {MIN_MEMORY_KIB} and {MAX_MEMORY_KIB} (got {})",
                self.memory_kib
            )));
        }
        if !(1..=MAX_ITERATIONS).contains(&self.iterations) {
            return Err(PqVaultError::InvalidKdfParams(format!(
                "iterations must be between 1 and {MAX_ITERATIONS} (got {})",
                self.iterations
            )));
        }
        if self.parallelism < 1 {
            return Err(PqVaultError::InvalidKdfParams(
                "parallelism must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Salt and cost parameters persisted alongside a vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfParams {
    /// Random salt. Empty means "not generated yet".
    pub salt: Vec<u8>,
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u8,
    pub format_version: u8,
}

impl KdfParams {
    /// Fresh parameters for a new vault, with a newly generated salt.
    pub fn generate(cost: Argon2Params) -> Result<Self> {
        let mut params = Self::unsalted(cost);
        params.salt = generate_salt()?.to_vec();
        Ok(params)
    }

    /// Parameters without a salt; `derive_keys` fills one in.
    pub fn unsalted(cost: Argon2Params) -> Self {
        Self {
            salt: Vec::new(),
            memory_kib: cost.memory_kib,
            iterations: cost.iterations,
            parallelism: cost.parallelism,
            format_version: KDF_FORMAT_VERSION,
        }
    }

    /// The cost part of these parameters.
    pub fn cost(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.memory_kib,
            iterations: self.iterations,
            parallelism: self.parallelism,
        }
    }

    /// Encode to the fixed 26-byte on-disk layout (big-endian integers).
    pub fn to_bytes(&self) -> Result<[u8; KDF_PARAMS_LEN]> {
        if self.salt.len() != SALT_LEN {
            return Err(PqVaultError::InvalidKdfParams(format!(
                "salt must be {SALT_LEN} bytes (got {})",
                self.salt.len()
            )));
        }

        let mut out = [0u8; KDF_PARAMS_LEN];
        out[..16].copy_from_slice(&self.salt);
        out[16..20].copy_from_slice(&self.memory_kib.to_be_bytes());
        out[20..24].copy_from_slice(&self.iterations.to_be_bytes());
        out[24] = self.parallelism;
        out[25] = self.format_version;
        Ok(out)
    }

    /// Decode the 26-byte on-disk layout.
    ///
    /// Cost values are not range-checked here; `derive_keys` does that.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < KDF_PARAMS_LEN {
            return Err(PqVaultError::TruncatedContainer(format!(
                "KDF parameters are {} bytes, expected {KDF_PARAMS_LEN}",
                data.len()
            )));
        }
        if data.len() > KDF_PARAMS_LEN {
            return Err(PqVaultError::InvalidKdfParams(format!(
                "KDF parameters are {} bytes, expected {KDF_PARAMS_LEN}",
                data.len()
            )));
        }

        let format_version = data[25];
        if format_version != KDF_FORMAT_VERSION {
            return Err(PqVaultError::UnsupportedKdfVersion(format_version));
        }

        Ok(Self {
            salt: data[..16].to_vec(),
            memory_kib: u32::from_be_bytes([data[16], data[17], data[18], data[19]]),
            iterations: u32::from_be_bytes([data[20], data[21], data[22], data[23]]),
            parallelism: data[24],
            format_version,
        })
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::unsalted(Argon2Params::default())
    }
}

/// The encryption and verification keys derived from a master password.
///
/// Both keys are zeroed when the value is dropped. Never persisted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKeys {
    encryption_key: [u8; KEY_LEN],
    verification_key: [u8; KEY_LEN],
}

impl DerivedKeys {
    /// Key for the vault payload cipher.
    pub fn encryption_key(&self) -> &[u8; KEY_LEN] {
        &self.encryption_key
    }

    /// Key for the container integrity tag.
    pub fn verification_key(&self) -> &[u8; KEY_LEN] {
        &self.verification_key
    }
}

impl std::fmt::Debug for DerivedKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKeys([REDACTED])")
    }
}

/// Derive the encryption and verification keys from a password.
///
/// If `params.salt` is empty a fresh random salt is generated and stored
/// back into `params`; the caller must persist it. The same password and
/// parameters always produce the same keys.
pub fn derive_keys(password: &[u8], params: &mut KdfParams) -> Result<DerivedKeys> {
    if params.salt.is_empty() {
        params.salt = generate_salt()?.to_vec();
    }

    let master_secret = derive_master_secret(password, params)?;

    Ok(DerivedKeys {
        encryption_key: domain_key(ENCRYPTION_DOMAIN, &master_secret[..]),
        verification_key: domain_key(VERIFICATION_DOMAIN, &master_secret[..]),
    })
}

/// Run Argon2id to produce the 64-byte master secret.
fn derive_master_secret(
    password: &[u8],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; MASTER_SECRET_LEN]>> {
    params.cost().validate()?;

    let argon2_params = Params::new(
        params.memory_kib,
        params.iterations,
        u32::from(params.parallelism),
        Some(MASTER_SECRET_LEN),
    )
    .map_err(|e| PqVaultError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut master = Zeroizing::new([0u8; MASTER_SECRET_LEN]);
    argon2
        .hash_password_into(password, &params.salt, &mut master[..])
        .map_err(|e| PqVaultError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(master)
}

/// `SHA-256(label || master_secret)`.
fn domain_key(label: &[u8], master_secret: &[u8]) -> [u8; KEY_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(label);
    hasher.update(master_secret);
    hasher.finalize().into()
}

/// Generate a cryptographically random 16-byte salt.
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    fill_random(&mut salt)?;
    Ok(salt)
}
