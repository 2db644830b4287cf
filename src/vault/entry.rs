//! Entry records and their binary codec.
//!
//! One entry is one encrypted secret value. Its wire layout, repeated
//! back-to-back inside the decrypted vault payload, is:
//!
//! ```text
//! id(8, BE) | kem_len(2, BE) | kem_ciphertext | nonce(12) | cipher_len(2, BE) | ciphertext
//! ```

use std::fmt;

use crate::crypto::encryption::TAG_LEN;
use crate::crypto::{fill_random, Kem, MlKem768, NONCE_LEN};
use crate::errors::{PqVaultError, Result};

/// Smallest possible record: both variable fields empty.
pub const MIN_ENTRY_LEN: usize = 8 + 2 + NONCE_LEN + 2;

/// The field sizes a genuine record has under one KEM.
///
/// KEM ciphertexts have a fixed length and every AEAD ciphertext carries
/// at least its tag, so a record that decodes but breaks either rule was
/// not written by this vault. The reader uses this to tell real record
/// boundaries from offsets inside a damaged record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryShape {
    pub kem_ciphertext_len: usize,
}

impl EntryShape {
    /// The shape of records sealed with `kem`.
    pub fn of(kem: &dyn Kem) -> Self {
        Self {
            kem_ciphertext_len: kem.ciphertext_len(),
        }
    }

    /// Check that `entry` has the sizes a genuine record would have.
    pub fn check(&self, entry: &Entry) -> Result<()> {
        if entry.encapsulated_secret.len() != self.kem_ciphertext_len {
            return Err(PqVaultError::MalformedEntry(format!(
                "KEM ciphertext is {} bytes, expected {}",
                entry.encapsulated_secret.len(),
                self.kem_ciphertext_len
            )));
        }
        if entry.ciphertext.len() < TAG_LEN {
            return Err(PqVaultError::MalformedEntry(format!(
                "ciphertext is {} bytes, shorter than the {TAG_LEN}-byte AEAD tag",
                entry.ciphertext.len()
            )));
        }
        Ok(())
    }
}

impl Default for EntryShape {
    /// ML-KEM-768, the KEM new vaults are sealed with.
    fn default() -> Self {
        Self::of(&MlKem768)
    }
}

/// Identifier of an entry, unique within one vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u64);

impl EntryId {
    /// Draw a new id from the OS random source.
    pub fn random() -> Result<Self> {
        let mut bytes = [0u8; 8];
        fill_random(&mut bytes)?;
        Ok(Self(u64::from_be_bytes(bytes)))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl std::str::FromStr for EntryId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        u64::from_str_radix(s, 16).map(Self)
    }
}

/// A single encrypted secret stored in the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: EntryId,

    /// The KEM ciphertext carrying this entry's AES key.
    pub encapsulated_secret: Vec<u8>,

    /// AES-256-GCM nonce, fresh per encryption.
    pub nonce: [u8; NONCE_LEN],

    /// AES-256-GCM ciphertext + tag of the secret value.
    pub ciphertext: Vec<u8>,
}

impl Entry {
    /// Size of this entry once encoded.
    pub fn encoded_len(&self) -> usize {
        MIN_ENTRY_LEN + self.encapsulated_secret.len() + self.ciphertext.len()
    }

    /// Encode to the wire layout.
    ///
    /// Fails only if a variable field does not fit its 16-bit length prefix.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out)?;
        Ok(out)
    }

    /// Append the encoded entry to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<()> {
        let kem_len = field_len("encapsulated_secret", &self.encapsulated_secret)?;
        let cipher_len = field_len("ciphertext", &self.ciphertext)?;

        out.extend_from_slice(&self.id.0.to_be_bytes());
        out.extend_from_slice(&kem_len.to_be_bytes());
        out.extend_from_slice(&self.encapsulated_secret);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&cipher_len.to_be_bytes());
        out.extend_from_slice(&self.ciphertext);
        Ok(())
    }

    /// Decode exactly one entry occupying all of `data`.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let (entry, used) = Self::decode_prefix(data)?;
        if used != data.len() {
            return Err(PqVaultError::TrailingEntryBytes {
                extra: data.len() - used,
            });
        }
        Ok(entry)
    }

    /// Decode one entry from the front of `data`.
    ///
    /// Returns the entry and the number of bytes it occupied. Fails with
    /// `TruncatedEntry` when a declared length runs past the buffer.
    pub fn decode_prefix(data: &[u8]) -> Result<(Self, usize)> {
        let mut reader = Reader { data, pos: 0 };

        let id = u64::from_be_bytes(reader.array::<8>()?);
        let kem_len = u16::from_be_bytes(reader.array::<2>()?);
        let encapsulated_secret = reader.take(usize::from(kem_len))?.to_vec();
        let nonce = reader.array::<NONCE_LEN>()?;
        let cipher_len = u16::from_be_bytes(reader.array::<2>()?);
        let ciphertext = reader.take(usize::from(cipher_len))?.to_vec();

        let entry = Self {
            id: EntryId(id),
            encapsulated_secret,
            nonce,
            ciphertext,
        };
        Ok((entry, reader.pos))
    }
}

fn field_len(field: &'static str, bytes: &[u8]) -> Result<u16> {
    u16::try_from(bytes.len()).map_err(|_| PqVaultError::EntryTooLarge {
        field,
        len: bytes.len(),
    })
}

/// Bounds-checked cursor over a byte slice.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let available = self.data.len() - self.pos;
        if n > available {
            return Err(PqVaultError::TruncatedEntry {
                needed: self.pos + n,
                available: self.data.len(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Entry {
        Entry {
            id: EntryId(0x0102_0304_0506_0708),
            encapsulated_secret: vec![0xAA; 5],
            nonce: [0xBB; NONCE_LEN],
            ciphertext: vec![0xCC; 3],
        }
    }

    #[test]
    fn encode_layout_is_big_endian() {
        let bytes = sample().encode().unwrap();
        assert_eq!(bytes.len(), MIN_ENTRY_LEN + 5 + 3);
        assert_eq!(&bytes[..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&bytes[8..10], &[0, 5]);
        assert_eq!(&bytes[10..15], &[0xAA; 5]);
        assert_eq!(&bytes[15..27], &[0xBB; 12]);
        assert_eq!(&bytes[27..29], &[0, 3]);
        assert_eq!(&bytes[29..], &[0xCC; 3]);
    }

    #[test]
    fn decode_inverts_encode() {
        let entry = sample();
        assert_eq!(Entry::decode(&entry.encode().unwrap()).unwrap(), entry);
    }

    #[test]
    fn empty_fields_roundtrip() {
        let entry = Entry {
            id: EntryId(0),
            encapsulated_secret: Vec::new(),
            nonce: [0; NONCE_LEN],
            ciphertext: Vec::new(),
        };
        let bytes = entry.encode().unwrap();
        assert_eq!(bytes.len(), MIN_ENTRY_LEN);
        assert_eq!(Entry::decode(&bytes).unwrap(), entry);
    }

    #[test]
    fn decode_prefix_reports_consumed_length() {
        let mut stream = sample().encode().unwrap();
        let first_len = stream.len();
        stream.extend_from_slice(&[0xFF; 7]);

        let (entry, used) = Entry::decode_prefix(&stream).unwrap();
        assert_eq!(entry, sample());
        assert_eq!(used, first_len);
    }

    #[test]
    fn overlong_declared_length_is_truncated_entry() {
        let mut bytes = sample().encode().unwrap();
        bytes[8] = 0xFF;
        bytes[9] = 0xFF;
        let result = Entry::decode(&bytes);
        assert!(matches!(result, Err(PqVaultError::TruncatedEntry { .. })));
    }

    #[test]
    fn short_buffer_is_truncated_entry() {
        let result = Entry::decode(&[0u8; 5]);
        assert!(matches!(result, Err(PqVaultError::TruncatedEntry { .. })));
    }

    #[test]
    fn trailing_bytes_rejected_by_decode() {
        let mut bytes = sample().encode().unwrap();
        bytes.extend_from_slice(&[0, 0, 0]);
        let err = Entry::decode(&bytes).unwrap_err();
        assert!(matches!(err, PqVaultError::TrailingEntryBytes { extra: 3 }));
        assert!(err.to_string().contains("3 unexpected trailing bytes"));
    }

    #[test]
    fn shape_accepts_genuine_sizes() {
        let shape = EntryShape {
            kem_ciphertext_len: 5,
        };
        let entry = Entry {
            ciphertext: vec![0xCC; TAG_LEN],
            ..sample()
        };
        assert!(shape.check(&entry).is_ok());
    }

    #[test]
    fn shape_rejects_wrong_kem_length_and_short_ciphertext() {
        let shape = EntryShape {
            kem_ciphertext_len: 6,
        };
        let wrong_kem = Entry {
            ciphertext: vec![0xCC; TAG_LEN],
            ..sample()
        };
        assert!(matches!(
            shape.check(&wrong_kem),
            Err(PqVaultError::MalformedEntry(_))
        ));

        let shape = EntryShape {
            kem_ciphertext_len: 5,
        };
        // `sample()` has a 3-byte ciphertext, too short to hold a tag.
        assert!(matches!(
            shape.check(&sample()),
            Err(PqVaultError::MalformedEntry(_))
        ));
    }

    #[test]
    fn default_shape_is_mlkem768() {
        assert_eq!(EntryShape::default().kem_ciphertext_len, 1088);
    }

    #[test]
    fn oversized_field_cannot_be_encoded() {
        let entry = Entry {
            ciphertext: vec![0; usize::from(u16::MAX) + 1],
            ..sample()
        };
        assert!(matches!(
            entry.encode(),
            Err(PqVaultError::EntryTooLarge { field: "ciphertext", .. })
        ));
    }

    #[test]
    fn entry_id_hex_roundtrip() {
        let id = EntryId(0xDEAD_BEEF);
        assert_eq!(id.to_string(), "00000000deadbeef");
        assert_eq!("00000000deadbeef".parse::<EntryId>().unwrap(), id);
    }
}
