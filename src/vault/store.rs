//! Reading and writing the full entry collection of a vault file.
//!
//! Writes are whole-file replacements: entries are encoded back-to-back,
//! sealed into a fresh container and written via temp-file + rename, so
//! an interrupted write leaves the previous vault intact.
//!
//! Reads are tolerant of damaged records. An entry that fails to decode,
//! or decodes with sizes no genuine record has, is skipped with a warning
//! and the reader resynchronises on the next offset from which the rest
//! of the payload parses as genuine records.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::cipher::{open, seal};
use super::entry::{Entry, EntryShape};
use super::format::VaultContainer;
use crate::crypto::kdf::KdfParams;
use crate::errors::Result;

/// A record that could not be decoded and was left out of a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Byte offset of the record within the decrypted payload.
    pub offset: usize,
    /// Number of bytes skipped.
    pub len: usize,
    /// Why the record was rejected.
    pub reason: String,
}

/// Result of reading a vault: the entries recovered and anything skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadReport {
    pub entries: Vec<Entry>,
    pub skipped: Vec<SkippedRecord>,
}

/// Seal `entries` (in the given order) and replace the file at `path`.
pub fn write_vault(
    entries: &[Entry],
    path: &Path,
    encryption_key: &[u8],
    verification_key: &[u8],
    kdf_params: &KdfParams,
) -> Result<()> {
    let mut plaintext = zeroize::Zeroizing::new(Vec::with_capacity(
        entries.iter().map(Entry::encoded_len).sum(),
    ));
    for entry in entries {
        entry.encode_into(&mut plaintext)?;
    }

    let container = seal(&plaintext, encryption_key, verification_key, kdf_params)?;
    write_container(path, &container)?;

    debug!(path = %path.display(), entries = entries.len(), "Wrote vault");
    Ok(())
}

/// Read and decrypt all entries from `path`.
///
/// A missing file is an empty vault, not an error. Records are expected
/// in the ML-KEM-768 shape. Skipped records are logged at `warn` level;
/// use `read_vault_with_report` to inspect them.
pub fn read_vault(path: &Path, encryption_key: &[u8], verification_key: &[u8]) -> Result<Vec<Entry>> {
    let report =
        read_vault_with_report(path, encryption_key, verification_key, EntryShape::default())?;
    Ok(report.entries)
}

/// Like `read_vault`, but for records of `shape`, also returning the
/// records that were skipped.
pub fn read_vault_with_report(
    path: &Path,
    encryption_key: &[u8],
    verification_key: &[u8],
    shape: EntryShape,
) -> Result<ReadReport> {
    let Some(container) = read_container(path)? else {
        debug!(path = %path.display(), "Vault file does not exist, returning empty entry list");
        return Ok(ReadReport::default());
    };

    let plaintext = zeroize::Zeroizing::new(open(&container, encryption_key, verification_key)?);
    let report = decode_entries(&plaintext, shape);

    for skipped in &report.skipped {
        warn!(
            path = %path.display(),
            offset = skipped.offset,
            len = skipped.len,
            reason = %skipped.reason,
            "Skipped malformed vault entry"
        );
    }

    Ok(report)
}

/// Read and parse the container at `path` without decrypting it.
///
/// Returns `None` if the file does not exist.
pub fn read_container(path: &Path) -> Result<Option<VaultContainer>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    VaultContainer::from_bytes(&data).map(Some)
}

/// Serialize `container` and replace the file at `path` atomically.
pub fn write_container(path: &Path, container: &VaultContainer) -> Result<()> {
    let bytes = container.to_bytes()?;
    write_atomic(path, &bytes)
}

/// Returns `true` if a vault file exists at `path`.
pub fn vault_exists(path: &Path) -> bool {
    path.is_file()
}

/// Irreversibly remove the vault file at `path`.
pub fn delete_vault(path: &Path) -> Result<()> {
    fs::remove_file(path)?;
    debug!(path = %path.display(), "Deleted vault");
    Ok(())
}

/// Decode back-to-back entry records, skipping damaged ones.
///
/// When the record at `offset` fails to decode or does not fit `shape`,
/// the reader skips to the earliest later offset from which the rest of
/// the buffer decodes as a whole number of records of `shape` (or to the
/// end of the buffer).
pub fn decode_entries(payload: &[u8], shape: EntryShape) -> ReadReport {
    let mut report = ReadReport::default();
    let mut offset = 0;

    while offset < payload.len() {
        match decode_genuine(&payload[offset..], shape) {
            Ok((entry, used)) => {
                report.entries.push(entry);
                offset += used;
            }
            Err(e) => {
                let resume = (offset + 1..=payload.len())
                    .find(|&candidate| parses_exactly(&payload[candidate..], shape))
                    .unwrap_or(payload.len());
                report.skipped.push(SkippedRecord {
                    offset,
                    len: resume - offset,
                    reason: e.to_string(),
                });
                offset = resume;
            }
        }
    }

    report
}

/// Decode one record and check it against `shape`.
fn decode_genuine(data: &[u8], shape: EntryShape) -> Result<(Entry, usize)> {
    let (entry, used) = Entry::decode_prefix(data)?;
    shape.check(&entry)?;
    Ok((entry, used))
}

/// `true` if `data` is a whole number of records of `shape`.
fn parses_exactly(data: &[u8], shape: EntryShape) -> bool {
    let mut offset = 0;
    while offset < data.len() {
        match decode_genuine(&data[offset..], shape) {
            Ok((_, used)) => offset += used,
            Err(_) => return false,
        }
    }
    true
}

/// Write `bytes` to a temp file next to `path`, fsync it, then rename it
/// over `path`. Readers never observe a half-written vault.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = temp_path(path);

    let result = (|| -> Result<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// `.<file_name>.tmp` in the same directory, so rename stays on one filesystem.
fn temp_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ))
}
