//! Vault module: the encrypted on-disk storage engine.
//!
//! This module provides:
//! - `Entry` records and their binary codec (`entry`)
//! - The binary container layout (`format`)
//! - Payload encryption and integrity tagging (`cipher`)
//! - Whole-vault read/write with damaged-record tolerance (`store`)

pub mod cipher;
pub mod entry;
pub mod format;
pub mod store;

// Re-export the most commonly used items.
pub use entry::{Entry, EntryId};
pub use format::VaultContainer;
pub use store::{
    delete_vault, read_vault, read_vault_with_report, vault_exists, write_vault, ReadReport,
    SkippedRecord,
};
