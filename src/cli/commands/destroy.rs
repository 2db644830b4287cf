//! `pqvault destroy`: irreversibly delete the vault file.

use crate::cli::output;
use crate::cli::{confirm, Cli, Workspace};
use crate::errors::{PqVaultError, Result};
use crate::session::Session;

/// Execute the `destroy` command.
///
/// The KEM keypair is left in place; only the vault file is removed.
pub fn execute(cli: &Cli, force: bool) -> Result<()> {
    let ws = Workspace::current(cli)?;

    if !ws.vault_path.exists() {
        return Err(PqVaultError::VaultNotFound(ws.vault_path));
    }

    if !force {
        output::warning("This permanently deletes every secret in the vault.");
        if !confirm(&format!("Destroy {}?", ws.vault_path.display()))? {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    Session::destroy_vault(&ws.vault_path)?;
    output::success(&format!("Destroyed vault at {}", ws.vault_path.display()));

    Ok(())
}
