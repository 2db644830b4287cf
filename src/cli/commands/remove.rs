//! `pqvault remove`: delete a secret from the vault.

use crate::cli::output;
use crate::cli::{confirm, parse_entry_id, Cli, Workspace};
use crate::errors::Result;

/// Execute the `remove` command.
pub fn execute(cli: &Cli, id: &str, force: bool) -> Result<()> {
    let id = parse_entry_id(id)?;

    if !force && !confirm(&format!("Remove secret {id}?"))? {
        output::info("Cancelled.");
        return Ok(());
    }

    let ws = Workspace::current(cli)?;
    let handle = ws.unlock()?;
    handle.remove_secret(id)?;
    handle.lock();

    output::success(&format!("Removed secret {id}"));

    Ok(())
}
