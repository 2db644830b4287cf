//! `pqvault init`: create the KEM keypair and a new, empty vault.

use std::fs;

use crate::cli::output;
use crate::cli::{prompt_new_password, Cli, Workspace};
use crate::errors::{PqVaultError, Result};

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let ws = Workspace::current(cli)?;

    // 1. Refuse to clobber an existing vault.
    if ws.vault_path.exists() {
        output::tip("Use `pqvault add` to add secrets to the existing vault.");
        return Err(PqVaultError::VaultAlreadyExists(ws.vault_path));
    }

    // 2. Create the vault directory if it doesn't exist.
    if let Some(dir) = ws.vault_path.parent() {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            output::info(&format!("Created vault directory: {}", dir.display()));
        }
    }

    // 3. Prompt for a new password (with confirmation).
    let password = prompt_new_password()?;

    // 4. Load or generate the keypair, then create the vault file.
    let session = ws.session()?;
    let handle = session.create_vault(&ws.vault_path, password.as_bytes())?;
    handle.lock();

    output::success(&format!("Vault created at {}", ws.vault_path.display()));
    output::warning(&format!(
        "Back up {}: without it no secret in this vault can be recovered.",
        ws.secret_key_path.display()
    ));

    output::tip("Run `pqvault add` to add a secret.");
    output::tip("Run `pqvault list` to see all secrets.");

    Ok(())
}
