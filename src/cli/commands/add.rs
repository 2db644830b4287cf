//! `pqvault add`: encrypt a new secret into the vault.

use std::io::{self, IsTerminal, Read};

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{Cli, Workspace};
use crate::errors::{PqVaultError, Result};

/// Execute the `add` command.
pub fn execute(cli: &Cli, value: Option<&str>) -> Result<()> {
    let ws = Workspace::current(cli)?;

    // Unlock first so a wrong password fails before asking for the value.
    let handle = ws.unlock()?;

    let secret = if let Some(v) = value {
        output::warning("Value provided on command line; it may appear in shell history.");
        Zeroizing::new(v.as_bytes().to_vec())
    } else if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        Zeroizing::new(buf.trim_end().as_bytes().to_vec())
    } else {
        let v = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Enter secret value")
                .interact()
                .map_err(|e| PqVaultError::CommandFailed(format!("input prompt: {e}")))?,
        );
        Zeroizing::new(v.as_bytes().to_vec())
    };

    if secret.is_empty() {
        return Err(PqVaultError::CommandFailed("secret value is empty".into()));
    }

    let id = handle.add_secret(&secret)?;
    let total = handle.entry_ids()?.len();
    handle.lock();

    output::success(&format!("Secret {id} added ({total} total)"));
    output::tip(&format!("Run `pqvault get {id}` to read it back."));

    Ok(())
}
