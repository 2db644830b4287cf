//! `pqvault list`: display all secrets in a table.

use crate::cli::output;
use crate::cli::{Cli, Workspace};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli, reveal: bool) -> Result<()> {
    let ws = Workspace::current(cli)?;
    let handle = ws.unlock()?;

    let secrets = handle.list_secrets()?;
    handle.lock();

    output::info(&format!("{} secret(s)", secrets.len()));
    output::print_secrets_table(&secrets, reveal);

    let failed = secrets.iter().filter(|s| s.value.is_err()).count();
    if failed > 0 {
        output::warning(&format!("{failed} secret(s) could not be decrypted."));
    }

    Ok(())
}
