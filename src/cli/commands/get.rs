//! `pqvault get`: retrieve and print a single secret's value.

use std::io::Write;

use crate::cli::{parse_entry_id, Cli, Workspace};
use crate::errors::Result;

/// Execute the `get` command.
pub fn execute(cli: &Cli, id: &str) -> Result<()> {
    let id = parse_entry_id(id)?;
    let ws = Workspace::current(cli)?;
    let handle = ws.unlock()?;

    let value = handle.get_secret(id)?;
    handle.lock();

    // Raw bytes to stdout so non-UTF-8 secrets survive piping.
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&value)?;
    stdout.write_all(b"\n")?;

    Ok(())
}
