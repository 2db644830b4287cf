//! `pqvault version`: display version and algorithm information.

use console::style;

use crate::crypto::{Kem, MlKem768};
use crate::errors::Result;

/// Execute the `version` command.
pub fn execute() -> Result<()> {
    let current = env!("CARGO_PKG_VERSION");
    println!("pqvault {current}");
    println!(
        "{} {} + AES-256-GCM, Argon2id, HMAC-SHA256",
        style("crypto:").dim(),
        MlKem768.name()
    );

    Ok(())
}
