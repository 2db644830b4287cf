pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod session;
pub mod vault;

pub use errors::{PqVaultError, Result};
pub use session::{ListedSecret, Session, VaultHandle};
