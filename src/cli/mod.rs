//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::crypto::{Kem, KemKeypair, MlKem768};
use crate::errors::{PqVaultError, Result};
use crate::session::{Session, VaultHandle};

/// Minimum password length to prevent trivially weak passwords.
const MIN_PASSWORD_LEN: usize = 8;

/// Environment variable consulted for the master password before prompting.
pub const PASSWORD_ENV: &str = "PQVAULT_PASSWORD";

/// PqVault CLI: post-quantum encrypted credential vault.
#[derive(Parser)]
#[command(
    name = "pqvault",
    about = "Post-quantum encrypted credential vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault directory (overrides `vault_dir` in .pqvault.toml)
    #[arg(long, global = true)]
    pub vault_dir: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new vault and KEM keypair
    Init,

    /// Add a secret
    Add {
        /// Secret value (omit for interactive prompt or piped stdin)
        value: Option<String>,
    },

    /// List all secrets
    List {
        /// Show decrypted values instead of masking them
        #[arg(long)]
        reveal: bool,
    },

    /// Print a secret's value
    Get {
        /// Entry id (16 hex digits, as shown by `list`)
        id: String,
    },

    /// Remove a secret
    Remove {
        /// Entry id
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Irreversibly delete the vault file
    Destroy {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Show version information
    Version,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolved on-disk locations for one project.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub settings: Settings,
    pub vault_path: PathBuf,
    pub public_key_path: PathBuf,
    pub secret_key_path: PathBuf,
}

impl Workspace {
    /// Resolve paths from `.pqvault.toml` in `project_dir` and CLI overrides.
    pub fn resolve(cli: &Cli, project_dir: &Path) -> Result<Self> {
        let mut settings = Settings::load(project_dir)?;
        if let Some(dir) = &cli.vault_dir {
            settings.vault_dir = dir.clone();
        }

        let vault_path = settings.vault_path(project_dir);
        let (public_key_path, secret_key_path) = settings.keypair_paths(project_dir);

        Ok(Self {
            settings,
            vault_path,
            public_key_path,
            secret_key_path,
        })
    }

    /// Resolve paths relative to the current directory.
    pub fn current(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::resolve(cli, &cwd)
    }

    /// Build a session, loading the keypair or generating it on first run.
    pub fn session(&self) -> Result<Session> {
        let kem: Arc<dyn Kem> = Arc::new(MlKem768);
        let keypair =
            KemKeypair::load_or_generate(kem.as_ref(), &self.public_key_path, &self.secret_key_path)?;
        Ok(self.session_with(kem, keypair))
    }

    /// Build a session for an existing vault.
    ///
    /// The keypair must already be on disk. A missing key file is a
    /// `KeypairError`; a fresh keypair could not open any stored entry.
    pub fn existing_session(&self) -> Result<Session> {
        let kem: Arc<dyn Kem> = Arc::new(MlKem768);
        let keypair = KemKeypair::load(kem.as_ref(), &self.public_key_path, &self.secret_key_path)?;
        Ok(self.session_with(kem, keypair))
    }

    fn session_with(&self, kem: Arc<dyn Kem>, keypair: KemKeypair) -> Session {
        Session::new(kem, keypair).with_kdf_cost(self.settings.argon2_params())
    }

    /// Prompt for the master password and unlock the vault.
    pub fn unlock(&self) -> Result<VaultHandle> {
        if !self.vault_path.exists() {
            output::tip("Run `pqvault init` to create a vault.");
            return Err(PqVaultError::VaultNotFound(self.vault_path.clone()));
        }

        let session = match self.existing_session() {
            Ok(session) => session,
            Err(e) => {
                output::tip("Restore the KEM keypair files from a backup.");
                return Err(e);
            }
        };
        let password = prompt_password()?;
        session
            .unlock_vault(&self.vault_path, password.as_bytes())
            .map_err(generic_unlock_error)
    }
}

/// Collapse every reason an unlock can fail into the one generic error.
///
/// A wrong password and a damaged file must render the same message.
pub fn generic_unlock_error(err: PqVaultError) -> PqVaultError {
    match err {
        PqVaultError::IntegrityViolation
        | PqVaultError::DecryptionFailed
        | PqVaultError::TruncatedContainer(_)
        | PqVaultError::UnsupportedVersion(_)
        | PqVaultError::UnsupportedKdfVersion(_)
        | PqVaultError::InvalidKdfParams(_)
        | PqVaultError::KeyDerivationFailed(_) => PqVaultError::IntegrityViolation,
        other => other,
    }
}

/// Get the vault password, trying in order:
/// 1. `PQVAULT_PASSWORD` env var (scripts, CI)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter vault password")
        .interact()
        .map_err(|e| PqVaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new password with confirmation (used during `init`).
///
/// Also respects `PQVAULT_PASSWORD` for scripted usage.
/// Enforces a minimum password length.
pub fn prompt_new_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        check_password_len(&pw)?;
        return Ok(pw);
    }

    loop {
        let password = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Choose vault password")
                .with_confirmation(
                    "Confirm vault password",
                    "Passwords do not match, try again",
                )
                .interact()
                .map_err(|e| PqVaultError::CommandFailed(format!("password prompt: {e}")))?,
        );

        if check_password_len(&password).is_err() {
            output::warning(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(password);
    }
}

/// Ask a yes/no question, defaulting to "no".
pub fn confirm(prompt: &str) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| PqVaultError::CommandFailed(format!("confirm prompt: {e}")))
}

/// Parse an entry id argument.
pub fn parse_entry_id(raw: &str) -> Result<crate::vault::EntryId> {
    raw.parse()
        .map_err(|_| PqVaultError::CommandFailed(format!("'{raw}' is not a valid entry id")))
}

fn password_from_env() -> Option<Zeroizing<String>> {
    match std::env::var(PASSWORD_ENV) {
        Ok(pw) if !pw.is_empty() => Some(Zeroizing::new(pw)),
        _ => None,
    }
}

fn check_password_len(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PqVaultError::CommandFailed(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli(vault_dir: Option<&str>) -> Cli {
        Cli {
            command: Commands::Version,
            vault_dir: vault_dir.map(str::to_string),
        }
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(check_password_len("hunter2").is_err());
        assert!(check_password_len("Tr0ub4dor&3").is_ok());
    }

    #[test]
    fn workspace_uses_default_layout() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::resolve(&cli(None), tmp.path()).unwrap();
        assert_eq!(ws.vault_path, tmp.path().join(".pqvault/vault.pqdb"));
        assert_eq!(ws.secret_key_path, tmp.path().join(".pqvault/kem.key"));
    }

    #[test]
    fn vault_dir_flag_overrides_settings() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(".pqvault.toml"), "vault_dir = \"from-config\"\n").unwrap();

        let ws = Workspace::resolve(&cli(Some("from-flag")), tmp.path()).unwrap();
        assert_eq!(ws.vault_path, tmp.path().join("from-flag/vault.pqdb"));
        assert_eq!(ws.public_key_path, tmp.path().join("from-flag/kem.pub"));
    }

    #[test]
    fn unlock_errors_collapse_to_one_message() {
        let wrong_password = generic_unlock_error(PqVaultError::IntegrityViolation);
        let damaged = generic_unlock_error(PqVaultError::UnsupportedVersion(9));
        assert_eq!(wrong_password.to_string(), damaged.to_string());

        let missing = generic_unlock_error(PqVaultError::VaultNotFound(PathBuf::from("x")));
        assert!(matches!(missing, PqVaultError::VaultNotFound(_)));
    }

    #[test]
    fn existing_session_requires_key_files() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::resolve(&cli(None), tmp.path()).unwrap();

        assert!(matches!(
            ws.existing_session(),
            Err(PqVaultError::KeypairError(_))
        ));
        assert!(!ws.public_key_path.exists());
        assert!(!ws.secret_key_path.exists());
    }

    #[test]
    fn entry_ids_parse_from_hex() {
        assert_eq!(parse_entry_id("00000000000000ff").unwrap().0, 0xff);
        assert!(parse_entry_id("not-hex").is_err());
    }
}
