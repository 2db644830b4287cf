use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::Argon2Params;
use crate::errors::{PqVaultError, Result};

/// Project-level configuration, loaded from `.pqvault.toml`.
///
/// Every field has a sensible default so PqVault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to project root) holding the vault and keys.
    #[serde(default = "default_vault_dir")]
    pub vault_dir: String,

    /// Vault file name inside `vault_dir`.
    #[serde(default = "default_vault_file")]
    pub vault_file: String,

    /// KEM public key file name inside `vault_dir`.
    #[serde(default = "default_public_key_file")]
    pub public_key_file: String,

    /// KEM secret key file name inside `vault_dir`.
    #[serde(default = "default_secret_key_file")]
    pub secret_key_file: String,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 1).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u8,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_vault_dir() -> String {
    ".pqvault".to_string()
}

fn default_vault_file() -> String {
    "vault.pqdb".to_string()
}

fn default_public_key_file() -> String {
    "kem.pub".to_string()
}

fn default_secret_key_file() -> String {
    "kem.key".to_string()
}

fn default_argon2_memory_kib() -> u32 {
    Argon2Params::default().memory_kib
}

fn default_argon2_iterations() -> u32 {
    Argon2Params::default().iterations
}

fn default_argon2_parallelism() -> u8 {
    Argon2Params::default().parallelism
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_dir: default_vault_dir(),
            vault_file: default_vault_file(),
            public_key_file: default_public_key_file(),
            secret_key_file: default_secret_key_file(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    const FILE_NAME: &'static str = ".pqvault.toml";

    /// Load settings from `<project_dir>/.pqvault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            PqVaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Directory holding the vault and key files.
    pub fn vault_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.vault_dir)
    }

    /// Full path to the vault file, e.g. `project_dir/.pqvault/vault.pqdb`.
    pub fn vault_path(&self, project_dir: &Path) -> PathBuf {
        self.vault_dir(project_dir).join(&self.vault_file)
    }

    /// Full paths to the KEM `(public, secret)` key files.
    pub fn keypair_paths(&self, project_dir: &Path) -> (PathBuf, PathBuf) {
        let dir = self.vault_dir(project_dir);
        (
            dir.join(&self.public_key_file),
            dir.join(&self.secret_key_file),
        )
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.vault_dir, ".pqvault");
        assert_eq!(s.vault_file, "vault.pqdb");
        assert_eq!(s.argon2_memory_kib, 65_536);
        assert_eq!(s.argon2_iterations, 1);
        assert_eq!(s.argon2_parallelism, 4);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.vault_file, "vault.pqdb");
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
vault_dir = "secrets"
vault_file = "main.pqdb"
argon2_memory_kib = 131072
argon2_iterations = 2
argon2_parallelism = 8
"#;
        fs::write(tmp.path().join(".pqvault.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.vault_dir, "secrets");
        assert_eq!(settings.vault_file, "main.pqdb");
        assert_eq!(settings.argon2_memory_kib, 131_072);
        assert_eq!(settings.argon2_iterations, 2);
        assert_eq!(settings.argon2_parallelism, 8);
        // Unset fields fall back to defaults.
        assert_eq!(settings.public_key_file, "kem.pub");
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".pqvault.toml"), "not valid {{toml").unwrap();

        let result = Settings::load(tmp.path());
        assert!(matches!(result, Err(PqVaultError::ConfigError(_))));
    }

    #[test]
    fn paths_are_built_under_vault_dir() {
        let s = Settings::default();
        let project = Path::new("/home/user/project");
        assert_eq!(
            s.vault_path(project),
            PathBuf::from("/home/user/project/.pqvault/vault.pqdb")
        );
        let (public, secret) = s.keypair_paths(project);
        assert_eq!(public, PathBuf::from("/home/user/project/.pqvault/kem.pub"));
        assert_eq!(secret, PathBuf::from("/home/user/project/.pqvault/kem.key"));
    }
}
