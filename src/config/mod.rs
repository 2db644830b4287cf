//! Configuration loaded from `.pqvault.toml`.

pub mod settings;

pub use settings::Settings;
