//! One module per subcommand, each exposing an `execute` function.

pub mod add;
pub mod destroy;
pub mod get;
pub mod init;
pub mod list;
pub mod remove;
pub mod version;
