//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::session::ListedSecret;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of secrets (Id, Value).
///
/// Values are masked unless `reveal` is set. Entries that failed to
/// decrypt are shown as such instead of being dropped.
pub fn print_secrets_table(secrets: &[ListedSecret], reveal: bool) {
    if secrets.is_empty() {
        info("No secrets in this vault yet.");
        tip("Run `pqvault add` to add your first secret.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Value"]);

    for s in secrets {
        table.add_row(vec![s.id.to_string(), display_value(s, reveal)]);
    }

    println!("{table}");
}

fn display_value(secret: &ListedSecret, reveal: bool) -> String {
    match secret.plaintext() {
        Some(bytes) if reveal => String::from_utf8_lossy(bytes).into_owned(),
        Some(_) => "********".to_string(),
        None => style("<undecryptable>").red().to_string(),
    }
}
