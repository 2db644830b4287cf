use clap::Parser;
use pqvault::cli::{commands, output, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(&cli),
        Commands::Add { ref value } => commands::add::execute(&cli, value.as_deref()),
        Commands::List { reveal } => commands::list::execute(&cli, reveal),
        Commands::Get { ref id } => commands::get::execute(&cli, id),
        Commands::Remove { ref id, force } => commands::remove::execute(&cli, id, force),
        Commands::Destroy { force } => commands::destroy::execute(&cli, force),
        Commands::Version => commands::version::execute(),
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default: warnings and errors only).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
