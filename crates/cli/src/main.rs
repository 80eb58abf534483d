//! Rolelens CLI - Inspect the effective managed policies of an IAM role
//!
//! Usage:
//!   rolelens show <role>                    - Print the role snapshot as JSON
//!   rolelens show <role> --fixture <file>   - Read from an exported account
//!   rolelens -v show <role>                 - Show progress and debug logs

use clap::{Parser, Subcommand};
use cli::commands::ShowCommand;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rolelens")]
#[command(about = "Rolelens - Resolve an IAM role into its attached policy documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show progress and debug logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a role and print its snapshot
    Show(ShowCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Show(cmd) => cmd.run(cli.verbose).await,
    }
}
