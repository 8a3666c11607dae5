/// Entry point for the irobf CLI, a whole-module IR obfuscation driver.
///
/// Modules travel as JSON. The `obfuscate` subcommand drives the eager
/// pass-manager protocol directly from CLI switches; the `pipeline`
/// subcommand parses a textual pass pipeline the way a declarative host
/// would and runs whatever elements this tool claims.
use clap::Parser;
use irobf_cli::commands::{Cmd, Command};

/// Command-line interface for irobf.
#[derive(Parser)]
#[command(name = "irobf")]
#[command(about = "irobf: whole-module IR obfuscation driver")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

/// Runs the irobf CLI with the provided arguments.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    cli.command.execute().await
}
