//! mdgraph CLI - Markdown to HTML with rendered diagrams.
//!
//! Provides commands for:
//! - `convert`: Convert a Markdown document to HTML

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::ConvertArgs;
use output::Diagnostics;

/// mdgraph - Markdown to HTML with rendered diagrams.
#[derive(Parser)]
#[command(name = "mdgraph", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a Markdown document to HTML.
    Convert(ConvertArgs),
}

fn main() {
    let cli = Cli::parse();
    let diagnostics = Diagnostics::new();

    let verbose = matches!(&cli.command, Commands::Convert(args) if args.verbose);

    // --verbose enables INFO level, otherwise RUST_LOG decides
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Convert(args) => args.execute(&diagnostics),
    };

    if let Err(err) = result {
        diagnostics.failure(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
