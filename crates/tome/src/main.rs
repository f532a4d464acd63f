//! Tome CLI - Filesystem-driven page renderer.
//!
//! Provides commands for:
//! - `render`: Resolve a single request and print the response
//! - `routes`: List the page and item trees

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{RenderArgs, RoutesArgs};
use output::Output;

/// Tome - Filesystem-driven page renderer.
#[derive(Parser)]
#[command(name = "tome", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a request path and print the response.
    Render(RenderArgs),
    /// List the logical paths of the page and item trees.
    Routes(RoutesArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = match &cli.command {
        Commands::Render(args) => args.site.verbose,
        Commands::Routes(args) => args.site.verbose,
    };

    // Initialize tracing with appropriate log level
    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let result = rt.block_on(async {
        match cli.command {
            Commands::Render(args) => args.execute().await,
            Commands::Routes(args) => args.execute().await,
        }
    });

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
