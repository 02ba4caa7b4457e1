//! Folio CLI - document build toolchain.
//!
//! Provides commands for:
//! - `build`: Run the pipeline and compile the document
//! - `encode`: Print the render URL for a diagram source
//! - `decode`: Print the diagram source behind a token
//! - `patch-tex`: Post-process compiler-generated LaTeX

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, DecodeArgs, EncodeArgs, PatchTexArgs};
use output::Output;

/// Folio - markdown papers with rendered diagrams.
#[derive(Parser)]
#[command(name = "folio", version, about)]
struct Cli {
    /// Enable info-level logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the processed markdown and compile it.
    Build(BuildArgs),
    /// Print the render server URL for a diagram source.
    Encode(EncodeArgs),
    /// Print the diagram source encoded in a token.
    Decode(DecodeArgs),
    /// Post-process a LaTeX file written by the compiler.
    PatchTex(PatchTexArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Build(args) => args.execute(),
        Commands::Encode(args) => args.execute(),
        Commands::Decode(args) => args.execute(),
        Commands::PatchTex(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
