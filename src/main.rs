use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use outliner::compdb::CompilationDatabase;
use outliner::relocate::Relocator;

/// Move inline function bodies out of a C++ header into its companion
/// implementation file.
#[derive(Parser)]
#[command(name = "outliner", version, about)]
struct Cli {
    /// Directory containing compile_commands.json
    compilation_database: PathBuf,

    /// Header files to process (only the first is handled per invocation)
    #[arg(required = true)]
    headers: Vec<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.headers.len() > 1 {
        tracing::warn!(
            "{} headers given; only the first is processed",
            cli.headers.len()
        );
    }

    let compdb = CompilationDatabase::from_directory(&cli.compilation_database)?;
    Relocator::new(compdb).relocate_file(&cli.headers[0])
}
