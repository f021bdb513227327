use std::path::PathBuf;

use clap::Parser;

/// Validator-side batch construction daemon for the corridor bridge.
#[derive(Debug, Parser)]
#[command(name = "corridor-batcherd", version)]
pub(crate) struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    pub(crate) config: PathBuf,
}
