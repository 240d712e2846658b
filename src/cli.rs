//! Command-line interface (spec.md §6, grounded on the original's
//! `argparse` flag set in `configure()`).

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "gk2a-xrit")]
#[command(about = "LRIT/HRIT downlink processor for the GEO-KOMPSAT-2A weather satellite")]
pub struct Cli {
    /// Enable verbose (debug-level) console output
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to configuration file
    #[arg(long, default_value = "gk2a-xrit.toml")]
    pub config: PathBuf,

    /// Replay a recorded VCDU packet file instead of a live source
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Write every VCDU received to this file
    #[arg(long)]
    pub dump: Option<PathBuf>,

    /// Pause the main thread instead of exiting once the source is exhausted
    #[arg(long = "no-exit")]
    pub no_exit: bool,
}
