//! CLI argument parsing via clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Upload files and manage stored file records.
#[derive(Debug, Parser)]
#[command(name = "uplink", version)]
pub struct Args {
    /// Path to config file (default: ./uplink.toml or ~/.config/uplink/uplink.toml).
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<String>,

    /// Enable debug logging.
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Upload a file and print the stored record.
    Upload { path: PathBuf },
    /// Print a stored file record.
    Get { file_id: String },
    /// Delete a stored file.
    Delete { file_id: String },
    /// Print a preview or download address.
    Link {
        filename: String,
        /// Link to the inline preview instead of the download.
        #[arg(long)]
        preview: bool,
        /// Append session credentials to the address.
        #[arg(long = "with-auth")]
        with_auth: bool,
    },
    /// Format a byte count.
    Size { bytes: u64 },
}
