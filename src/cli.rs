//! Command-line interface for zipkit

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "zipkit")]
#[command(about = "zipkit - run the zip/unzip tools against local files", long_about = None)]
pub struct Cli {
    /// JSON toolset configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compress files and directories into one zip archive
    Zip {
        /// Output directory for the archive
        #[arg(short, long)]
        output: PathBuf,

        /// Archive name (".zip" is appended when missing)
        #[arg(short, long)]
        name: Option<String>,

        /// Input files or directories (can be specified multiple times)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Extract every file entry of a zip archive
    Unzip {
        /// Archive to extract
        archive: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Expand zip archives found inside the archive
        #[arg(long)]
        expand_nested: bool,

        /// Sniff magic bytes when the file name gives no content type
        #[arg(long)]
        sniff: bool,
    },

    /// Print the tool descriptors as JSON
    Tools,
}
