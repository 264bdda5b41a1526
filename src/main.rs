//! zipkit - local host for the zip/unzip plugin tools

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use zip_tools::{MessageStream, ToolParameters, ToolsetConfig, ZipToolset, UNZIP_TOOL, ZIP_TOOL};

mod cli;
mod local_host;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => ToolsetConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ToolsetConfig::default(),
    };

    match cli.command {
        Commands::Zip { output, name, inputs } => {
            let files = local_host::collect_files(&inputs)?;
            println!("zipkit - Creating archive from {} files", files.len());

            let mut params = ToolParameters::new().with_files("files", &files);
            if let Some(name) = name {
                params = params.with("file_name", name);
            }

            let toolset = ZipToolset::new(config)?;
            let stream = toolset.invoke(ZIP_TOOL, &params)?;
            let written = deliver(stream, &output)?;

            println!("Archive creation complete!");
            println!("Output: {}", output.display());
            debug!("Wrote {} blob(s)", written);
            Ok(())
        }

        Commands::Unzip { archive, output, expand_nested, sniff } => {
            config.expand_nested_archives |= expand_nested;
            config.sniff_content |= sniff;

            let file = local_host::load_archive(&archive)?;
            println!("Extracting archive: {} to {}", archive.display(), output.display());

            let params = ToolParameters::new().with_file("file", &file);
            let toolset = ZipToolset::new(config)?;
            let stream = toolset.invoke(UNZIP_TOOL, &params)?;
            let written = deliver(stream, &output)?;

            println!("Extraction complete!");
            println!("  Extracted: {} files", written);
            Ok(())
        }

        Commands::Tools => {
            let toolset = ZipToolset::new(config)?;
            let listing = serde_json::json!({
                "toolset": toolset.meta(),
                "tools": toolset.descriptors(),
            });
            println!("{}", serde_json::to_string_pretty(&listing)?);
            Ok(())
        }
    }
}

/// Consume a tool's message stream, writing each blob under `output`.
fn deliver(stream: MessageStream, output: &Path) -> Result<usize> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} files {msg}")?,
    );

    let mut written = 0;
    for message in stream {
        let message = message?;
        let path = local_host::write_blob(output, &message)?;
        debug!("{} -> {} ({})", message.meta.filename, path.display(), message.meta.mime_type);

        written += 1;
        pb.set_position(written as u64);
        pb.set_message(message.meta.filename);
    }

    pb.finish_with_message("Complete");
    Ok(written)
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
