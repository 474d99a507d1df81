//! Convert decoded EyeLink recordings to BIDS physiology and events files
//!
//! # Usage
//!
//! ```bash
//! edf2bidsphysio -i recording.json -m eyetracker.json -b sub-01/func/sub-01_task-rest
//!
//! # without fixation/saccade/blink columns, events gzip-compressed
//! edf2bidsphysio -i recording.json -m eyetracker.json -b sub-01_task-rest -e --compress-events
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use bidsphysio::{convert_eyelink, ConversionOptions};

/// EyeLink to BIDS physiology converter
#[derive(Parser, Debug)]
#[command(name = "edf2bidsphysio")]
#[command(author, version, about = "Convert decoded EyeLink recordings to BIDS physiology files", long_about = None)]
struct Cli {
    /// Decoded eye-tracker recording (JSON)
    #[arg(short = 'i', long = "infile")]
    infile: PathBuf,

    /// Path of the eye-tracker metadata JSON referenced from the sidecar
    #[arg(short = 'm', long = "metadata")]
    metadata: Option<String>,

    /// Prefix of the BIDS output files
    #[arg(short = 'b', long = "bidsprefix")]
    bids_prefix: PathBuf,

    /// Skip the fixation, saccade and blink columns
    #[arg(short = 'e', long = "skip-eye-events")]
    skip_eye_events: bool,

    /// Write the events table gzip-compressed
    #[arg(long)]
    compress_events: bool,

    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("edf2bidsphysio v{}", bidsphysio::version());

    let mut options = ConversionOptions::default()
        .with_skip_eye_events(cli.skip_eye_events)
        .with_compress_events(cli.compress_events);
    if let Some(metadata) = cli.metadata {
        options = options.with_metadata_path(metadata);
    }

    let output = convert_eyelink(&cli.infile, &cli.bids_prefix, &options)
        .with_context(|| format!("converting {}", cli.infile.display()))?;

    for path in &output.written {
        info!("Saved {}", path.display());
    }
    if !output.diagnostics.is_empty() {
        info!("Finished with {} warning(s)", output.diagnostics.len());
    }
    Ok(())
}
