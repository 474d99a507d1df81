//! Convert Siemens PMU logs to BIDS physiology files
//!
//! # Usage
//!
//! ```bash
//! # one log, revision detected from the file
//! pmu2bidsphysio -i Physio_sample.puls -b sub-01/func/sub-01_task-rest
//!
//! # several logs of one run, forcing the revision
//! pmu2bidsphysio -i run1.puls run1.resp run1.ext -b sub-01_task-rest -v VE11C
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use bidsphysio::{convert_pmu, ConversionOptions, PmuRevision, DEFAULT_SAMPLING_RATE_TOLERANCE};

/// Siemens PMU to BIDS physiology converter
#[derive(Parser, Debug)]
#[command(name = "pmu2bidsphysio")]
#[command(author, version, about = "Convert Siemens PMU logs to BIDS physiology files", long_about = None)]
struct Cli {
    /// PMU log files (.puls, .resp, .ecg, .ext)
    #[arg(short = 'i', long = "infiles", required = true, num_args = 1..)]
    infiles: Vec<PathBuf>,

    /// Prefix of the BIDS output files
    #[arg(short = 'b', long = "bidsprefix")]
    bids_prefix: PathBuf,

    /// PMU revision: VE11C, VB15A or VBX (detected when omitted)
    #[arg(short = 'v', long = "revision")]
    revision: Option<PmuRevision>,

    /// Relative tolerance of the sampling-rate check, in (0, 1)
    #[arg(long, default_value_t = DEFAULT_SAMPLING_RATE_TOLERANCE)]
    tolerance: f64,

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

    info!("pmu2bidsphysio v{}", bidsphysio::version());

    let mut options = ConversionOptions::default().with_tolerance(cli.tolerance);
    if let Some(revision) = cli.revision {
        options = options.with_revision(revision);
    }

    let output = convert_pmu(cli.infiles.as_slice(), &cli.bids_prefix, &options)
        .with_context(|| format!("converting {} PMU file(s)", cli.infiles.len()))?;

    for path in &output.written {
        info!("Saved {}", path.display());
    }
    if !output.diagnostics.is_empty() {
        info!("Finished with {} warning(s)", output.diagnostics.len());
    }
    Ok(())
}
