//! # BIDS physiology conversion
//!
//! Converts physiological recordings acquired alongside MRI scans into the
//! BIDS physiology layout: one `_physio.json` sidecar plus one headerless,
//! gzip-compressed `_physio.tsv.gz` table per group of signals that share
//! a sampling rate and start time.
//!
//! Two acquisition sources are supported:
//!
//! - **Siemens PMU logs** (`.puls`, `.resp`, `.ecg`, `.ext`) in the VE11C,
//!   VB15A and VBX revisions, see [`pmu`]
//! - **EyeLink eye-tracker recordings** decoded to JSON, see [`eyelink`]
//!
//! Start times are expressed relative to the first scanner trigger, which is
//! recovered from in-band PMU markers or from an analog trigger channel.
//!
//! ## Quick Start
//!
//! ### Converting PMU logs
//!
//! ```rust
//! use bidsphysio::{convert_pmu, ConversionOptions};
//!
//! # let dir = tempfile::tempdir()?;
//! # let puls = dir.path().join("sample.puls");
//! # bidsphysio::doctest_utils::write_ve11c_puls_log(&puls)?;
//! let prefix = dir.path().join("sub-01/func/sub-01_task-rest");
//! let output = convert_pmu(&[&puls], &prefix, &ConversionOptions::default())?;
//!
//! // cardiac + trigger columns in one file pair
//! assert_eq!(output.written.len(), 2);
//! assert!(output.diagnostics.is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Building and exporting signals by hand
//!
//! ```rust
//! use bidsphysio::{BidsPhysioReader, PhysioData, PhysioSignal, PhysioWriter};
//!
//! # let dir = tempfile::tempdir()?;
//! let mut physio = PhysioData::new();
//! physio.append_signal(PhysioSignal::new("cardiac", 4.0, 0.0, vec![1.0, 2.0, 3.0, 4.0]));
//! physio.append_signal(PhysioSignal::new("trigger", 4.0, 0.0, vec![0.0, 1.0, 0.0, 0.0]));
//! physio.set_neural_start_time(0.25);
//!
//! let written = PhysioWriter::new(dir.path().join("sub-01")).save_to_bids(&physio)?;
//! let reader = BidsPhysioReader::open(&written[0])?;
//! assert_eq!(reader.sidecar().start_time, -0.25);
//! assert_eq!(reader.sidecar().columns, vec!["cardiac", "trigger"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Features
//!
//! - PMU revision detection with per-revision readers
//! - Sampling-rate validation against the log timing tags
//! - Histogram-based digitization of analog trigger channels
//! - Gap filling for irregularly sampled eye-tracker data
//! - Fixation, saccade and blink columns from eye events
//! - Task messages exported as a BIDS events table

pub mod error;
pub mod events;
pub mod eyelink;
pub mod physio;
pub mod pmu;
pub mod reader;
pub mod trigger;
pub mod types;
pub mod utils;
pub mod writer;

#[doc(hidden)]
pub mod doctest_utils;

pub use error::{FormatError, PhysioError, Result};
pub use events::EventData;
pub use eyelink::{convert_eyelink, edf2bids, edfevents2bids, EyelinkRecording};
pub use physio::PhysioData;
pub use pmu::{convert_pmu, pmu2bids, read_pmu, ParsedLog};
pub use reader::{BidsPhysioReader, PhysioSidecar};
pub use types::{
    ConversionOptions, ConversionOutput, Diagnostics, Event, PhysioSignal, PmuRevision, Warning,
};
pub use writer::{PhysioWriter, SignalGroup};

/// Relative tolerance between a declared sampling rate and the log timing
pub const DEFAULT_SAMPLING_RATE_TOLERANCE: f64 = 0.1;

/// Label of the scanner trigger channel
pub const TRIGGER_LABEL: &str = "trigger";

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
