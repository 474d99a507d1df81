use std::fmt;
use std::io;
use thiserror::Error;

/// Formats the message carried by a [`FormatError`]
///
/// The file name is quoted after the context; the expected/got pair is only
/// appended when both are known.
///
/// ```rust
/// use bidsphysio::error::errmsg;
///
/// assert_eq!(errmsg("Test", "a.puls", None, None), "Test: 'a.puls'");
/// assert_eq!(
///     errmsg("Test", "a.puls", Some("expected"), Some("foo")),
///     "Test: 'a.puls': Expected: 'expected'; got: 'foo'"
/// );
/// ```
pub fn errmsg(context: &str, file: &str, expected: Option<&str>, got: Option<&str>) -> String {
    match (expected, got) {
        (Some(e), Some(g)) => format!("{}: '{}': Expected: '{}'; got: '{}'", context, file, e, g),
        _ => format!("{}: '{}'", context, file),
    }
}

/// A log file does not match the vendor revision it was parsed with
///
/// This is the "wrong reader" signal used by the revision dispatch, not a
/// corruption report.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatError {
    pub context: String,
    pub file: String,
    pub expected: Option<String>,
    pub got: Option<String>,
}

impl FormatError {
    pub fn new(context: impl Into<String>, file: impl Into<String>) -> Self {
        FormatError {
            context: context.into(),
            file: file.into(),
            expected: None,
            got: None,
        }
    }

    pub fn expected(mut self, expected: impl Into<String>, got: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.got = Some(got.into());
        self
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&errmsg(
            &self.context,
            &self.file,
            self.expected.as_deref(),
            self.got.as_deref(),
        ))
    }
}

impl std::error::Error for FormatError {}

#[derive(Debug, Error)]
pub enum PhysioError {
    #[error("{0} file not found")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Format(#[from] FormatError),

    #[error("Invalid sample value: {0:?}")]
    InvalidSample(String),

    #[error("tolerance has to be between 0 and 1. Got {0}")]
    InvalidTolerance(f64),

    #[error("The sampling rate does not match the log timing: expected {expected} Hz, observed {observed} Hz")]
    SamplingRateMismatch { expected: f64, observed: f64 },

    #[error("Signal '{label}' has an invalid sampling rate: {rate}")]
    InvalidSamplingRate { label: String, rate: f64 },

    #[error("Signal '{label}' has {samples} samples but {times} sampling times")]
    LengthMismatch { label: String, samples: usize, times: usize },

    #[error("Signals in group {group} disagree on length: expected {expected} rows, got {got}")]
    GroupLengthMismatch { group: usize, expected: usize, got: usize },

    #[error("Signals do not share sampling rate and start time: {0}")]
    InhomogeneousGroup(String),

    #[error("'trigger' is not in list")]
    MissingTrigger,

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, PhysioError>;
