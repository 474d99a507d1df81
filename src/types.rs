use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{PhysioError, Result};
use crate::DEFAULT_SAMPLING_RATE_TOLERANCE;

/// Siemens PMU log revisions, in the order the dispatcher tries them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PmuRevision {
    Ve11c,
    Vb15a,
    Vbx,
}

impl PmuRevision {
    /// Candidate order used when the revision is not known up front
    pub const DISPATCH_ORDER: [PmuRevision; 3] =
        [PmuRevision::Ve11c, PmuRevision::Vb15a, PmuRevision::Vbx];

    pub fn name(&self) -> &'static str {
        match self {
            PmuRevision::Ve11c => "VE11C",
            PmuRevision::Vb15a => "VB15A",
            PmuRevision::Vbx => "VBX",
        }
    }
}

impl fmt::Display for PmuRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PmuRevision {
    type Err = PhysioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VE11C" => Ok(PmuRevision::Ve11c),
            "VB15A" => Ok(PmuRevision::Vb15a),
            "VBX" => Ok(PmuRevision::Vbx),
            other => Err(PhysioError::InvalidFormat(format!("Unknown PMU revision: {}", other))),
        }
    }
}

/// One channel of a physiological recording
///
/// Sampling times are derived from `physio_start_time` and
/// `samples_per_second` unless they were supplied explicitly with
/// [`PhysioSignal::with_sampling_times`] (irregular recordings such as
/// eye-tracker samples with dropouts).
///
/// # Examples
///
/// ```rust
/// use bidsphysio::PhysioSignal;
///
/// let signal = PhysioSignal::new("cardiac", 4.0, 10.0, vec![0.0; 4]);
/// assert_eq!(signal.sampling_times().as_ref(), &[10.0, 10.25, 10.5, 10.75]);
/// assert_eq!(signal.t_start(), 10.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PhysioSignal {
    pub label: String,
    pub units: String,
    pub samples_per_second: f64,
    /// 第一个样本在生理时钟上的时间（秒）
    pub physio_start_time: f64,
    /// 第一个触发在同一时钟上的时间（秒）
    pub neural_start_time: Option<f64>,
    sampling_times: Option<Vec<f64>>,
    pub signal: Vec<f64>,
}

impl PhysioSignal {
    pub fn new(
        label: impl Into<String>,
        samples_per_second: f64,
        physio_start_time: f64,
        signal: Vec<f64>,
    ) -> Self {
        PhysioSignal {
            label: label.into(),
            units: String::new(),
            samples_per_second,
            physio_start_time,
            neural_start_time: None,
            sampling_times: None,
            signal,
        }
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    /// Attaches explicit per-sample timestamps
    ///
    /// # Errors
    ///
    /// * `PhysioError::LengthMismatch` - `times` and the samples differ in length
    pub fn with_sampling_times(mut self, times: Vec<f64>) -> Result<Self> {
        if times.len() != self.signal.len() {
            return Err(PhysioError::LengthMismatch {
                label: self.label,
                samples: self.signal.len(),
                times: times.len(),
            });
        }
        self.sampling_times = Some(times);
        Ok(self)
    }

    pub fn samples_count(&self) -> usize {
        self.signal.len()
    }

    pub fn sampling_times(&self) -> Cow<'_, [f64]> {
        match &self.sampling_times {
            Some(times) => Cow::Borrowed(times),
            None => Cow::Owned(
                (0..self.signal.len())
                    .map(|i| self.physio_start_time + i as f64 / self.samples_per_second)
                    .collect(),
            ),
        }
    }

    /// Start time relative to the first trigger, as exported in `StartTime`
    pub fn t_start(&self) -> f64 {
        self.physio_start_time - self.neural_start_time.unwrap_or(0.0)
    }

    /// Builds a 0/1 series on this signal's timeline from trigger times
    ///
    /// Only triggers inside the recording are kept; each one marks the first
    /// sample at or after it.
    pub fn calculate_trigger_events(&self, trigger_times: &[f64]) -> Vec<f64> {
        let times = self.sampling_times();
        let mut events = vec![0.0; times.len()];
        let (first, last) = match (times.first(), times.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return events,
        };

        for &t in trigger_times.iter().filter(|&&t| t >= first && t <= last) {
            let idx = times.partition_point(|&s| s < t);
            if idx < events.len() {
                events[idx] = 1.0;
            }
        }
        events
    }

    /// A `trigger` signal sharing this signal's timing
    pub fn matching_trigger_signal(&self, trigger_signal: Vec<f64>) -> PhysioSignal {
        PhysioSignal {
            label: crate::TRIGGER_LABEL.to_string(),
            units: String::new(),
            samples_per_second: self.samples_per_second,
            physio_start_time: self.physio_start_time,
            neural_start_time: self.neural_start_time,
            sampling_times: self.sampling_times.clone(),
            signal: trigger_signal,
        }
    }

    /// Same timing, new values
    pub(crate) fn with_values(&self, signal: Vec<f64>) -> PhysioSignal {
        PhysioSignal {
            label: self.label.clone(),
            units: self.units.clone(),
            samples_per_second: self.samples_per_second,
            physio_start_time: self.physio_start_time,
            neural_start_time: self.neural_start_time,
            sampling_times: self.sampling_times.clone(),
            signal,
        }
    }

    /// Fills gaps in explicitly-timed signals with NaN placeholders
    ///
    /// Any interval longer than 1.5 sampling periods is padded with NaN
    /// samples at the nominal times, so the series becomes uniformly sampled.
    /// Derived timing is already uniform and is left alone.
    pub fn plug_missing_data(&mut self) {
        if self.samples_per_second.is_nan() || self.samples_per_second <= 0.0 {
            return;
        }
        let step = 1.0 / self.samples_per_second;
        let max_gap = 1.5 * step;

        let (times, signal) = match &self.sampling_times {
            Some(times) if times.windows(2).any(|w| w[1] - w[0] > max_gap) => {
                let mut new_times = Vec::with_capacity(times.len());
                let mut new_signal = Vec::with_capacity(self.signal.len());
                for (i, (&t, &v)) in times.iter().zip(&self.signal).enumerate() {
                    if i > 0 {
                        let previous = times[i - 1];
                        let gap = t - previous;
                        if gap > max_gap {
                            let missing = ((gap * self.samples_per_second).round() as usize).saturating_sub(1);
                            for k in 1..=missing {
                                new_times.push(previous + k as f64 * step);
                                new_signal.push(f64::NAN);
                            }
                        }
                    }
                    new_times.push(t);
                    new_signal.push(v);
                }
                (new_times, new_signal)
            }
            _ => return,
        };

        self.sampling_times = Some(times);
        self.signal = signal;
    }
}

/// A discrete event (task message) with onset and duration in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub onset: f64,
    pub duration: f64,
    pub trial_type: String,
    pub sample: i64,
}

/// Non-fatal conditions met during a conversion
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    EndOfRecordingNotFound,
    MissingTimingTags { file: String },
    SamplingRateUnchecked { file: String },
    NoTriggerChannel,
    ConstantTriggerChannel,
    NoTriggerFound,
    NoTaskEvents,
    MissingHeaderLine(String),
    EyeEventNotFound { kind: String, start: f64, end: f64 },
    BlinkBoundsNotFound { start: f64, end: f64 },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::EndOfRecordingNotFound => write!(f, "End of physio recording not found"),
            Warning::MissingTimingTags { file } => {
                write!(f, "No MDH timing tags found in '{}'; using 0", file)
            }
            Warning::SamplingRateUnchecked { file } => {
                write!(f, "Cannot check the sampling rate of '{}' without log times", file)
            }
            Warning::NoTriggerChannel => write!(f, "No trigger channel was found"),
            Warning::ConstantTriggerChannel => write!(
                f,
                "No trigger channel was found and the onsets are not trigger-adjusted"
            ),
            Warning::NoTriggerFound => write!(f, "The trigger channel never fires"),
            Warning::NoTaskEvents => write!(f, "No task events were found"),
            Warning::MissingHeaderLine(key) => write!(f, "Header line '{}' not found", key),
            Warning::EyeEventNotFound { kind, start, end } => {
                write!(f, "Could not locate {} with start={} and end={}", kind, start, end)
            }
            Warning::BlinkBoundsNotFound { start, end } => {
                write!(f, "Found blink in saccade with start={} and end={} but no gaze dropout", start, end)
            }
        }
    }
}

/// Collects warnings alongside a result
///
/// Every warning is also logged through `tracing`, so command-line runs see
/// it while tests can assert on it directly.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn contains(&self, warning: &Warning) -> bool {
        self.warnings.contains(warning)
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }
}

/// Settings shared by the conversion drivers and the command-line tools
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOptions {
    /// 采样率检查的相对容差，必须在 (0, 1) 之间
    pub tolerance: f64,
    /// 强制使用的PMU版本；None 表示自动检测
    pub revision: Option<PmuRevision>,
    pub skip_eye_events: bool,
    pub compress_events: bool,
    pub metadata_path: Option<String>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        ConversionOptions {
            tolerance: DEFAULT_SAMPLING_RATE_TOLERANCE,
            revision: None,
            skip_eye_events: false,
            compress_events: false,
            metadata_path: None,
        }
    }
}

impl ConversionOptions {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_revision(mut self, revision: PmuRevision) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn with_skip_eye_events(mut self, skip: bool) -> Self {
        self.skip_eye_events = skip;
        self
    }

    pub fn with_compress_events(mut self, compress: bool) -> Self {
        self.compress_events = compress;
        self
    }

    pub fn with_metadata_path(mut self, path: impl Into<String>) -> Self {
        self.metadata_path = Some(path.into());
        self
    }
}

/// Files written by a conversion driver and the warnings it raised
#[derive(Debug, Clone, Default)]
pub struct ConversionOutput {
    pub written: Vec<PathBuf>,
    pub diagnostics: Diagnostics,
}
