//! SR Research EyeLink recordings
//!
//! Binary `.edf` eye-tracker files are decoded by an external tool into three
//! tables (samples, eye events and messages), stored together as JSON:
//!
//! ```json
//! {
//!     "samples":  [{"time": 1000, "gx_right": 400.0, "gy_right": 300.0, "pa_right": 900.0, "input": 0}],
//!     "events":   [{"type": "fixation", "start": 1000, "end": 1004, "blink": false}],
//!     "messages": [{"time": 0, "text": "RECCFG CR 1000 2 1 R"}, {"time": 0, "text": "!MODE RECORD CR 1000 2 1 R"}]
//! }
//! ```
//!
//! Messages before `!MODE RECORD` are the recording header; later messages
//! were sent by the stimulus computer and become task events.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use crate::error::{FormatError, PhysioError, Result};
use crate::events::EventData;
use crate::physio::PhysioData;
use crate::trigger::{first_trigger_index, is_constant_sentinel};
use crate::types::{ConversionOptions, ConversionOutput, Diagnostics, Event, PhysioSignal, Warning};
use crate::utils::find_line_with_string;
use crate::writer::{ensure_output_dir, PhysioWriter};
use crate::TRIGGER_LABEL;

/// Gaze value the tracker reports while the eye is closed
pub const BLINK_GAZE_SENTINEL: f64 = 100_000_000.0;

/// Message separating the header from the task messages
pub const MODE_RECORD: &str = "!MODE RECORD";

/// Screen positions of the nine-point calibration grid
pub const HV9_POSITIONS: &str =
    "[[400,300],[400,51],[400,549],[48,300],[752,300],[48,51],[752,51],[48,549],[752,549]]";

fn nan() -> f64 {
    f64::NAN
}

/// 缺失值在 JSON 中为 null
fn null_as_nan<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyelinkSample {
    /// Tracker clock, ms
    pub time: f64,
    #[serde(default = "nan", deserialize_with = "null_as_nan")]
    pub gx_left: f64,
    #[serde(default = "nan", deserialize_with = "null_as_nan")]
    pub gy_left: f64,
    #[serde(default = "nan", deserialize_with = "null_as_nan")]
    pub pa_left: f64,
    #[serde(default = "nan", deserialize_with = "null_as_nan")]
    pub gx_right: f64,
    #[serde(default = "nan", deserialize_with = "null_as_nan")]
    pub gy_right: f64,
    #[serde(default = "nan", deserialize_with = "null_as_nan")]
    pub pa_right: f64,
    /// Auxiliary analog input; carries the scanner trigger
    #[serde(default = "nan", deserialize_with = "null_as_nan")]
    pub input: f64,
}

impl EyelinkSample {
    /// The decoder pads recordings with all-zero rows
    pub fn is_blank(&self) -> bool {
        [
            self.time,
            self.gx_left,
            self.gy_left,
            self.pa_left,
            self.gx_right,
            self.gy_right,
            self.pa_right,
            self.input,
        ]
        .iter()
        .all(|&v| v == 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EyeEventKind {
    Fixation,
    Saccade,
    Blink,
    #[serde(other)]
    Other,
}

impl EyeEventKind {
    fn name(&self) -> &'static str {
        match self {
            EyeEventKind::Fixation => "fixation",
            EyeEventKind::Saccade => "saccade",
            EyeEventKind::Blink => "blink",
            EyeEventKind::Other => "event",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EyelinkEvent {
    #[serde(rename = "type")]
    pub kind: EyeEventKind,
    pub start: f64,
    pub end: f64,
    /// Saccade that contains a blink
    #[serde(default)]
    pub blink: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EyelinkMessage {
    #[serde(default)]
    pub time: f64,
    pub text: String,
}

impl EyelinkMessage {
    fn clean_text(&self) -> &str {
        self.text.trim_matches(|c: char| c == ' ' || c == '\n' || c == '\r' || c == '\0')
    }
}

/// Decoded tables of one eye-tracker recording
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EyelinkRecording {
    #[serde(default)]
    pub samples: Vec<EyelinkSample>,
    #[serde(default)]
    pub events: Vec<EyelinkEvent>,
    #[serde(default)]
    pub messages: Vec<EyelinkMessage>,
}

impl EyelinkRecording {
    /// Loads a recording exported as JSON
    ///
    /// # Errors
    ///
    /// * `PhysioError::FileNotFound` - `path` does not exist
    /// * `PhysioError::Json` - the file is not a valid recording
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PhysioError::FileNotFound(path.display().to_string()));
        }
        Ok(serde_json::from_reader(BufReader::new(File::open(path)?))?)
    }

    fn mode_record_index(&self) -> Option<usize> {
        self.messages.iter().position(|m| m.text.contains(MODE_RECORD))
    }

    /// Cleaned messages before `!MODE RECORD`, blank lines dropped
    pub fn header_lines(&self) -> Vec<String> {
        let end = self.mode_record_index().unwrap_or(self.messages.len());
        self.messages[..end]
            .iter()
            .map(EyelinkMessage::clean_text)
            .filter(|t| !t.is_empty())
            .map(collapse_whitespace)
            .collect()
    }

    /// Messages sent after `!MODE RECORD`
    pub fn task_messages(&self) -> &[EyelinkMessage] {
        match self.mode_record_index() {
            Some(idx) => &self.messages[idx + 1..],
            None => &[],
        }
    }

    /// Samples without the decoder's blank padding rows
    pub fn recorded_samples(&self) -> Vec<&EyelinkSample> {
        self.samples.iter().filter(|s| !s.is_blank()).collect()
    }
}

/// 五个及以上的连续空白压缩为四个空格
fn collapse_whitespace(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut run = String::new();
    for c in line.chars() {
        if c.is_whitespace() {
            run.push(c);
            continue;
        }
        if run.chars().count() >= 5 {
            out.push_str("    ");
        } else {
            out.push_str(&run);
        }
        run.clear();
        out.push(c);
    }
    if run.chars().count() >= 5 {
        out.push_str("    ");
    } else {
        out.push_str(&run);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedEye {
    Left,
    Right,
    Both,
}

impl RecordedEye {
    pub fn name(&self) -> &'static str {
        match self {
            RecordedEye::Left => "Left",
            RecordedEye::Right => "Right",
            RecordedEye::Both => "Both",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token.trim_matches('\0') {
            "R" => Some(RecordedEye::Right),
            "L" => Some(RecordedEye::Left),
            "LR" | "RL" => Some(RecordedEye::Both),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub kind: Option<String>,
    pub position: Option<String>,
    pub average_error: String,
    pub max_error: String,
}

/// Acquisition settings recovered from the header messages
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingHeader {
    pub sampling_frequency: f64,
    pub eye: RecordedEye,
    pub tracking_method: String,
    pub pupil_fit_method: Option<String>,
    pub pupil_threshold: Option<String>,
    pub cr_threshold: Option<String>,
    pub calibration: Option<Calibration>,
    pub lines: Vec<String>,
}

/// Tokens of the first line containing `keyword`, starting at the keyword
fn keyword_tokens<'a>(lines: &'a [String], keyword: &str) -> Option<Vec<&'a str>> {
    let line = &lines[find_line_with_string(lines, keyword)?];
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let start = tokens.iter().position(|t| t.contains(keyword)).unwrap_or(0);
    Some(tokens[start..].to_vec())
}

/// Parses the recording header
///
/// `RECCFG` is required; the pupil-fit, threshold and calibration lines are
/// optional and only produce warnings when missing.
///
/// # Errors
///
/// * `PhysioError::Format` - no usable `RECCFG` line
pub fn parse_header(lines: &[String], file: &str, diagnostics: &mut Diagnostics) -> Result<RecordingHeader> {
    let context = "Eye-tracker header has no valid RECCFG line";
    let expected = "RECCFG <method> <rate> <filter> <filter> <eye>";
    let cfg = keyword_tokens(lines, "RECCFG").ok_or_else(|| FormatError::new(context, file))?;
    if cfg.len() < 6 {
        return Err(FormatError::new(context, file).expected(expected, cfg.join(" ")).into());
    }

    let tracking_method = if cfg[1].contains("CR") { "P-CR".to_string() } else { cfg[1].to_string() };
    let sampling_frequency: f64 = cfg[2]
        .parse()
        .map_err(|_| FormatError::new(context, file).expected("sampling frequency", cfg[2]))?;
    let eye = RecordedEye::from_token(cfg[5])
        .ok_or_else(|| FormatError::new(context, file).expected("R, L or LR", cfg[5]))?;

    let pupil_fit_method = match keyword_tokens(lines, "ELCL_PROC") {
        Some(tokens) if tokens.len() > 1 => Some(
            if tokens[1].to_ascii_uppercase().contains("ELLIPSE") { "ellipse" } else { "center-of-mass" }.to_string(),
        ),
        _ => {
            diagnostics.warn(Warning::MissingHeaderLine("ELCL_PROC".to_string()));
            None
        }
    };

    let (pupil_threshold, cr_threshold) = match keyword_tokens(lines, "THRESHOLDS") {
        Some(tokens) if tokens.len() > 3 => (
            Some(tokens[2].to_string()),
            Some(tokens[3].trim_matches('\0').to_string()),
        ),
        _ => {
            diagnostics.warn(Warning::MissingHeaderLine("THRESHOLDS".to_string()));
            (None, None)
        }
    };

    let calibration = match (
        find_line_with_string(lines, "CALIBRATION ("),
        find_line_with_string(lines, "ERROR"),
    ) {
        (Some(cal), Some(err)) => {
            let tokens: Vec<&str> = lines[err].split_whitespace().collect();
            if tokens.len() > 9 {
                let hv9 = lines[cal].to_ascii_uppercase().contains("HV9");
                Some(Calibration {
                    kind: hv9.then(|| "HV9".to_string()),
                    position: hv9.then(|| HV9_POSITIONS.to_string()),
                    average_error: tokens[7].to_string(),
                    max_error: tokens[9].to_string(),
                })
            } else {
                diagnostics.warn(Warning::MissingHeaderLine("ERROR".to_string()));
                None
            }
        }
        _ => None,
    };

    Ok(RecordingHeader {
        sampling_frequency,
        eye,
        tracking_method,
        pupil_fit_method,
        pupil_threshold,
        cr_threshold,
        calibration,
        lines: lines.to_vec(),
    })
}

/// Sample index whose timestamp equals `time`
fn locate(timestamps: &[f64], time: f64) -> Option<usize> {
    timestamps.binary_search_by(|t| t.total_cmp(&time)).ok()
}

/// Fills fixation/saccade/blink columns from the eye events
fn eye_event_columns(
    events: &[EyelinkEvent],
    timestamps: &[f64],
    gaze_x: &[Vec<f64>],
    diagnostics: &mut Diagnostics,
) -> [Vec<f64>; 3] {
    let n = timestamps.len();
    let mut fixation = vec![0.0; n];
    let mut saccade = vec![0.0; n];
    let mut blink = vec![0.0; n];

    for event in events {
        let column = match event.kind {
            EyeEventKind::Fixation => &mut fixation,
            EyeEventKind::Saccade => &mut saccade,
            _ => continue,
        };
        let (start, end) = match (locate(timestamps, event.start), locate(timestamps, event.end)) {
            (Some(s), Some(e)) if s <= e => (s, e),
            _ => {
                diagnostics.warn(Warning::EyeEventNotFound {
                    kind: event.kind.name().to_string(),
                    start: event.start,
                    end: event.end,
                });
                continue;
            }
        };
        column[start..end].iter_mut().for_each(|v| *v = 1.0);

        if event.kind == EyeEventKind::Saccade && event.blink {
            let closed = |i: &usize| gaze_x.iter().any(|eye| eye[*i] == BLINK_GAZE_SENTINEL);
            let first = (start..end).find(closed);
            let last = (start..end).rev().find(closed);
            match (first, last) {
                (Some(first), Some(last)) => blink[first..=last].iter_mut().for_each(|v| *v = 1.0),
                _ => diagnostics.warn(Warning::BlinkBoundsNotFound {
                    start: event.start,
                    end: event.end,
                }),
            }
        }
    }
    [fixation, saccade, blink]
}

fn column_units(label: &str) -> &'static str {
    if label == "eye_timestamp" {
        "ms"
    } else if label.ends_with("_coordinate") {
        "pixel"
    } else if label.ends_with("_pupil_size") {
        "arbitrary"
    } else {
        ""
    }
}

/// Converts the continuous eye-tracker data into a trigger-aligned collection
///
/// Columns are `eye_timestamp`, gaze and pupil size of the recorded eye(s)
/// and `trigger`, plus `fixation`/`saccade`/`blink` unless `skip_eye_events`.
/// Columns stuck at an unused-channel value are dropped.
///
/// # Errors
///
/// * `PhysioError::Format` - the header has no usable `RECCFG` line
/// * `PhysioError::InvalidFormat` - the recording holds no samples
///
/// # Examples
///
/// ```rust
/// use bidsphysio::eyelink::{edf2bids, EyelinkRecording};
/// use bidsphysio::Diagnostics;
///
/// let recording: EyelinkRecording = serde_json::from_str(
///     &bidsphysio::doctest_utils::eyelink_recording_json(),
/// )?;
/// let mut diagnostics = Diagnostics::new();
/// let physio = edf2bids(&recording, None, false, &mut diagnostics)?;
///
/// // 8 recorded samples plus 2 placeholders for the dropout at 1005-1006 ms
/// assert_eq!(physio.signal("eye1_x_coordinate").unwrap().samples_count(), 10);
/// assert_eq!(physio.attribute("RecordedEye").unwrap(), "Right");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn edf2bids(
    recording: &EyelinkRecording,
    metadata_path: Option<&str>,
    skip_eye_events: bool,
    diagnostics: &mut Diagnostics,
) -> Result<PhysioData> {
    let samples = recording.recorded_samples();
    let (first, last) = match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => (first.time, last.time),
        _ => return Err(PhysioError::InvalidFormat("eye-tracker recording has no samples".to_string())),
    };
    let header = parse_header(&recording.header_lines(), "eye-tracker header", diagnostics)?;
    let rate = header.sampling_frequency;

    let timestamps: Vec<f64> = samples.iter().map(|s| s.time).collect();
    let seconds: Vec<f64> = timestamps.iter().map(|t| (t - first) / 1000.0).collect();
    let field = |f: fn(&EyelinkSample) -> f64| samples.iter().map(|s| f(s)).collect::<Vec<f64>>();

    let left = [field(|s| s.gx_left), field(|s| s.gy_left), field(|s| s.pa_left)];
    let right = [field(|s| s.gx_right), field(|s| s.gy_right), field(|s| s.pa_right)];

    let mut columns: Vec<(&str, Vec<f64>)> = vec![("eye_timestamp", timestamps.clone())];
    let gaze_x = match header.eye {
        RecordedEye::Both => {
            let [lx, ly, lp] = left;
            let [rx, ry, rp] = right;
            let gaze = vec![lx.clone(), rx.clone()];
            columns.extend([
                ("eye1_x_coordinate", lx),
                ("eye1_y_coordinate", ly),
                ("eye2_x_coordinate", rx),
                ("eye2_y_coordinate", ry),
                ("eye1_pupil_size", lp),
                ("eye2_pupil_size", rp),
            ]);
            gaze
        }
        eye => {
            let [x, y, p] = if eye == RecordedEye::Left { left } else { right };
            let gaze = vec![x.clone()];
            columns.extend([
                ("eye1_x_coordinate", x),
                ("eye1_y_coordinate", y),
                ("eye1_pupil_size", p),
            ]);
            gaze
        }
    };
    columns.push((TRIGGER_LABEL, field(|s| s.input)));

    if !skip_eye_events {
        let [fixation, saccade, blink] = eye_event_columns(&recording.events, &timestamps, &gaze_x, diagnostics);
        columns.extend([("fixation", fixation), ("saccade", saccade), ("blink", blink)]);
    }

    let mut physio = PhysioData::new();
    for (label, values) in columns {
        if is_constant_sentinel(&values) {
            info!("Dropping column '{}': constant unused-channel value", label);
            continue;
        }
        physio.append_signal(
            PhysioSignal::new(label, rate, 0.0, values)
                .with_units(column_units(label))
                .with_sampling_times(seconds.clone())?,
        );
    }

    physio.set_attribute("RecordedEye", header.eye.name())?;
    physio.set_attribute("EyeTrackingMethod", &header.tracking_method)?;
    physio.set_attribute("PupilFitMethod", &header.pupil_fit_method)?;
    physio.set_attribute("CRThreshold", &header.cr_threshold)?;
    physio.set_attribute("PThreshold", &header.pupil_threshold)?;
    physio.set_attribute("MetadataJson", metadata_path)?;
    physio.set_attribute("CalibrationCount", usize::from(header.calibration.is_some()))?;
    if let Some(cal) = &header.calibration {
        physio.set_attribute("CalibrationType", &cal.kind)?;
        physio.set_attribute("CalibrationPosition", &cal.position)?;
        physio.set_attribute("AverageCalibrationError", &cal.average_error)?;
        physio.set_attribute("MaximalCalibrationError", &cal.max_error)?;
    }
    physio.set_attribute("RecordingStartTimestamp", first)?;
    physio.set_attribute("RecordingStopTimestamp", last)?;
    physio.set_attribute("EDFHeader", &header.lines)?;

    if physio.trigger_index().is_some() {
        physio.digitize_trigger()?;
        match physio.get_trigger_timing()?.first() {
            Some(&neural_start) => physio.set_neural_start_time(neural_start),
            None => diagnostics.warn(Warning::NoTriggerFound),
        }
    } else {
        diagnostics.warn(Warning::NoTriggerChannel);
    }
    physio.plug_missing_data();

    Ok(physio)
}

/// Converts the task messages into events timed from the first trigger
///
/// Onsets are seconds since the first recorded sample, minus the time of the
/// first scanner trigger when the `input` channel carries one.
pub fn edfevents2bids(recording: &EyelinkRecording, diagnostics: &mut Diagnostics) -> EventData {
    let mut events = EventData::new();
    let task = recording.task_messages();
    if task.is_empty() {
        diagnostics.warn(Warning::NoTaskEvents);
        return events;
    }

    let samples = recording.recorded_samples();
    let t0 = samples.first().map_or(0.0, |s| s.time);
    let input: Vec<f64> = samples.iter().map(|s| s.input).collect();

    let trigger_offset = if input.is_empty() || is_constant_sentinel(&input) {
        diagnostics.warn(Warning::ConstantTriggerChannel);
        0.0
    } else {
        match first_trigger_index(&input) {
            Some(idx) => (samples[idx].time - t0) / 1000.0,
            None => {
                diagnostics.warn(Warning::NoTriggerFound);
                0.0
            }
        }
    };

    for message in task {
        events.append_event(Event {
            onset: (message.time - t0) / 1000.0 - trigger_offset,
            duration: 0.0,
            trial_type: message.clean_text().to_string(),
            sample: message.time as i64,
        });
    }
    events
}

/// Converts an eye-tracker recording into BIDS physio and events files
///
/// Writes `<prefix>_physio.*` and `<prefix>_eventlist_raw.*`.
///
/// # Errors
///
/// * `PhysioError::FileNotFound` - `input` is missing; nothing is processed
///
/// When the events table cannot be written, the physio files written before
/// it are removed again.
pub fn convert_eyelink<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    prefix: Q,
    options: &ConversionOptions,
) -> Result<ConversionOutput> {
    let recording = EyelinkRecording::from_json_path(input)?;
    let prefix = prefix.as_ref();
    ensure_output_dir(prefix)?;

    let mut diagnostics = Diagnostics::new();
    let physio = edf2bids(
        &recording,
        options.metadata_path.as_deref(),
        options.skip_eye_events,
        &mut diagnostics,
    )?;
    let events = edfevents2bids(&recording, &mut diagnostics);

    let writer = PhysioWriter::new(prefix);
    let mut written = if physio.trigger_index().is_some() {
        writer.save_to_bids_with_trigger(&physio)?
    } else {
        writer.save_to_bids(&physio)?
    };

    if !events.is_empty() {
        let mut events_prefix = prefix.as_os_str().to_os_string();
        events_prefix.push("_eventlist_raw");
        match events.save_events_bids_data(Path::new(&events_prefix), options.compress_events) {
            Ok(paths) => written.extend(paths),
            Err(err) => {
                remove_written(&written);
                return Err(err);
            }
        }
    }
    Ok(ConversionOutput { written, diagnostics })
}

/// 事件写入失败时撤回已写出的生理数据文件
fn remove_written(paths: &[PathBuf]) {
    for path in paths {
        if let Err(err) = fs::remove_file(path) {
            warn!("Could not remove {}: {}", path.display(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    fn sample(time: f64, gx: f64, input: f64) -> EyelinkSample {
        EyelinkSample {
            time,
            gx_left: f64::NAN,
            gy_left: f64::NAN,
            pa_left: f64::NAN,
            gx_right: gx,
            gy_right: 300.0,
            pa_right: 900.0,
            input,
        }
    }

    #[test]
    fn test_parse_header() {
        let lines = header(&[
            "RECCFG CR 1000 2 1 R",
            "ELCL_PROC ELLIPSE (5)",
            "THRESHOLDS R 102 255",
            ">>>>>>> CALIBRATION (HV9,P-CR) FOR RIGHT: <<<<<<<<<",
            "!CAL VALIDATION HV9 R RIGHT GOOD ERROR 0.35 avg. 0.78 max OFFSET 0.12 deg.",
        ]);
        let mut diagnostics = Diagnostics::new();
        let parsed = parse_header(&lines, "t", &mut diagnostics).unwrap();

        assert_eq!(parsed.sampling_frequency, 1000.0);
        assert_eq!(parsed.eye, RecordedEye::Right);
        assert_eq!(parsed.tracking_method, "P-CR");
        assert_eq!(parsed.pupil_fit_method.as_deref(), Some("ellipse"));
        assert_eq!(parsed.pupil_threshold.as_deref(), Some("102"));
        assert_eq!(parsed.cr_threshold.as_deref(), Some("255"));
        let cal = parsed.calibration.unwrap();
        assert_eq!(cal.kind.as_deref(), Some("HV9"));
        assert_eq!(cal.average_error, "0.35");
        assert_eq!(cal.max_error, "0.78");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_parse_header_requires_reccfg() {
        let lines = header(&["ELCL_PROC CENTROID (3)"]);
        let err = parse_header(&lines, "t", &mut Diagnostics::new()).unwrap_err();
        assert!(matches!(err, PhysioError::Format(_)));
    }

    #[test]
    fn test_parse_header_optional_lines() {
        let lines = header(&["RECCFG GAZE 500 0 1 LR"]);
        let mut diagnostics = Diagnostics::new();
        let parsed = parse_header(&lines, "t", &mut diagnostics).unwrap();
        assert_eq!(parsed.eye, RecordedEye::Both);
        assert_eq!(parsed.tracking_method, "GAZE");
        assert!(parsed.calibration.is_none());
        assert!(diagnostics.contains(&Warning::MissingHeaderLine("THRESHOLDS".to_string())));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a      b  c"), "a    b  c");
        assert_eq!(collapse_whitespace("a\t\t\t\t\tb"), "a    b");
    }

    #[test]
    fn test_blink_inside_saccade() {
        let timestamps = vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0];
        let gaze = vec![vec![1.0, 2.0, BLINK_GAZE_SENTINEL, BLINK_GAZE_SENTINEL, 5.0, 6.0]];
        let events = vec![
            EyelinkEvent { kind: EyeEventKind::Fixation, start: 10.0, end: 11.0, blink: false },
            EyelinkEvent { kind: EyeEventKind::Saccade, start: 11.0, end: 15.0, blink: true },
            EyelinkEvent { kind: EyeEventKind::Fixation, start: 15.0, end: 99.0, blink: false },
        ];
        let mut diagnostics = Diagnostics::new();
        let [fixation, saccade, blink] = eye_event_columns(&events, &timestamps, &gaze, &mut diagnostics);

        assert_eq!(fixation, vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(saccade, vec![0.0, 1.0, 1.0, 1.0, 1.0, 0.0]);
        assert_eq!(blink, vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_blink_checks_both_eyes() {
        let timestamps = vec![0.0, 1.0, 2.0, 3.0];
        let gaze = vec![
            vec![1.0, BLINK_GAZE_SENTINEL, 1.0, 1.0],
            vec![1.0, 1.0, BLINK_GAZE_SENTINEL, 1.0],
        ];
        let events = vec![EyelinkEvent { kind: EyeEventKind::Saccade, start: 0.0, end: 3.0, blink: true }];
        let [_, _, blink] = eye_event_columns(&events, &timestamps, &gaze, &mut Diagnostics::new());
        assert_eq!(blink, vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_blank_rows_dropped() {
        let recording = EyelinkRecording {
            samples: vec![
                sample(100.0, 1.0, 0.0),
                EyelinkSample {
                    time: 0.0,
                    gx_left: 0.0,
                    gy_left: 0.0,
                    pa_left: 0.0,
                    gx_right: 0.0,
                    gy_right: 0.0,
                    pa_right: 0.0,
                    input: 0.0,
                },
                sample(101.0, 1.0, 0.0),
            ],
            ..Default::default()
        };
        assert_eq!(recording.recorded_samples().len(), 2);
    }

    #[test]
    fn test_events_relative_to_trigger() {
        let mut samples: Vec<EyelinkSample> = (0..10).map(|i| sample(1000.0 + i as f64, 1.0, 0.0)).collect();
        samples[4].input = 5.0;
        samples[8].input = 5.0;
        let recording = EyelinkRecording {
            samples,
            events: Vec::new(),
            messages: vec![
                EyelinkMessage { time: 0.0, text: "RECCFG CR 1000 2 1 R".into() },
                EyelinkMessage { time: 0.0, text: "!MODE RECORD CR 1000 2 1 R".into() },
                EyelinkMessage { time: 1006.0, text: "stimulus on\0".into() },
            ],
        };
        let mut diagnostics = Diagnostics::new();
        let events = edfevents2bids(&recording, &mut diagnostics);

        assert_eq!(events.len(), 1);
        let event = &events.events()[0];
        assert!((event.onset - 0.002).abs() < 1e-12);
        assert_eq!(event.trial_type, "stimulus on");
        assert_eq!(event.sample, 1006);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_events_without_task_messages() {
        let mut diagnostics = Diagnostics::new();
        let events = edfevents2bids(&EyelinkRecording::default(), &mut diagnostics);
        assert!(events.is_empty());
        assert!(diagnostics.contains(&Warning::NoTaskEvents));
    }

    #[test]
    fn test_null_gaze_is_nan() {
        let sample: EyelinkSample =
            serde_json::from_str(r#"{"time": 5, "gx_right": null, "input": 0}"#).unwrap();
        assert!(sample.gx_right.is_nan());
        assert!(sample.pa_left.is_nan());
        assert_eq!(sample.input, 0.0);
    }
}
