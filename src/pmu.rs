//! Siemens PMU physiological logs
//!
//! A PMU log is a text file whose first line holds every sample, interleaved
//! with header parameters, comment blocks and in-band marker codes. The
//! remaining lines form a footer of `Key: value` pairs closed by `6003`.
//!
//! ```text
//! 1 8 20 2 5002 LOGVERSION 102 6002 5002 Logging PULS signal: ... 6002 1733 1725 5000 1721 ... 5003
//! ECG  Freq Per: 0 0
//! ...
//! LogStartMDHTime:  39008572
//! LogStopMDHTime:   39008594
//! 6003
//! ```
//!
//! Three revisions of the format exist and differ in how the first line
//! declares the signal kind and sampling rate:
//!
//! | Revision | Declaration                                   | Timing tags |
//! |----------|-----------------------------------------------|-------------|
//! | VE11C    | `LOGVERSION` block + `Logging <KIND> signal`   | MDH + MPCU  |
//! | VB15A    | four integer parameters, no comment blocks     | MDH         |
//! | VBX      | `Logging <KIND> signal`, no `LOGVERSION` block | MDH         |
//!
//! # Examples
//!
//! ```rust
//! use bidsphysio::pmu::{read_pmu, sanitize_raw_samples, SentinelCodes};
//! use bidsphysio::{Diagnostics, PmuRevision};
//!
//! # let dir = tempfile::tempdir()?;
//! # let path = dir.path().join("sample.puls");
//! # bidsphysio::doctest_utils::write_ve11c_puls_log(&path)?;
//! let log = read_pmu(&path, None)?;
//! assert_eq!(log.revision, PmuRevision::Ve11c);
//! assert_eq!(log.kind, "PULS");
//! assert_eq!(log.sampling_rate, 400.0);
//!
//! let mut diagnostics = Diagnostics::new();
//! let sanitized = sanitize_raw_samples(&log.raw_samples, &SentinelCodes::SIEMENS, &mut diagnostics)?;
//! assert!(sanitized.end_of_recording);
//! assert_eq!(sanitized.trigger_markers.len(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs;
use std::path::Path;

use chrono::NaiveTime;
use tracing::{debug, info};

use crate::error::{FormatError, PhysioError, Result};
use crate::physio::PhysioData;
use crate::trigger::{in_band_trigger_indices, test_sampling_rate, MarkerKind, TriggerMarker};
use crate::types::{ConversionOptions, ConversionOutput, Diagnostics, PhysioSignal, PmuRevision, Warning};
use crate::utils::{atoi_nonlocalized, ms_to_time_of_day, tag_value};
use crate::writer::{ensure_output_dir, PhysioWriter};
use crate::TRIGGER_LABEL;

/// 注释块起始标记
pub const COMMENT_START: &str = "5002";
/// 注释块结束标记
pub const COMMENT_END: &str = "6002";
/// 页脚结束标记
pub const FOOTER_END: &str = "6003";

/// In-band marker codes of a PMU sample stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentinelCodes {
    pub trigger_on: i64,
    pub trigger_off: i64,
    pub end_of_recording: i64,
}

impl SentinelCodes {
    pub const SIEMENS: SentinelCodes = SentinelCodes {
        trigger_on: 5000,
        trigger_off: 6000,
        end_of_recording: 5003,
    };
}

/// A PMU log split into its declared parameters and raw sample tokens
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLog {
    pub revision: PmuRevision,
    /// Signal kind as declared in the log, e.g. `PULS`, `RESP`, `ECG`
    pub kind: String,
    /// `LogStartMDHTime`/`LogStopMDHTime`, ms after midnight
    pub mdh_time: [i64; 2],
    /// `LogStartMPCUTime`/`LogStopMPCUTime`; zeros unless VE11C
    pub mpcu_time: [i64; 2],
    pub sampling_rate: f64,
    /// Sample tokens, still including marker codes and the leading empty token
    pub raw_samples: Vec<String>,
}

impl ParsedLog {
    pub fn start_time_of_day(&self) -> Option<NaiveTime> {
        ms_to_time_of_day(self.mdh_time[0])
    }
}

/// Cleaned sample stream: markers replaced by NaN
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizedSamples {
    pub samples: Vec<f64>,
    pub trigger_markers: Vec<TriggerMarker>,
    pub end_of_recording: bool,
}

impl SanitizedSamples {
    /// Samples with the marker slots removed
    pub fn without_markers(&self) -> Vec<f64> {
        let mut markers = self.trigger_markers.iter().map(|m| m.index).peekable();
        let mut samples = Vec::with_capacity(self.samples.len() - self.trigger_markers.len());
        for (i, &v) in self.samples.iter().enumerate() {
            if markers.peek() == Some(&i) {
                markers.next();
                continue;
            }
            samples.push(v);
        }
        samples
    }
}

/// Replaces marker codes with NaN and truncates at the end-of-recording code
///
/// One leading empty token is expected (the raw line is split on single
/// spaces) and skipped, as is any later empty token.
///
/// # Errors
///
/// * `PhysioError::InvalidSample` - a token is not an integer
///
/// # Examples
///
/// ```rust
/// use bidsphysio::pmu::{sanitize_raw_samples, SentinelCodes};
/// use bidsphysio::Diagnostics;
///
/// let raw = ["", "1733", "5000", "1725", "6000", "1721", "5003", "1718"];
/// let mut diagnostics = Diagnostics::new();
/// let sanitized = sanitize_raw_samples(&raw, &SentinelCodes::SIEMENS, &mut diagnostics)?;
///
/// assert_eq!(sanitized.samples.len(), 5);
/// assert!(sanitized.samples[1].is_nan() && sanitized.samples[3].is_nan());
/// assert_eq!(sanitized.without_markers(), vec![1733.0, 1725.0, 1721.0]);
/// assert!(diagnostics.is_empty());
/// # Ok::<(), bidsphysio::PhysioError>(())
/// ```
pub fn sanitize_raw_samples<S: AsRef<str>>(
    raw_samples: &[S],
    codes: &SentinelCodes,
    diagnostics: &mut Diagnostics,
) -> Result<SanitizedSamples> {
    let tokens = match raw_samples.first() {
        Some(first) if first.as_ref().is_empty() => &raw_samples[1..],
        _ => raw_samples,
    };

    let mut samples = Vec::with_capacity(tokens.len());
    let mut trigger_markers = Vec::new();
    let mut end_of_recording = false;

    for token in tokens {
        let token = token.as_ref().trim();
        if token.is_empty() {
            continue;
        }
        let value = atoi_nonlocalized(token).ok_or_else(|| PhysioError::InvalidSample(token.to_string()))?;

        if value == codes.end_of_recording {
            end_of_recording = true;
            break;
        }
        let kind = if value == codes.trigger_on {
            Some(MarkerKind::On)
        } else if value == codes.trigger_off {
            Some(MarkerKind::Off)
        } else {
            None
        };
        match kind {
            Some(kind) => {
                trigger_markers.push(TriggerMarker { index: samples.len(), kind });
                samples.push(f64::NAN);
            }
            None => samples.push(value as f64),
        }
    }

    if !end_of_recording {
        diagnostics.warn(Warning::EndOfRecordingNotFound);
    }

    Ok(SanitizedSamples {
        samples,
        trigger_markers,
        end_of_recording,
    })
}

/// Reads the MPCU and MDH start/stop times from the footer lines
///
/// Returns `(mpcu, mdh)`; a missing tag reads as 0.
pub fn get_pmu_timing(lines: &[String]) -> ([i64; 2], [i64; 2]) {
    let tag = |name: &str| tag_value(lines, name).unwrap_or(0);
    (
        [tag("LogStartMPCUTime"), tag("LogStopMPCUTime")],
        [tag("LogStartMDHTime"), tag("LogStopMDHTime")],
    )
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(PhysioError::FileNotFound(path.display().to_string()));
    }
    let text = fs::read_to_string(path)?;
    Ok(text.lines().map(|l| l.trim_end().to_string()).collect())
}

/// Token-aware offset just past the last `6002` on the line
fn after_last_comment(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    line.match_indices(COMMENT_END)
        .filter(|(start, m)| {
            let end = start + m.len();
            (*start == 0 || bytes[start - 1] == b' ') && (end == bytes.len() || bytes[end] == b' ')
        })
        .map(|(start, m)| start + m.len())
        .last()
}

/// Text of every `5002 … 6002` block on the line
fn comment_blocks(line: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Option<Vec<&str>> = None;
    for token in line.split_whitespace() {
        if let Some(words) = current.as_mut() {
            if token == COMMENT_END {
                blocks.push(words.join(" "));
                current = None;
            } else {
                words.push(token);
            }
        } else if token == COMMENT_START {
            current = Some(Vec::new());
        }
    }
    blocks
}

/// `Logging <KIND> signal: … <KIND>_SAMPLES_PER_SECOND = <rate>; …`
fn logging_declaration(blocks: &[String]) -> Option<(String, f64)> {
    blocks.iter().find_map(|block| {
        let rest = block.strip_prefix("Logging ")?;
        let kind = rest.split_whitespace().next()?.to_string();
        let key = "SAMPLES_PER_SECOND";
        let value = &block[block.find(key)? + key.len()..];
        let value = value.trim_start().strip_prefix('=')?.trim_start();
        let digits: String = value
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let rate: f64 = digits.parse().ok()?;
        (rate > 0.0).then_some((kind, rate))
    })
}

/// Footer lines, up to the `6003` terminator
fn footer(lines: &[String]) -> &[String] {
    let rest = lines.get(1..).unwrap_or(&[]);
    let end = rest.iter().position(|l| l.trim() == FOOTER_END).unwrap_or(rest.len());
    &rest[..end]
}

fn preview(line: &str) -> String {
    line.chars().take(40).collect()
}

fn raw_tokens(text: &str) -> Vec<String> {
    text.split(' ').map(str::to_string).collect()
}

fn data_line<'a>(lines: &'a [String], file: &str) -> Result<&'a str> {
    lines
        .first()
        .map(String::as_str)
        .ok_or_else(|| FormatError::new("File is empty", file).into())
}

fn parse_ve11c(lines: &[String], file: &str) -> Result<ParsedLog> {
    let context = "File does not seem to be a VE11C PMU file";
    let first = data_line(lines, file)?;
    let blocks = comment_blocks(first);

    if !blocks.iter().any(|b| b.starts_with("LOGVERSION")) {
        return Err(FormatError::new(context, file).expected("LOGVERSION", preview(first)).into());
    }
    let (kind, sampling_rate) = logging_declaration(&blocks).ok_or_else(|| {
        FormatError::new(context, file).expected("Logging <KIND> signal", preview(first))
    })?;
    let raw = after_last_comment(first).map_or("", |offset| &first[offset..]);
    let (mpcu_time, mdh_time) = get_pmu_timing(footer(lines));

    Ok(ParsedLog {
        revision: PmuRevision::Ve11c,
        kind,
        mdh_time,
        mpcu_time,
        sampling_rate,
        raw_samples: raw_tokens(raw),
    })
}

fn parse_vbx(lines: &[String], file: &str) -> Result<ParsedLog> {
    let context = "File does not seem to be a VBX PMU file";
    let first = data_line(lines, file)?;
    let blocks = comment_blocks(first);

    if let Some(version) = blocks.iter().find(|b| b.starts_with("LOGVERSION")) {
        return Err(FormatError::new(context, file).expected("no LOGVERSION block", version.clone()).into());
    }
    let (kind, sampling_rate) = logging_declaration(&blocks).ok_or_else(|| {
        FormatError::new(context, file).expected("Logging <KIND> signal", preview(first))
    })?;
    let raw = after_last_comment(first).map_or("", |offset| &first[offset..]);
    let (_, mdh_time) = get_pmu_timing(footer(lines));

    Ok(ParsedLog {
        revision: PmuRevision::Vbx,
        kind,
        mdh_time,
        mpcu_time: [0, 0],
        sampling_rate,
        raw_samples: raw_tokens(raw),
    })
}

fn vb15a_kind(code: i64) -> Option<&'static str> {
    match code {
        1 => Some("ECG"),
        2 => Some("RESP"),
        3 => Some("PULS"),
        4 => Some("EXT"),
        _ => None,
    }
}

fn parse_vb15a(lines: &[String], file: &str) -> Result<ParsedLog> {
    let context = "File does not seem to be a VB15A PMU file";
    let first = data_line(lines, file)?;

    if first.split_whitespace().any(|t| t == COMMENT_START) {
        return Err(FormatError::new(context, file).expected("no comment blocks", COMMENT_START).into());
    }

    // 前四个参数：1 <类型> <采样间隔 ms> <保留>
    let mut rest = first;
    let mut params = [0i64; 4];
    for param in params.iter_mut() {
        rest = rest.trim_start_matches(' ');
        let end = rest.find(' ').unwrap_or(rest.len());
        *param = atoi_nonlocalized(&rest[..end]).ok_or_else(|| {
            FormatError::new(context, file).expected("four integer header parameters", preview(first))
        })?;
        rest = &rest[end..];
    }

    let [version, code, interval, _] = params;
    if version != 1 {
        return Err(FormatError::new(context, file).expected("1", version.to_string()).into());
    }
    let kind = vb15a_kind(code).ok_or_else(|| {
        FormatError::new(context, file).expected("signal code 1-4", code.to_string())
    })?;
    if interval <= 0 {
        return Err(FormatError::new(context, file).expected("positive sample interval", interval.to_string()).into());
    }
    let (_, mdh_time) = get_pmu_timing(footer(lines));

    Ok(ParsedLog {
        revision: PmuRevision::Vb15a,
        kind: kind.to_string(),
        mdh_time,
        mpcu_time: [0, 0],
        sampling_rate: 1000.0 / interval as f64,
        raw_samples: raw_tokens(rest),
    })
}

fn parse_revision(revision: PmuRevision, lines: &[String], file: &str) -> Result<ParsedLog> {
    match revision {
        PmuRevision::Ve11c => parse_ve11c(lines, file),
        PmuRevision::Vb15a => parse_vb15a(lines, file),
        PmuRevision::Vbx => parse_vbx(lines, file),
    }
}

/// Reads a PMU log, detecting the revision unless one is given
///
/// # Errors
///
/// * `PhysioError::FileNotFound` - `path` does not exist
/// * `PhysioError::Format` - the file matches no (or not the given) revision
pub fn read_pmu<P: AsRef<Path>>(path: P, revision: Option<PmuRevision>) -> Result<ParsedLog> {
    let path = path.as_ref();
    let file = path.display().to_string();
    let lines = read_lines(path)?;

    if let Some(revision) = revision {
        return parse_revision(revision, &lines, &file);
    }
    for candidate in PmuRevision::DISPATCH_ORDER {
        match parse_revision(candidate, &lines, &file) {
            Ok(log) => return Ok(log),
            Err(PhysioError::Format(err)) => debug!("Not a {} log: {}", candidate, err),
            Err(err) => return Err(err),
        }
    }
    Err(FormatError::new("File does not seem to be a valid PMU file", file).into())
}

pub fn read_ve11c_pmu<P: AsRef<Path>>(path: P) -> Result<ParsedLog> {
    read_pmu(path, Some(PmuRevision::Ve11c))
}

pub fn read_vb15a_pmu<P: AsRef<Path>>(path: P) -> Result<ParsedLog> {
    read_pmu(path, Some(PmuRevision::Vb15a))
}

pub fn read_vbx_pmu<P: AsRef<Path>>(path: P) -> Result<ParsedLog> {
    read_pmu(path, Some(PmuRevision::Vbx))
}

/// BIDS column name for a PMU signal kind
pub fn physio_label(kind: &str) -> String {
    let upper = kind.to_ascii_uppercase();
    if upper.contains("PULS") {
        "cardiac".to_string()
    } else if upper.contains("RESP") {
        "respiratory".to_string()
    } else if upper.contains("TRIGGER") || upper.contains("EXT") {
        TRIGGER_LABEL.to_string()
    } else {
        kind.to_ascii_lowercase()
    }
}

/// Reads PMU logs into a trigger-aligned collection
///
/// Each file becomes one signal starting at its MDH start time. The scanner
/// triggers come from a logged trigger channel when there is one, otherwise
/// from the in-band markers of the first file that has them. The time of
/// the first trigger is stamped on every signal.
pub fn pmu2bids<P: AsRef<Path>>(
    files: &[P],
    options: &ConversionOptions,
    diagnostics: &mut Diagnostics,
) -> Result<PhysioData> {
    let mut physio = PhysioData::new();
    let mut in_band_trigger: Option<PhysioSignal> = None;

    for path in files {
        let path = path.as_ref();
        let file = path.display().to_string();
        let log = read_pmu(path, options.revision)?;
        info!(
            "Read {} {} log {} ({} Hz, started {})",
            log.revision,
            log.kind,
            file,
            log.sampling_rate,
            log.start_time_of_day()
                .map_or_else(|| "unknown".to_string(), |t| t.format("%H:%M:%S%.3f").to_string())
        );

        let sanitized = sanitize_raw_samples(&log.raw_samples, &SentinelCodes::SIEMENS, diagnostics)?;
        let triggers = in_band_trigger_indices(&sanitized.trigger_markers);
        let samples = sanitized.without_markers();

        let log_times = [log.mdh_time[0] as f64, log.mdh_time[1] as f64];
        if test_sampling_rate(log.sampling_rate, samples.len(), log_times, options.tolerance)?.is_none() {
            if log.mdh_time == [0, 0] {
                diagnostics.warn(Warning::MissingTimingTags { file });
            } else {
                diagnostics.warn(Warning::SamplingRateUnchecked { file });
            }
        }

        let signal = PhysioSignal::new(
            physio_label(&log.kind),
            log.sampling_rate,
            log.mdh_time[0] as f64 / 1000.0,
            samples,
        );
        if in_band_trigger.is_none() && !triggers.is_empty() {
            let mut trace = vec![0.0; signal.samples_count()];
            for idx in triggers {
                if let Some(slot) = trace.get_mut(idx) {
                    *slot = 1.0;
                }
            }
            in_band_trigger = Some(signal.matching_trigger_signal(trace));
        }
        physio.append_signal(signal);
    }

    if physio.trigger_index().is_some() {
        physio.digitize_trigger()?;
    } else if let Some(trigger) = in_band_trigger {
        physio.append_signal(trigger);
    }

    match physio.get_trigger_timing() {
        Ok(times) => match times.first() {
            Some(&first) => physio.set_neural_start_time(first),
            None => diagnostics.warn(Warning::NoTriggerFound),
        },
        Err(PhysioError::MissingTrigger) => diagnostics.warn(Warning::NoTriggerChannel),
        Err(err) => return Err(err),
    }
    Ok(physio)
}

/// Converts PMU logs into BIDS files named after `prefix`
///
/// # Errors
///
/// * `PhysioError::FileNotFound` - an input is missing; nothing is processed
pub fn convert_pmu<P: AsRef<Path>, Q: AsRef<Path>>(
    files: &[P],
    prefix: Q,
    options: &ConversionOptions,
) -> Result<ConversionOutput> {
    if let Some(missing) = files.iter().map(|p| p.as_ref()).find(|p| !p.exists()) {
        return Err(PhysioError::FileNotFound(missing.display().to_string()));
    }
    let prefix = prefix.as_ref();
    ensure_output_dir(prefix)?;

    let mut diagnostics = Diagnostics::new();
    let physio = pmu2bids(files, options, &mut diagnostics)?;
    let writer = PhysioWriter::new(prefix);
    let written = if physio.trigger_index().is_some() {
        writer.save_to_bids_with_trigger(&physio)?
    } else {
        writer.save_to_bids(&physio)?
    };
    Ok(ConversionOutput { written, diagnostics })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_get_pmu_timing_without_tags() {
        assert_eq!(get_pmu_timing(&[]), ([0, 0], [0, 0]));
    }

    #[test]
    fn test_get_pmu_timing() {
        let footer = lines(
            "LogStartMDHTime:  39008572\nLogStopMDHTime:   39017760\n\
             LogStartMPCUTime: 39009937\nLogStopMPCUTime:  39019125\n6003",
        );
        assert_eq!(get_pmu_timing(&footer), ([39009937, 39019125], [39008572, 39017760]));
    }

    #[test]
    fn test_sanitize_plain_samples() {
        let raw = ["", "1733", "1725", "1721", "1718", "5003"];
        let mut diagnostics = Diagnostics::new();
        let sanitized = sanitize_raw_samples(&raw, &SentinelCodes::SIEMENS, &mut diagnostics).unwrap();
        assert_eq!(sanitized.samples, vec![1733.0, 1725.0, 1721.0, 1718.0]);
        assert!(sanitized.trigger_markers.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_sanitize_without_end_code_warns() {
        let raw = ["", "1733", "1725", "1721"];
        let mut diagnostics = Diagnostics::new();
        let sanitized = sanitize_raw_samples(&raw, &SentinelCodes::SIEMENS, &mut diagnostics).unwrap();
        assert_eq!(sanitized.samples, vec![1733.0, 1725.0, 1721.0]);
        assert!(!sanitized.end_of_recording);
        assert!(diagnostics.contains(&Warning::EndOfRecordingNotFound));
    }

    #[test]
    fn test_sanitize_markers_and_truncation() {
        let raw = ["", "1733", "5000", "1725", "6000", "1721", "5003", "1718"];
        let mut diagnostics = Diagnostics::new();
        let sanitized = sanitize_raw_samples(&raw, &SentinelCodes::SIEMENS, &mut diagnostics).unwrap();

        assert_eq!(sanitized.samples.len(), 5);
        assert_eq!(sanitized.samples[0], 1733.0);
        assert!(sanitized.samples[1].is_nan());
        assert_eq!(sanitized.samples[2], 1725.0);
        assert!(sanitized.samples[3].is_nan());
        assert_eq!(sanitized.samples[4], 1721.0);
        assert_eq!(
            sanitized.trigger_markers,
            vec![
                TriggerMarker { index: 1, kind: MarkerKind::On },
                TriggerMarker { index: 3, kind: MarkerKind::Off },
            ]
        );
        // 触发位于第二个有效样本
        assert_eq!(in_band_trigger_indices(&sanitized.trigger_markers), vec![1]);
    }

    #[test]
    fn test_sanitize_rejects_garbage() {
        let raw = ["", "1733", "17x5"];
        let err = sanitize_raw_samples(&raw, &SentinelCodes::SIEMENS, &mut Diagnostics::new()).unwrap_err();
        assert!(matches!(err, PhysioError::InvalidSample(ref t) if t == "17x5"));
    }

    #[test]
    fn test_comment_blocks() {
        let line = "1 8 20 2 5002 LOGVERSION 102 6002 5002 Logging PULS signal: x 6002 1733";
        assert_eq!(comment_blocks(line), vec!["LOGVERSION 102", "Logging PULS signal: x"]);
    }

    #[test]
    fn test_after_last_comment_is_token_aware() {
        let line = "5002 a 6002 16002 6002x 1733";
        let offset = after_last_comment(line).unwrap();
        assert_eq!(&line[offset..], " 16002 6002x 1733");
        assert!(after_last_comment("1 2 3").is_none());
    }

    #[test]
    fn test_logging_declaration() {
        let blocks = vec![
            "LOGVERSION 102".to_string(),
            "Logging RESP signal: reduction factor = 1, RESP_SAMPLES_PER_SECOND = 50; RESP_SAMPLE_INTERVAL = 20000".to_string(),
        ];
        assert_eq!(logging_declaration(&blocks), Some(("RESP".to_string(), 50.0)));
        assert_eq!(logging_declaration(&blocks[..1]), None);
    }

    #[test]
    fn test_vb15a_header() {
        let log = parse_vb15a(&lines("1 3 20 280 1733 1725 5003\n6003"), "x.puls").unwrap();
        assert_eq!(log.kind, "PULS");
        assert_eq!(log.sampling_rate, 50.0);
        assert_eq!(log.raw_samples, vec!["", "1733", "1725", "5003"]);
        assert_eq!(log.mdh_time, [0, 0]);
    }

    #[test]
    fn test_vb15a_rejects_comment_blocks() {
        let text = "1 2 40 280 5002 Logging RESP signal: RESP_SAMPLES_PER_SECOND = 50; 6002 2048";
        let err = parse_vb15a(&lines(text), "x.resp").unwrap_err();
        assert_eq!(
            err.to_string(),
            "File does not seem to be a VB15A PMU file: 'x.resp': Expected: 'no comment blocks'; got: '5002'"
        );
    }

    #[test]
    fn test_revisions_are_exclusive() {
        let ve11c = lines("1 8 20 2 5002 LOGVERSION 102 6002 5002 Logging PULS signal: PULS_SAMPLES_PER_SECOND = 400; 6002 1 5003");
        assert!(parse_vbx(&ve11c, "f").is_err());
        assert!(parse_vb15a(&ve11c, "f").is_err());

        let vbx = lines("1 2 40 280 5002 Logging RESP signal: RESP_SAMPLES_PER_SECOND = 50; 6002 1 5003");
        assert!(parse_ve11c(&vbx, "f").is_err());
        assert_eq!(parse_vbx(&vbx, "f").unwrap().raw_samples, vec!["", "1", "5003"]);
    }

    #[test]
    fn test_physio_label() {
        assert_eq!(physio_label("PULS"), "cardiac");
        assert_eq!(physio_label("PULSE"), "cardiac");
        assert_eq!(physio_label("RESP"), "respiratory");
        assert_eq!(physio_label("EXT"), "trigger");
        assert_eq!(physio_label("ECG"), "ecg");
    }
}
