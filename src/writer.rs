use std::borrow::Cow;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{PhysioError, Result};
use crate::physio::PhysioData;
use crate::types::PhysioSignal;
use crate::utils::format_sample;

/// Sidecar keys owned by the writer; attributes cannot override them
pub const RESERVED_SIDECAR_KEYS: [&str; 3] = ["SamplingFrequency", "StartTime", "Columns"];

/// Signals exported together into one `_physio` file pair
///
/// Every member shares the sampling rate and the trigger-relative start
/// time, so the group maps onto one TSV table with one column per signal.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalGroup {
    /// Indices into [`PhysioData::signals`], in insertion order
    pub members: Vec<usize>,
    pub samples_per_second: f64,
    pub t_start: f64,
}

/// Partitions signals by `(samples_per_second, t_start)`
///
/// Groups appear in the order their first member appears. The key compares
/// the exact bit patterns, so `0.1 + 0.2` and `0.3` are different groups.
///
/// ```rust
/// use bidsphysio::{PhysioData, PhysioSignal};
/// use bidsphysio::writer::group_signals;
///
/// let physio = PhysioData::from_signals(vec![
///     PhysioSignal::new("cardiac", 400.0, 0.0, vec![0.0; 8]),
///     PhysioSignal::new("respiratory", 50.0, 0.0, vec![0.0; 1]),
///     PhysioSignal::new("trigger", 400.0, 0.0, vec![0.0; 8]),
/// ]);
/// let groups = group_signals(&physio);
/// assert_eq!(groups.len(), 2);
/// assert_eq!(groups[0].members, vec![0, 2]);
/// assert_eq!(groups[1].members, vec![1]);
/// ```
pub fn group_signals(physio: &PhysioData) -> Vec<SignalGroup> {
    group_indices(physio.signals.iter().enumerate())
}

fn group_indices<'a>(signals: impl Iterator<Item = (usize, &'a PhysioSignal)>) -> Vec<SignalGroup> {
    let mut groups: Vec<SignalGroup> = Vec::new();
    for (idx, signal) in signals {
        let rate = signal.samples_per_second;
        let t_start = signal.t_start();
        match groups.iter_mut().find(|g| {
            g.samples_per_second.to_bits() == rate.to_bits() && g.t_start.to_bits() == t_start.to_bits()
        }) {
            Some(group) => group.members.push(idx),
            None => groups.push(SignalGroup {
                members: vec![idx],
                samples_per_second: rate,
                t_start,
            }),
        }
    }
    groups
}

/// `<prefix>[_recording-<label>]_physio.json` / `.tsv.gz`
pub fn physio_file_names(prefix: &Path, recording: Option<&str>) -> (PathBuf, PathBuf) {
    let mut base = prefix.as_os_str().to_os_string();
    if let Some(label) = recording {
        base.push(format!("_recording-{}", label));
    }
    base.push("_physio");

    let mut json = base.clone();
    json.push(".json");
    let mut data = base;
    data.push(".tsv.gz");
    (PathBuf::from(json), PathBuf::from(data))
}

/// Creates the directory that will hold files named after `prefix`
pub fn ensure_output_dir(prefix: &Path) -> Result<()> {
    if let Some(parent) = prefix.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// `_recording-` label of a later group, numbered when the label is taken
///
/// Two groups led by the same label (e.g. two pulse logs started at
/// different times) become `cardiac` and `cardiac2`.
fn recording_qualifier(label: &str, used: &mut HashSet<String>) -> String {
    let mut qualifier = label.to_string();
    let mut n = 2;
    while used.contains(&qualifier) {
        qualifier = format!("{}{}", label, n);
        n += 1;
    }
    if qualifier != label {
        debug!("Group label '{}' already used, writing it as '{}'", label, qualifier);
    }
    used.insert(qualifier.clone());
    qualifier
}

/// One planned file pair: its names and the columns that go in it
struct PlannedGroup<'a> {
    json_path: PathBuf,
    data_path: PathBuf,
    samples_per_second: f64,
    t_start: f64,
    columns: Vec<Cow<'a, PhysioSignal>>,
}

/// BIDS physiology exporter
///
/// Files are named after a prefix such as `sub-01/func/sub-01_task-rest`.
/// The first signal group gets the plain `<prefix>_physio` name, every other
/// group is qualified with `_recording-<first label>`.
///
/// All groups are validated before the first file is written, so a failed
/// export leaves no partial output behind.
///
/// # Examples
///
/// ```rust
/// use bidsphysio::{PhysioData, PhysioSignal, PhysioWriter};
///
/// # let dir = tempfile::tempdir()?;
/// # let prefix = dir.path().join("sub-01_task-rest");
/// let mut physio = PhysioData::new();
/// physio.append_signal(PhysioSignal::new("cardiac", 4.0, 0.0, vec![1.0, 2.0, 3.0, 4.0]));
/// physio.append_signal(PhysioSignal::new("respiratory", 2.0, 0.0, vec![5.0, 6.0]));
///
/// let written = PhysioWriter::new(&prefix).save_to_bids(&physio)?;
/// assert_eq!(written.len(), 4);
/// assert!(written[0].ends_with("sub-01_task-rest_physio.json"));
/// assert!(written[2].ends_with("sub-01_task-rest_recording-respiratory_physio.json"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct PhysioWriter {
    prefix: PathBuf,
    compression: Compression,
}

impl PhysioWriter {
    pub fn new<P: AsRef<Path>>(prefix: P) -> Self {
        PhysioWriter {
            prefix: prefix.as_ref().to_path_buf(),
            compression: Compression::default(),
        }
    }

    /// gzip level for the TSV tables (0-9)
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression = Compression::new(level.min(9));
        self
    }

    /// Writes one JSON + TSV.gz pair per signal group
    ///
    /// Returns the written paths, JSON before data, in group order.
    ///
    /// # Errors
    ///
    /// * `PhysioError::InvalidSamplingRate` - a group's rate is not positive and finite
    /// * `PhysioError::GroupLengthMismatch` - signals of one group differ in length
    /// * `PhysioError::Io` - the files cannot be written
    pub fn save_to_bids(&self, physio: &PhysioData) -> Result<Vec<PathBuf>> {
        let groups = group_signals(physio);
        let planned = self.plan(
            groups
                .into_iter()
                .map(|g| {
                    let columns = g.members.iter().map(|&i| Cow::Borrowed(&physio.signals[i])).collect();
                    (g, columns)
                })
                .collect(),
        );
        self.write_planned(planned, physio.attributes())
    }

    /// Like [`save_to_bids`](Self::save_to_bids), but every group gets its own
    /// `trigger` column resampled onto the group's timeline
    ///
    /// The trigger signal itself is not exported as a separate group. Data
    /// without a trigger, or with nothing but a trigger, is exported with
    /// [`save_to_bids`](Self::save_to_bids).
    pub fn save_to_bids_with_trigger(&self, physio: &PhysioData) -> Result<Vec<PathBuf>> {
        let trigger_idx = match physio.trigger_index() {
            Some(idx) if physio.len() > 1 => idx,
            _ => return self.save_to_bids(physio),
        };
        let trigger_times = physio.get_trigger_timing()?;

        let groups = group_indices(
            physio
                .signals
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != trigger_idx),
        );
        let planned = self.plan(
            groups
                .into_iter()
                .map(|g| {
                    let mut columns: Vec<Cow<'_, PhysioSignal>> =
                        g.members.iter().map(|&i| Cow::Borrowed(&physio.signals[i])).collect();
                    let leader = &physio.signals[g.members[0]];
                    let events = leader.calculate_trigger_events(&trigger_times);
                    columns.push(Cow::Owned(leader.matching_trigger_signal(events)));
                    (g, columns)
                })
                .collect(),
        );
        self.write_planned(planned, physio.attributes())
    }

    fn plan<'a>(&self, groups: Vec<(SignalGroup, Vec<Cow<'a, PhysioSignal>>)>) -> Vec<PlannedGroup<'a>> {
        let mut used = HashSet::new();
        groups
            .into_iter()
            .enumerate()
            .map(|(n, (group, columns))| {
                let qualifier = (n > 0).then(|| recording_qualifier(&columns[0].label, &mut used));
                let (json_path, data_path) = physio_file_names(&self.prefix, qualifier.as_deref());
                PlannedGroup {
                    json_path,
                    data_path,
                    samples_per_second: group.samples_per_second,
                    t_start: group.t_start,
                    columns,
                }
            })
            .collect()
    }

    fn write_planned(&self, planned: Vec<PlannedGroup<'_>>, attributes: &Map<String, Value>) -> Result<Vec<PathBuf>> {
        for (n, group) in planned.iter().enumerate() {
            validate_group(n, group.samples_per_second, &group.columns)?;
        }
        ensure_output_dir(&self.prefix)?;

        let mut written = Vec::with_capacity(planned.len() * 2);
        for group in planned {
            let signals: Vec<&PhysioSignal> = group.columns.iter().map(|c| &**c).collect();
            write_sidecar(&group.json_path, group.samples_per_second, group.t_start, &signals, attributes)?;
            write_table(&group.data_path, &group.columns, self.compression)?;
            info!(
                "Wrote {} ({} columns, {} rows)",
                group.data_path.display(),
                signals.len(),
                group.columns.first().map_or(0, |c| c.samples_count())
            );
            written.push(group.json_path);
            written.push(group.data_path);
        }
        Ok(written)
    }
}

fn validate_group(group: usize, rate: f64, columns: &[Cow<'_, PhysioSignal>]) -> Result<()> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(PhysioError::InvalidSamplingRate {
            label: columns.first().map(|c| c.label.clone()).unwrap_or_default(),
            rate,
        });
    }
    let expected = columns.first().map_or(0, |c| c.samples_count());
    if let Some(bad) = columns.iter().find(|c| c.samples_count() != expected) {
        return Err(PhysioError::GroupLengthMismatch {
            group,
            expected,
            got: bad.samples_count(),
        });
    }
    Ok(())
}

/// Integral rates are written as JSON integers (`400`, not `400.0`)
fn frequency_value(rate: f64) -> Value {
    if rate.fract() == 0.0 && rate.abs() < i64::MAX as f64 {
        Value::from(rate as i64)
    } else {
        Value::from(rate)
    }
}

fn write_sidecar(
    path: &Path,
    rate: f64,
    t_start: f64,
    columns: &[&PhysioSignal],
    attributes: &Map<String, Value>,
) -> Result<()> {
    let mut sidecar = Map::new();
    sidecar.insert("SamplingFrequency".to_string(), frequency_value(rate));
    sidecar.insert("StartTime".to_string(), Value::from(t_start));
    sidecar.insert(
        "Columns".to_string(),
        Value::Array(columns.iter().map(|c| Value::from(c.label.as_str())).collect()),
    );
    // 有单位的列写成 "<label>": {"Units": ...}
    for column in columns.iter().filter(|c| !c.units.is_empty()) {
        if RESERVED_SIDECAR_KEYS.contains(&column.label.as_str()) {
            continue;
        }
        let mut description = Map::new();
        description.insert("Units".to_string(), Value::from(column.units.as_str()));
        sidecar.insert(column.label.clone(), Value::Object(description));
    }
    for (key, value) in attributes {
        if RESERVED_SIDECAR_KEYS.contains(&key.as_str()) {
            warn!("Attribute '{}' clashes with a sidecar field and is not written", key);
            continue;
        }
        sidecar.insert(key.clone(), value.clone());
    }
    write_json(path, &Value::Object(sidecar))
}

/// Pretty-prints `value` with four-space indentation
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    out.write_all(b"\n")?;
    out.flush()?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Headerless, tab-separated, gzip-compressed sample table
fn write_table(path: &Path, columns: &[Cow<'_, PhysioSignal>], compression: Compression) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    let mut encoder = GzEncoder::new(file, compression);
    let rows = columns.first().map_or(0, |c| c.samples_count());

    let mut line = String::new();
    for row in 0..rows {
        line.clear();
        for (k, column) in columns.iter().enumerate() {
            if k > 0 {
                line.push('\t');
            }
            line.push_str(&format_sample(column.signal[row]));
        }
        line.push('\n');
        encoder.write_all(line.as_bytes())?;
    }
    encoder.finish()?.flush()?;
    Ok(())
}

/// Strips the suffixes the file names end with, in order, when present
fn strip_suffixes(name: &str, suffixes: &[&str]) -> String {
    let mut stem = name;
    for suffix in suffixes {
        stem = stem.strip_suffix(suffix).unwrap_or(stem);
    }
    stem.to_string()
}

/// Checks that `physio` maps onto a single file pair
fn single_group(physio: &PhysioData) -> Result<SignalGroup> {
    let mut groups = group_signals(physio);
    if groups.len() > 1 {
        let keys: Vec<String> = groups
            .iter()
            .map(|g| format!("{} Hz at {} s", g.samples_per_second, g.t_start))
            .collect();
        return Err(PhysioError::InhomogeneousGroup(keys.join(", ")));
    }
    groups
        .pop()
        .ok_or_else(|| PhysioError::InvalidFormat("no signals to export".to_string()))
}

/// Writes the JSON sidecar of a single-group collection
///
/// The name is normalized to end in `_physio.json`, so `out`, `out_physio`
/// and `out_physio.json` all produce `out_physio.json`.
///
/// # Errors
///
/// * `PhysioError::InhomogeneousGroup` - signals differ in rate or start time
pub fn save_bids_json<P: AsRef<Path>>(physio: &PhysioData, path: P) -> Result<PathBuf> {
    let group = single_group(physio)?;
    let name = path.as_ref().to_string_lossy();
    let target = PathBuf::from(format!("{}_physio.json", strip_suffixes(&name, &[".json", "_physio"])));
    ensure_output_dir(&target)?;
    write_sidecar(
        &target,
        group.samples_per_second,
        group.t_start,
        &physio.signals.iter().collect::<Vec<_>>(),
        physio.attributes(),
    )?;
    Ok(target)
}

/// Writes the TSV.gz table of a single-group collection
///
/// The name is normalized to end in `_physio.tsv.gz`.
///
/// # Errors
///
/// * `PhysioError::InhomogeneousGroup` - signals differ in rate or start time
/// * `PhysioError::GroupLengthMismatch` - signals differ in length
pub fn save_bids_data<P: AsRef<Path>>(physio: &PhysioData, path: P) -> Result<PathBuf> {
    let group = single_group(physio)?;
    let columns: Vec<Cow<'_, PhysioSignal>> = physio.signals.iter().map(Cow::Borrowed).collect();
    validate_group(0, group.samples_per_second, &columns)?;

    let name = path.as_ref().to_string_lossy();
    let target = PathBuf::from(format!(
        "{}_physio.tsv.gz",
        strip_suffixes(&name, &[".gz", ".tsv", "_physio"])
    ));
    ensure_output_dir(&target)?;
    write_table(&target, &columns, Compression::default())?;
    Ok(target)
}
