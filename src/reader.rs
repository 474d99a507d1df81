use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{PhysioError, Result};
use crate::physio::PhysioData;
use crate::types::PhysioSignal;
use crate::utils::parse_sample;

/// The fixed part of a `_physio.json` sidecar; other keys land in `extra`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PhysioSidecar {
    pub sampling_frequency: f64,
    pub start_time: f64,
    pub columns: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reader for BIDS physiology file pairs
///
/// Opens a `_physio.json` sidecar together with its `_physio.tsv.gz` table
/// and exposes the columns again as signals.
///
/// # Examples
///
/// ```rust
/// use bidsphysio::{BidsPhysioReader, PhysioData, PhysioSignal, PhysioWriter};
///
/// # let dir = tempfile::tempdir()?;
/// # let prefix = dir.path().join("sub-01");
/// let physio = PhysioData::from_signals(vec![
///     PhysioSignal::new("cardiac", 2.0, 0.0, vec![1.0, f64::NAN, 3.0]),
/// ]);
/// let written = PhysioWriter::new(&prefix).save_to_bids(&physio)?;
///
/// let reader = BidsPhysioReader::open(&written[0])?;
/// assert_eq!(reader.sidecar().columns, vec!["cardiac"]);
/// let column = reader.column("cardiac").unwrap();
/// assert_eq!(column[0], 1.0);
/// assert!(column[1].is_nan());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct BidsPhysioReader {
    sidecar: PhysioSidecar,
    rows: Vec<Vec<f64>>,
}

impl BidsPhysioReader {
    /// Opens `<name>_physio.json` and the matching `<name>_physio.tsv.gz`
    ///
    /// # Errors
    ///
    /// * `PhysioError::FileNotFound` - either file is missing
    /// * `PhysioError::Json` - the sidecar is not valid
    /// * `PhysioError::InvalidFormat` - a row does not match `Columns`
    pub fn open<P: AsRef<Path>>(json_path: P) -> Result<Self> {
        let json_path = json_path.as_ref();
        Self::open_pair(json_path, data_path_for(json_path))
    }

    pub fn open_pair<P: AsRef<Path>, Q: AsRef<Path>>(json_path: P, data_path: Q) -> Result<Self> {
        let sidecar: PhysioSidecar = serde_json::from_reader(BufReader::new(open_existing(json_path.as_ref())?))?;
        let rows = read_table(data_path.as_ref(), sidecar.columns.len())?;
        Ok(BidsPhysioReader { sidecar, rows })
    }

    pub fn sidecar(&self) -> &PhysioSidecar {
        &self.sidecar
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn column(&self, label: &str) -> Option<Vec<f64>> {
        let idx = self.sidecar.columns.iter().position(|c| c == label)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// Rebuilds the collection: one signal per column, extra keys as attributes
    ///
    /// `StartTime` becomes the physio start time, so the signals come back
    /// with the same trigger-relative start they were exported with.
    pub fn into_physio_data(self) -> PhysioData {
        let BidsPhysioReader { sidecar, rows } = self;
        let mut extra = sidecar.extra;
        let signals = sidecar
            .columns
            .iter()
            .enumerate()
            .map(|(idx, label)| {
                let signal = PhysioSignal::new(
                    label.clone(),
                    sidecar.sampling_frequency,
                    sidecar.start_time,
                    rows.iter().map(|row| row[idx]).collect(),
                );
                match take_units(&mut extra, label) {
                    Some(units) => signal.with_units(units),
                    None => signal,
                }
            })
            .collect();
        PhysioData::from_signals(signals).with_attributes(extra)
    }
}

/// 列描述 `"<label>": {"Units": ...}` 不作为普通属性保留
fn take_units(extra: &mut Map<String, Value>, label: &str) -> Option<String> {
    let units = extra.get(label)?.get("Units")?.as_str()?.to_string();
    extra.remove(label);
    Some(units)
}

fn data_path_for(json_path: &Path) -> PathBuf {
    let name = json_path.to_string_lossy();
    let stem = name.strip_suffix(".json").unwrap_or(&name);
    PathBuf::from(format!("{}.tsv.gz", stem))
}

fn open_existing(path: &Path) -> Result<File> {
    if !path.exists() {
        return Err(PhysioError::FileNotFound(path.display().to_string()));
    }
    Ok(File::open(path)?)
}

fn read_table(path: &Path, width: usize) -> Result<Vec<Vec<f64>>> {
    let reader = BufReader::new(GzDecoder::new(open_existing(path)?));
    let mut rows = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let row = line.split('\t').map(parse_sample).collect::<Result<Vec<f64>>>()?;
        if row.len() != width {
            return Err(PhysioError::InvalidFormat(format!(
                "{}: row {} has {} cells, expected {}",
                path.display(),
                n + 1,
                row.len(),
                width
            )));
        }
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_data_path_for() {
        assert_eq!(
            data_path_for(Path::new("out/sub-01_physio.json")),
            PathBuf::from("out/sub-01_physio.tsv.gz")
        );
    }

    #[test]
    fn test_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = BidsPhysioReader::open(dir.path().join("nope_physio.json")).unwrap_err();
        assert!(matches!(err, PhysioError::FileNotFound(_)));
    }

    #[test]
    fn test_ragged_row_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("x_physio.json");
        std::fs::write(&json, r#"{"SamplingFrequency": 1, "StartTime": 0, "Columns": ["a", "b"]}"#).unwrap();

        let mut gz = flate2::write::GzEncoder::new(
            File::create(dir.path().join("x_physio.tsv.gz")).unwrap(),
            flate2::Compression::default(),
        );
        gz.write_all(b"1\t2\n3\n").unwrap();
        gz.finish().unwrap();

        let err = BidsPhysioReader::open(&json).unwrap_err();
        assert!(err.to_string().contains("row 2 has 1 cells"));
    }

    #[test]
    fn test_units_restored_from_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let mut physio = PhysioData::from_signals(vec![
            PhysioSignal::new("eye1_x_coordinate", 2.0, 0.0, vec![400.0, 401.0]).with_units("pixel"),
            PhysioSignal::new("trigger", 2.0, 0.0, vec![0.0, 1.0]),
        ]);
        physio.set_attribute("RecordedEye", "Right").unwrap();
        let written = crate::writer::PhysioWriter::new(dir.path().join("sub-01"))
            .save_to_bids(&physio)
            .unwrap();

        let restored = BidsPhysioReader::open(&written[0]).unwrap().into_physio_data();
        assert_eq!(restored.signals[0].units, "pixel");
        assert_eq!(restored.signals[1].units, "");
        let keys: Vec<&String> = restored.attributes().keys().collect();
        assert_eq!(keys, ["RecordedEye"]);
    }
}
