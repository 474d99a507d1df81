use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use tracing::info;

use crate::error::Result;
use crate::types::Event;
use crate::utils::format_sample;
use crate::writer::{ensure_output_dir, write_json};

/// Column header of every events table
pub const EVENTS_HEADER: [&str; 4] = ["onset", "duration", "trial_type", "sample"];

/// Ordered list of task events, exported as a BIDS events table
///
/// ```rust
/// use bidsphysio::{Event, EventData};
///
/// let mut events = EventData::new();
/// events.append_event(Event { onset: 0.5, duration: 0.0, trial_type: "stim".into(), sample: 1500 });
/// assert_eq!(events.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventData {
    events: Vec<Event>,
}

impl EventData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_event(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Writes `<prefix>.tsv` (or `.tsv.gz`) and the `<prefix>.json` sidecar
    ///
    /// Returns the table path followed by the sidecar path.
    pub fn save_events_bids_data<P: AsRef<Path>>(&self, prefix: P, compress: bool) -> Result<Vec<PathBuf>> {
        let prefix = prefix.as_ref();
        ensure_output_dir(prefix)?;

        let stem = prefix.to_string_lossy();
        let table = PathBuf::from(format!("{}.tsv{}", stem, if compress { ".gz" } else { "" }));
        let sidecar = PathBuf::from(format!("{}.json", stem));

        let out = BufWriter::new(File::create(&table)?);
        if compress {
            let mut encoder = GzEncoder::new(out, Compression::default());
            self.write_rows(&mut encoder)?;
            encoder.finish()?.flush()?;
        } else {
            let mut out = out;
            self.write_rows(&mut out)?;
            out.flush()?;
        }

        write_json(&sidecar, &events_sidecar())?;
        info!("Wrote {} events to {}", self.events.len(), table.display());
        Ok(vec![table, sidecar])
    }

    fn write_rows<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "{}", EVENTS_HEADER.join("\t"))?;
        for event in &self.events {
            writeln!(
                out,
                "{}\t{}\t{}\t{}",
                format_sample(event.onset),
                format_sample(event.duration),
                sanitize_cell(&event.trial_type),
                event.sample
            )?;
        }
        Ok(())
    }
}

/// 制表符和换行会破坏 TSV 结构
fn sanitize_cell(text: &str) -> String {
    text.replace(['\t', '\n', '\r'], " ")
}

fn events_sidecar() -> serde_json::Value {
    json!({
        "onset": {
            "Description": "Onset of the event, relative to the first scanner trigger",
            "Units": "s"
        },
        "duration": {
            "Description": "Duration of the event",
            "Units": "s"
        },
        "trial_type": {
            "Description": "Message logged by the stimulus computer"
        },
        "sample": {
            "Description": "Eye-tracker timestamp of the message",
            "Units": "ms"
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn sample_events() -> EventData {
        let mut events = EventData::new();
        events.append_event(Event { onset: -1.5, duration: 0.0, trial_type: "TRIALID 1".into(), sample: 1000 });
        events.append_event(Event { onset: 0.25, duration: 0.0, trial_type: "tab\there".into(), sample: 2750 });
        events
    }

    #[test]
    fn test_save_plain_events() {
        let dir = tempfile::tempdir().unwrap();
        let written = sample_events()
            .save_events_bids_data(dir.path().join("sub-01_eventlist_raw"), false)
            .unwrap();
        assert!(written[0].ends_with("sub-01_eventlist_raw.tsv"));
        assert!(written[1].ends_with("sub-01_eventlist_raw.json"));

        let text = std::fs::read_to_string(&written[0]).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "onset\tduration\ttrial_type\tsample");
        assert_eq!(lines[1], "-1.5\t0\tTRIALID 1\t1000");
        assert_eq!(lines[2], "0.25\t0\ttab here\t2750");

        let sidecar: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&written[1]).unwrap()).unwrap();
        assert_eq!(sidecar["onset"]["Units"], "s");
    }

    #[test]
    fn test_save_compressed_events() {
        let dir = tempfile::tempdir().unwrap();
        let written = sample_events()
            .save_events_bids_data(dir.path().join("events"), true)
            .unwrap();
        assert!(written[0].ends_with("events.tsv.gz"));

        let mut text = String::new();
        flate2::read::GzDecoder::new(File::open(&written[0]).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text.lines().count(), 3);
    }
}
