use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{PhysioError, Result};
use crate::trigger::digitize_analog;
use crate::types::PhysioSignal;
use crate::TRIGGER_LABEL;

/// A collection of physiological signals plus sidecar attributes
///
/// Signals keep their insertion order. Attributes are written verbatim into
/// every JSON sidecar produced from this collection.
///
/// # Examples
///
/// ```rust
/// use bidsphysio::{PhysioData, PhysioSignal};
///
/// let mut physio = PhysioData::new();
/// physio.append_signal(PhysioSignal::new("cardiac", 4.0, 0.0, vec![1.0, 2.0, 3.0, 4.0]));
/// physio.append_signal(PhysioSignal::new("trigger", 4.0, 0.0, vec![0.0, 1.0, 0.0, 1.0]));
/// physio.set_attribute("RecordedEye", "Right")?;
///
/// assert_eq!(physio.labels(), vec!["cardiac", "trigger"]);
/// assert_eq!(physio.get_trigger_timing()?, vec![0.25, 0.75]);
/// # Ok::<(), bidsphysio::PhysioError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct PhysioData {
    pub signals: Vec<PhysioSignal>,
    attributes: Map<String, Value>,
}

impl PhysioData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_signals(signals: Vec<PhysioSignal>) -> Self {
        PhysioData {
            signals,
            attributes: Map::new(),
        }
    }

    pub fn labels(&self) -> Vec<&str> {
        self.signals.iter().map(|s| s.label.as_str()).collect()
    }

    /// Appends a signal; duplicate labels are not merged
    pub fn append_signal(&mut self, signal: PhysioSignal) {
        self.signals.push(signal);
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn signal(&self, label: &str) -> Option<&PhysioSignal> {
        self.signals.iter().find(|s| s.label == label)
    }

    /// Index of the signal labeled `trigger` (case-insensitive)
    pub fn trigger_index(&self) -> Option<usize> {
        self.signals
            .iter()
            .position(|s| s.label.eq_ignore_ascii_case(TRIGGER_LABEL))
    }

    pub fn trigger_signal(&self) -> Option<&PhysioSignal> {
        self.trigger_index().map(|i| &self.signals[i])
    }

    /// Replaces the analog trigger channel with its 0/1 digitization
    ///
    /// The histogram threshold from [`crate::trigger::histogram_threshold`]
    /// is used. A channel with no finite value digitizes to all zeros.
    ///
    /// # Errors
    ///
    /// * `PhysioError::MissingTrigger` - no signal is labeled `trigger`
    pub fn digitize_trigger(&mut self) -> Result<()> {
        let idx = self.trigger_index().ok_or(PhysioError::MissingTrigger)?;
        let analog = &self.signals[idx];
        let digital = digitize_analog(&analog.signal)
            .unwrap_or_else(|| vec![0.0; analog.samples_count()]);
        self.signals[idx] = analog.with_values(digital);
        Ok(())
    }

    /// Sampling times at which the (digitized) trigger equals 1
    ///
    /// # Errors
    ///
    /// * `PhysioError::MissingTrigger` - no signal is labeled `trigger`
    pub fn get_trigger_timing(&self) -> Result<Vec<f64>> {
        let trigger = self.trigger_signal().ok_or(PhysioError::MissingTrigger)?;
        let times = trigger.sampling_times();
        Ok(times
            .iter()
            .zip(&trigger.signal)
            .filter(|(_, &v)| v == 1.0)
            .map(|(&t, _)| t)
            .collect())
    }

    /// Stamps every signal with the time of the first trigger
    pub fn set_neural_start_time(&mut self, neural_start_time: f64) {
        for signal in &mut self.signals {
            signal.neural_start_time = Some(neural_start_time);
        }
    }

    /// Fills timing gaps of every signal with NaN placeholders
    pub fn plug_missing_data(&mut self) {
        for signal in &mut self.signals {
            signal.plug_missing_data();
        }
    }

    /// Sets a sidecar attribute, replacing any previous value for `key`
    pub fn set_attribute<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> Result<()> {
        self.attributes.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub(crate) fn with_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes = attributes;
        self
    }
}
