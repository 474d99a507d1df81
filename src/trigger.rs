//! Trigger reconstruction and sampling-rate checks
//!
//! Two sources of scanner triggers are supported:
//!
//! - **In-band** markers: PMU logs interleave "trigger on/off" codes with the
//!   samples. The sanitizer records where they were, and
//!   [`in_band_trigger_indices`] maps them onto the cleaned sample stream.
//! - **Out-of-band** analog channels: eye trackers record the scanner pulse on
//!   an auxiliary input. [`histogram_threshold`] finds the two dominant levels
//!   and [`digitize`] binarizes the channel around their midpoint.
//!
//! ```rust
//! use bidsphysio::trigger::{histogram_threshold, digitize};
//!
//! let input = vec![0.0, 0.0, 5.0, 0.0, 0.0, 5.0, 0.0];
//! let threshold = histogram_threshold(&input).unwrap();
//! assert_eq!(digitize(&input, threshold), vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0]);
//! ```

use crate::error::{PhysioError, Result};

/// 直方图的分箱数
pub const HISTOGRAM_BINS: usize = 10;

/// Values an unused auxiliary channel is stuck at
pub const CONSTANT_SENTINELS: [f64; 4] = [0.0, 127.0, 32768.0, -32768.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    On,
    Off,
}

/// Position of an in-band trigger code in the sanitized (NaN-bearing) stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerMarker {
    pub index: usize,
    pub kind: MarkerKind,
}

/// Maps trigger-on markers onto indices of the NaN-free sample stream
///
/// Each marker occupies one NaN slot, so the sample following a marker sits
/// at `index - markers_before_it` once the NaNs are dropped.
pub fn in_band_trigger_indices(markers: &[TriggerMarker]) -> Vec<usize> {
    let mut indices: Vec<usize> = markers
        .iter()
        .enumerate()
        .filter(|(_, marker)| marker.kind == MarkerKind::On)
        .map(|(ordinal, marker)| marker.index - ordinal)
        .collect();
    indices.dedup();
    indices
}

/// Absolute times of sample indices: `start + index / rate`
pub fn trigger_times(indices: &[usize], start_time: f64, sampling_rate: f64) -> Vec<f64> {
    indices
        .iter()
        .map(|&i| start_time + i as f64 / sampling_rate)
        .collect()
}

/// True when every value equals the same unused-channel sentinel
pub fn is_constant_sentinel(values: &[f64]) -> bool {
    CONSTANT_SENTINELS
        .iter()
        .any(|&sentinel| values.iter().all(|&v| v == sentinel))
}

/// 10-bin histogram over the finite range: (counts, lower edge, bin width)
fn histogram(values: &[f64]) -> Option<(Vec<usize>, f64, f64)> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }

    let mut lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // 与 numpy 一致：常数序列时扩展为 [min-0.5, max+0.5]
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / HISTOGRAM_BINS as f64;

    let mut counts = vec![0usize; HISTOGRAM_BINS];
    for v in finite {
        // 最后一个分箱包含右端点
        let bin = (((v - lo) / width) as usize).min(HISTOGRAM_BINS - 1);
        counts[bin] += 1;
    }
    Some((counts, lo, width))
}

fn argmax(counts: &[usize]) -> usize {
    let mut best = 0;
    for (i, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = i;
        }
    }
    best
}

/// Threshold halfway between the baseline and active levels of a trigger channel
///
/// The baseline is the center of the most populated bin; that bin is then
/// emptied and the next most populated bin gives the active level. Returns
/// `None` when the channel holds no finite value.
pub fn histogram_threshold(values: &[f64]) -> Option<f64> {
    let (mut counts, lo, width) = histogram(values)?;

    let first = argmax(&counts);
    let baseline = lo + first as f64 * width + width / 2.0;
    counts[first] = 0;
    let second = argmax(&counts);
    let active = lo + second as f64 * width + width / 2.0;

    Some((baseline + active) / 2.0)
}

/// Binarizes around `threshold`: above → 1, otherwise (and NaN) → 0
pub fn digitize(values: &[f64], threshold: f64) -> Vec<f64> {
    values
        .iter()
        .map(|&v| if v > threshold { 1.0 } else { 0.0 })
        .collect()
}

/// Histogram-digitizes `values`; `None` when there is nothing to threshold
pub fn digitize_analog(values: &[f64]) -> Option<Vec<f64>> {
    histogram_threshold(values).map(|threshold| digitize(values, threshold))
}

/// First sample where the digitized channel fires
pub fn first_trigger_index(values: &[f64]) -> Option<usize> {
    digitize_analog(values)?.iter().position(|&v| v != 0.0)
}

/// Validates a declared sampling rate against the log timing
///
/// `log_times_ms` are the start/stop stamps in milliseconds. The observed
/// rate is `(n_samples - 1) / duration` and must be within `tolerance`
/// (relative) of the declared one.
///
/// Returns the observed rate, or `None` when the log times cannot support a
/// check (missing tags, fewer than two samples).
///
/// # Errors
///
/// * `PhysioError::InvalidTolerance` - `tolerance` is not in (0, 1)
/// * `PhysioError::SamplingRateMismatch` - the rates differ by more than `tolerance`
///
/// # Examples
///
/// ```rust
/// use bidsphysio::trigger::test_sampling_rate;
///
/// // 99 samples over 10 s is 9.8 Hz, close enough to 10 Hz
/// assert!(test_sampling_rate(10.0, 99, [0.0, 10000.0], 0.1).is_ok());
/// // but nowhere near 1 Hz
/// assert!(test_sampling_rate(1.0, 100, [0.0, 10000.0], 0.1).is_err());
/// ```
pub fn test_sampling_rate(
    sampling_rate: f64,
    n_samples: usize,
    log_times_ms: [f64; 2],
    tolerance: f64,
) -> Result<Option<f64>> {
    if !(tolerance > 0.0 && tolerance < 1.0) {
        return Err(PhysioError::InvalidTolerance(tolerance));
    }

    let duration = (log_times_ms[1] - log_times_ms[0]) / 1000.0;
    if duration <= 0.0 || n_samples < 2 {
        return Ok(None);
    }

    let observed = (n_samples - 1) as f64 / duration;
    if ((observed - sampling_rate) / sampling_rate).abs() > tolerance {
        return Err(PhysioError::SamplingRateMismatch {
            expected: sampling_rate,
            observed,
        });
    }
    Ok(Some(observed))
}
