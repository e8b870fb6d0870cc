use crate::error::{SpikeError, SpikeResult};
use serde::{Deserialize, Serialize};

/// Single-channel, uniformly sampled recording.
///
/// Samples are validated once on construction and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    fs: f64,
    data: Vec<f64>,
}

impl Signal {
    /// Build a signal from samples and a sampling frequency in Hz.
    ///
    /// Rejects non-positive rates, fewer than two samples and non-finite samples.
    pub fn new(data: Vec<f64>, fs: f64) -> SpikeResult<Self> {
        if !fs.is_finite() || fs <= 0.0 {
            return Err(SpikeError::InvalidSamplingRate(format!(
                "sampling frequency must be positive, got {}",
                fs
            )));
        }
        if data.len() < 2 {
            return Err(SpikeError::InsufficientData(format!(
                "need at least 2 samples, got {}",
                data.len()
            )));
        }
        if let Some(idx) = data.iter().position(|x| !x.is_finite()) {
            return Err(SpikeError::NumericInstability(format!(
                "sample {} is not finite",
                idx
            )));
        }
        Ok(Self { fs, data })
    }

    pub fn fs(&self) -> f64 {
        self.fs
    }

    pub fn samples(&self) -> &[f64] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }

    /// Duration in minutes.
    pub fn duration_minutes(&self) -> f64 {
        self.duration() / 60.0
    }

    /// Sample index for a time offset in minutes, `round(minutes * 60 * fs)`.
    pub fn minutes_to_index(&self, minutes: f64) -> usize {
        (minutes * 60.0 * self.fs).round().max(0.0) as usize
    }
}

/// Strictly increasing sample indices of detected spikes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakSet {
    pub indices: Vec<usize>,
}

impl PeakSet {
    pub fn from_indices(mut indices: Vec<usize>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
