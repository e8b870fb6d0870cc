pub mod csv;
pub mod eeg;
pub mod text;

use crate::{error::SpikeResult, signal::Signal};

/// Samples loaded from disk, with the sampling rate when the file declares one.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub samples: Vec<f64>,
    pub fs: Option<f64>,
}

impl Recording {
    /// Declared rate, or `fallback` when the file carries none.
    pub fn fs_or(&self, fallback: f64) -> f64 {
        self.fs.unwrap_or(fallback)
    }

    pub fn into_signal(self, fallback_fs: f64) -> SpikeResult<Signal> {
        let fs = self.fs_or(fallback_fs);
        Signal::new(self.samples, fs)
    }
}
