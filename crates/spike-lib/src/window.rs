//! Minute-based windowing over long recordings.
//!
//! Window policy: requests are clipped to the available data. A window that
//! starts at or after the end of the signal yields an empty report, and a
//! trailing partial window in a sweep is processed as-is.

use crate::{
    detectors::spike::{run_spike_pipeline, PeakReport, SpikeDetectorConfig},
    error::{SpikeError, SpikeResult},
    signal::Signal,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Window request in minutes from the start of the recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSpec {
    #[serde(default)]
    pub start_minute: f64,
    /// `None` runs to the end of the signal.
    #[serde(default)]
    pub duration_minutes: Option<f64>,
}

impl WindowSpec {
    pub fn new(start_minute: f64, duration_minutes: Option<f64>) -> Self {
        Self {
            start_minute,
            duration_minutes,
        }
    }

    fn validate(&self) -> SpikeResult<()> {
        if !self.start_minute.is_finite() || self.start_minute < 0.0 {
            return Err(SpikeError::InvalidWindow(format!(
                "start minute must be a non-negative number, got {}",
                self.start_minute
            )));
        }
        if let Some(d) = self.duration_minutes {
            if !d.is_finite() || d <= 0.0 {
                return Err(SpikeError::InvalidWindow(format!(
                    "duration must be positive, got {} minute(s)",
                    d
                )));
            }
        }
        Ok(())
    }

    /// Half-open sample range, clipped to the signal. `None` when nothing is left.
    pub fn resolve(&self, signal: &Signal) -> SpikeResult<Option<Range<usize>>> {
        self.validate()?;
        let start = signal.minutes_to_index(self.start_minute);
        let end = match self.duration_minutes {
            Some(d) => signal
                .minutes_to_index(self.start_minute + d)
                .min(signal.len()),
            None => signal.len(),
        };
        if start >= end {
            return Ok(None);
        }
        Ok(Some(start..end))
    }
}

/// Report for one window plus where it sits in the recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowReport {
    pub minute: f64,
    pub start_index: usize,
    pub end_index: usize,
    #[serde(flatten)]
    pub report: PeakReport,
    /// Error kind when this window failed; the counts are then zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WindowReport {
    fn failed(minute: f64, range: Range<usize>, err: &SpikeError) -> Self {
        Self {
            minute,
            start_index: range.start,
            end_index: range.end,
            report: PeakReport::empty(),
            error: Some(err.kind().to_string()),
            message: Some(err.to_string()),
        }
    }
}

/// Per-window reports of a sweep and their folded total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub total_peaks: usize,
    pub windows: Vec<WindowReport>,
}

fn run_range(
    signal: &Signal,
    range: Range<usize>,
    cfg: &SpikeDetectorConfig,
    include_indices: bool,
) -> SpikeResult<PeakReport> {
    let slice = Signal::new(signal.samples()[range].to_vec(), signal.fs())?;
    run_spike_pipeline(&slice, cfg, include_indices)
}

/// Run the pipeline on one window. Errors propagate to the caller.
pub fn detect_window(
    signal: &Signal,
    spec: &WindowSpec,
    cfg: &SpikeDetectorConfig,
    include_indices: bool,
) -> SpikeResult<WindowReport> {
    let Some(range) = spec.resolve(signal)? else {
        debug!(
            "window at minute {} is past the end of a {:.3} minute signal",
            spec.start_minute,
            signal.duration_minutes()
        );
        let end = signal.len();
        return Ok(WindowReport {
            minute: spec.start_minute,
            start_index: end,
            end_index: end,
            report: PeakReport::empty(),
            error: None,
            message: None,
        });
    };
    let report = run_range(signal, range.clone(), cfg, include_indices)?;
    Ok(WindowReport {
        minute: spec.start_minute,
        start_index: range.start,
        end_index: range.end,
        report,
        error: None,
        message: None,
    })
}

/// Consecutive, non-overlapping windows of `duration_minutes` from
/// `start_minute` to the end of the signal. A failing window is recorded with
/// zero peaks and its error; the sweep itself only fails on a bad spec.
pub fn sweep_windows(
    signal: &Signal,
    start_minute: f64,
    duration_minutes: f64,
    cfg: &SpikeDetectorConfig,
    include_indices: bool,
) -> SpikeResult<SweepReport> {
    WindowSpec::new(start_minute, Some(duration_minutes)).validate()?;
    if duration_minutes * 60.0 * signal.fs() < 1.0 {
        return Err(SpikeError::InvalidWindow(format!(
            "{} minute(s) is shorter than one sample",
            duration_minutes
        )));
    }

    let mut windows = Vec::new();
    for k in 0usize.. {
        let minute = start_minute + k as f64 * duration_minutes;
        let start = signal.minutes_to_index(minute);
        if start >= signal.len() {
            break;
        }
        let end = signal
            .minutes_to_index(minute + duration_minutes)
            .min(signal.len());
        if end <= start {
            break;
        }
        let window = match run_range(signal, start..end, cfg, include_indices) {
            Ok(report) => WindowReport {
                minute,
                start_index: start,
                end_index: end,
                report,
                error: None,
                message: None,
            },
            Err(err) => {
                warn!("window at minute {} failed: {}", minute, err);
                WindowReport::failed(minute, start..end, &err)
            }
        };
        windows.push(window);
    }

    let total_peaks = windows.iter().map(|w| w.report.peaks_count).sum();
    debug!(
        "swept {} window(s), {} peak(s) in total",
        windows.len(),
        total_peaks
    );
    Ok(SweepReport {
        total_peaks,
        windows,
    })
}
