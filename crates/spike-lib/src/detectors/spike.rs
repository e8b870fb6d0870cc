use crate::{
    detectors::{
        baseline::{residual, ResidualMode},
        peaks::{extract_peaks, PeakConstraints},
        threshold::{estimate_threshold, ThresholdStat},
    },
    error::{SpikeError, SpikeResult},
    filters::{BandLimit, MorphologicalFilter, StructuringElement},
    signal::{PeakSet, Signal},
};
use log::debug;
use serde::{Deserialize, Serialize};

/// Configurable parameters for the morphological spike detection pipeline.
///
/// Defaults are starting points for calibration, not tuned values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpikeDetectorConfig {
    /// Structuring element for the OCCO envelope.
    pub structuring: StructuringElement,
    pub residual_mode: ResidualMode,
    pub threshold_stat: ThresholdStat,
    /// Scale applied to the residual extrema statistic.
    pub threshold_multiplier: f64,
    /// Optional band limiting before the morphological stage.
    pub band_limit: Option<BandLimit>,
    /// Minimum peak width at half prominence (samples).
    pub min_width: usize,
    pub min_prominence: f64,
}

impl Default for SpikeDetectorConfig {
    fn default() -> Self {
        Self {
            structuring: StructuringElement::flat(5),
            residual_mode: ResidualMode::Amplitude,
            threshold_stat: ThresholdStat::Median,
            threshold_multiplier: 8.0,
            band_limit: None,
            min_width: 1,
            min_prominence: 0.0,
        }
    }
}

impl SpikeDetectorConfig {
    /// Reject parameter combinations no window could succeed with.
    pub fn validate(&self) -> SpikeResult<()> {
        if !self.threshold_multiplier.is_finite() || self.threshold_multiplier <= 0.0 {
            return Err(SpikeError::NumericInstability(format!(
                "threshold multiplier must be positive, got {}",
                self.threshold_multiplier
            )));
        }
        if !self.min_prominence.is_finite() {
            return Err(SpikeError::NumericInstability(
                "minimum prominence must be finite".into(),
            ));
        }
        if let Some(p) = self.structuring.parabola {
            if !(p.a.is_finite() && p.b.is_finite()) {
                return Err(SpikeError::NumericInstability(
                    "parabola coefficients must be finite".into(),
                ));
            }
            if !p.is_concave() {
                return Err(SpikeError::NumericInstability(format!(
                    "parabola must have a <= 0 and b >= 0, got a = {}, b = {}",
                    p.a, p.b
                )));
            }
        }
        Ok(())
    }
}

/// Result of running the pipeline over one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeakReport {
    pub peaks_count: usize,
    pub threshold_used: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_indices: Option<Vec<usize>>,
}

impl PeakReport {
    pub fn empty() -> Self {
        Self {
            peaks_count: 0,
            threshold_used: 0.0,
            peak_indices: None,
        }
    }

    pub fn from_peaks(peaks: PeakSet, threshold: f64, include_indices: bool) -> Self {
        Self {
            peaks_count: peaks.len(),
            threshold_used: threshold,
            peak_indices: include_indices.then_some(peaks.indices),
        }
    }
}

/// Intermediate sequences of one pipeline run, for inspection and tests.
#[derive(Debug, Clone)]
pub struct SpikeTrace {
    pub filtered: Vec<f64>,
    pub envelope: Vec<f64>,
    pub residual: Vec<f64>,
    /// `None` when the residual had no interior extrema.
    pub threshold: Option<f64>,
    pub peaks: PeakSet,
}

/// Run band limiting, OCCO envelope, baseline subtraction, thresholding and
/// peak extraction, keeping every intermediate.
pub fn trace_spikes(signal: &Signal, cfg: &SpikeDetectorConfig) -> SpikeResult<SpikeTrace> {
    cfg.validate()?;
    let filtered = match &cfg.band_limit {
        Some(limit) => limit.apply(signal.samples(), signal.fs())?,
        None => signal.samples().to_vec(),
    };
    let envelope = MorphologicalFilter::new(cfg.structuring).occo(&filtered);
    let residual = residual(&filtered, &envelope, cfg.residual_mode);

    let threshold =
        match estimate_threshold(&residual, cfg.threshold_stat, cfg.threshold_multiplier) {
            Ok(t) => Some(t),
            Err(SpikeError::InsufficientData(reason)) => {
                debug!("no threshold for {} samples: {}", residual.len(), reason);
                None
            }
            Err(other) => return Err(other),
        };

    let peaks = match threshold {
        Some(height) => extract_peaks(
            &residual,
            &PeakConstraints {
                height,
                min_width: cfg.min_width,
                min_prominence: cfg.min_prominence,
            },
        ),
        None => PeakSet::default(),
    };
    debug!(
        "{} samples, threshold {:?}, {} peak(s)",
        residual.len(),
        threshold,
        peaks.len()
    );

    Ok(SpikeTrace {
        filtered,
        envelope,
        residual,
        threshold,
        peaks,
    })
}

/// Detect spikes in a whole signal.
pub fn detect_spikes(signal: &Signal, cfg: &SpikeDetectorConfig) -> SpikeResult<PeakSet> {
    Ok(trace_spikes(signal, cfg)?.peaks)
}

/// Detect spikes and summarise them as a report.
pub fn run_spike_pipeline(
    signal: &Signal,
    cfg: &SpikeDetectorConfig,
    include_indices: bool,
) -> SpikeResult<PeakReport> {
    let trace = trace_spikes(signal, cfg)?;
    Ok(PeakReport::from_peaks(
        trace.peaks,
        trace.threshold.unwrap_or(0.0),
        include_indices,
    ))
}
