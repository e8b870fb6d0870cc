//! JSON request/response surface of the detector.
//!
//! A request is either a single detection (`signal` + `samplingFrequency`
//! with optional window and parameter overrides) or a batch
//! `{"signals": [...]}` whose items are answered independently. Failures are
//! always answered with a well-formed `{"error": kind, "message": ...}` object.

use crate::{
    detectors::{ResidualMode, SpikeDetectorConfig, ThresholdStat},
    error::SpikeError,
    filters::{BandLimit, Parabola},
    signal::Signal,
    window::{detect_window, sweep_windows, SweepReport, WindowReport, WindowSpec},
};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRequest {
    #[serde(default)]
    pub signal: Option<Vec<f64>>,
    #[serde(default)]
    pub sampling_frequency: Option<f64>,
    #[serde(default)]
    pub start_minute: Option<f64>,
    #[serde(default)]
    pub duration_minutes: Option<f64>,
    /// Iterate fixed windows of `durationMinutes` to the end of the signal.
    #[serde(default)]
    pub sweep: bool,
    #[serde(default)]
    pub include_indices: bool,
    #[serde(default)]
    pub neighborhood_width: Option<usize>,
    #[serde(default)]
    pub parabola: Option<Parabola>,
    #[serde(default)]
    pub threshold_multiplier: Option<f64>,
    #[serde(default)]
    pub threshold_stat: Option<ThresholdStat>,
    #[serde(default)]
    pub residual_mode: Option<ResidualMode>,
    #[serde(default)]
    pub min_width: Option<usize>,
    #[serde(default)]
    pub min_prominence: Option<f64>,
    #[serde(default)]
    pub band_limit: Option<BandLimit>,
}

impl DetectionRequest {
    pub fn new(signal: Vec<f64>, sampling_frequency: f64) -> Self {
        Self {
            signal: Some(signal),
            sampling_frequency: Some(sampling_frequency),
            ..Self::default()
        }
    }

    /// Overlay the request's parameters onto `base`.
    pub fn config(&self, base: &SpikeDetectorConfig) -> SpikeDetectorConfig {
        let mut cfg = *base;
        if let Some(width) = self.neighborhood_width {
            cfg.structuring.width = width;
        }
        if self.parabola.is_some() {
            cfg.structuring.parabola = self.parabola;
        }
        if let Some(m) = self.threshold_multiplier {
            cfg.threshold_multiplier = m;
        }
        if let Some(stat) = self.threshold_stat {
            cfg.threshold_stat = stat;
        }
        if let Some(mode) = self.residual_mode {
            cfg.residual_mode = mode;
        }
        if let Some(w) = self.min_width {
            cfg.min_width = w;
        }
        if let Some(p) = self.min_prominence {
            cfg.min_prominence = p;
        }
        if self.band_limit.is_some() {
            cfg.band_limit = self.band_limit;
        }
        cfg
    }

    pub fn to_signal(&self) -> Result<Signal, SpikeError> {
        let samples = self
            .signal
            .clone()
            .ok_or_else(|| SpikeError::MissingField("signal".into()))?;
        let fs = self
            .sampling_frequency
            .ok_or_else(|| SpikeError::MissingField("samplingFrequency".into()))?;
        Signal::new(samples, fs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetectionResponse {
    Sweep(SweepReport),
    Window(WindowReport),
}

impl DetectionResponse {
    pub fn total_peaks(&self) -> usize {
        match self {
            DetectionResponse::Sweep(s) => s.total_peaks,
            DetectionResponse::Window(w) => w.report.peaks_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Spike(#[from] SpikeError),
    #[error("invalid request: {0}")]
    Invalid(String),
}

impl RequestError {
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::Spike(err) => err.kind(),
            RequestError::Invalid(_) => "InvalidRequest",
        }
    }
}

impl From<&RequestError> for ErrorResponse {
    fn from(err: &RequestError) -> Self {
        Self {
            error: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Answer one detection request.
pub fn handle_request(
    request: &DetectionRequest,
    base: &SpikeDetectorConfig,
) -> Result<DetectionResponse, SpikeError> {
    let signal = request.to_signal()?;
    let cfg = request.config(base);
    let start = request.start_minute.unwrap_or(0.0);
    debug!(
        "request: {} samples at {} Hz, start {} min, sweep {}",
        signal.len(),
        signal.fs(),
        start,
        request.sweep
    );
    if request.sweep {
        let duration = request
            .duration_minutes
            .ok_or_else(|| SpikeError::MissingField("durationMinutes".into()))?;
        let report = sweep_windows(&signal, start, duration, &cfg, request.include_indices)?;
        Ok(DetectionResponse::Sweep(report))
    } else {
        let spec = WindowSpec::new(start, request.duration_minutes);
        let report = detect_window(&signal, &spec, &cfg, request.include_indices)?;
        Ok(DetectionResponse::Window(report))
    }
}

fn handle_item(value: Value, base: &SpikeDetectorConfig) -> Result<DetectionResponse, RequestError> {
    if !value.is_object() {
        return Err(RequestError::Invalid("request must be a JSON object".into()));
    }
    let request: DetectionRequest =
        serde_json::from_value(value).map_err(|e| RequestError::Invalid(e.to_string()))?;
    Ok(handle_request(&request, base)?)
}

fn to_value<T: Serialize>(item: &T) -> Value {
    serde_json::to_value(item).unwrap_or_else(|e| {
        serde_json::json!({ "error": "InvalidRequest", "message": e.to_string() })
    })
}

fn answer(result: Result<DetectionResponse, RequestError>) -> Value {
    match result {
        Ok(response) => to_value(&response),
        Err(err) => to_value(&ErrorResponse::from(&err)),
    }
}

/// Answer a parsed JSON body: a batch when it carries a `signals` array,
/// otherwise a single request.
pub fn handle_value(value: Value, base: &SpikeDetectorConfig) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("signals") => {
            let Some(Value::Array(items)) = map.remove("signals") else {
                return to_value(&ErrorResponse::from(&RequestError::Invalid(
                    "'signals' must be an array".into(),
                )));
            };
            let mut total_peaks = 0;
            let results: Vec<Value> = items
                .into_iter()
                .map(|item| {
                    let result = handle_item(item, base);
                    if let Ok(response) = &result {
                        total_peaks += response.total_peaks();
                    }
                    answer(result)
                })
                .collect();
            serde_json::json!({ "totalPeaks": total_peaks, "results": results })
        }
        other => answer(handle_item(other, base)),
    }
}

/// Answer a raw request body. Always returns a well-formed JSON document.
pub fn handle_str(body: &str, base: &SpikeDetectorConfig) -> String {
    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => handle_value(value, base),
        Err(e) => to_value(&ErrorResponse::from(&RequestError::Invalid(e.to_string()))),
    };
    value.to_string()
}
