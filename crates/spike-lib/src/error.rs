use thiserror::Error;

/// Failures of a single detection call.
///
/// Every variant maps to a short, stable kind string (see [`SpikeError::kind`])
/// that is what callers put on the wire.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpikeError {
    #[error("missing field '{0}'")]
    MissingField(String),
    #[error("invalid sampling rate: {0}")]
    InvalidSamplingRate(String),
    #[error("invalid window: {0}")]
    InvalidWindow(String),
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("numeric instability: {0}")]
    NumericInstability(String),
}

impl SpikeError {
    pub fn kind(&self) -> &'static str {
        match self {
            SpikeError::MissingField(_) => "MissingField",
            SpikeError::InvalidSamplingRate(_) => "InvalidSamplingRate",
            SpikeError::InvalidWindow(_) => "InvalidWindow",
            SpikeError::InsufficientData(_) => "InsufficientData",
            SpikeError::NumericInstability(_) => "NumericInstability",
        }
    }
}

pub type SpikeResult<T> = Result<T, SpikeError>;
