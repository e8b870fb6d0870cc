pub mod baseline;
pub mod peaks;
pub mod spike;
pub mod threshold;

pub use baseline::ResidualMode;
pub use spike::{
    detect_spikes, run_spike_pipeline, trace_spikes, PeakReport, SpikeDetectorConfig, SpikeTrace,
};
pub use threshold::ThresholdStat;
