//! Self-calibrating detection threshold.
//!
//! The threshold is a multiple of a location statistic of the residual's own
//! turning-point amplitudes, so every window is calibrated against itself.

use crate::error::{SpikeError, SpikeResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdStat {
    #[default]
    Median,
    Mean,
}

/// Interior indices where the sign of the first difference changes.
///
/// `sign(0) == 0`, so leaving or entering a flat run counts as a turning point.
pub fn local_extrema(residual: &[f64]) -> Vec<usize> {
    if residual.len() < 3 {
        return Vec::new();
    }
    let signs: Vec<i8> = residual
        .windows(2)
        .map(|w| {
            let d = w[1] - w[0];
            if d > 0.0 {
                1
            } else if d < 0.0 {
                -1
            } else {
                0
            }
        })
        .collect();
    signs
        .windows(2)
        .enumerate()
        .filter(|(_, s)| s[0] != s[1])
        .map(|(i, _)| i + 1)
        .collect()
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    }
}

/// `multiplier * stat(|residual[extremum]|)`.
pub fn estimate_threshold(
    residual: &[f64],
    stat: ThresholdStat,
    multiplier: f64,
) -> SpikeResult<f64> {
    if residual.len() < 3 {
        return Err(SpikeError::InsufficientData(format!(
            "threshold needs at least 3 residual samples, got {}",
            residual.len()
        )));
    }
    let mut amplitudes: Vec<f64> = local_extrema(residual)
        .into_iter()
        .map(|i| residual[i].abs())
        .collect();
    if amplitudes.is_empty() {
        return Err(SpikeError::InsufficientData(
            "residual has no interior extrema".into(),
        ));
    }
    let level = match stat {
        ThresholdStat::Median => median(&mut amplitudes),
        ThresholdStat::Mean => amplitudes.iter().sum::<f64>() / amplitudes.len() as f64,
    };
    Ok(level * multiplier)
}
