use serde::{Deserialize, Serialize};

/// How the envelope is removed from the signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidualMode {
    /// `signal - envelope`
    #[default]
    Amplitude,
    /// `|signal| - |envelope|`
    Magnitude,
}

/// Subtract the envelope sample by sample.
pub fn residual(signal: &[f64], envelope: &[f64], mode: ResidualMode) -> Vec<f64> {
    signal
        .iter()
        .zip(envelope.iter())
        .map(|(&x, &e)| match mode {
            ResidualMode::Amplitude => x - e,
            ResidualMode::Magnitude => x.abs() - e.abs(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amplitude_and_magnitude_modes_differ_on_negative_samples() {
        let signal = [-4.0, 1.0, 3.0];
        let envelope = [-1.0, 1.0, 1.0];
        assert_eq!(
            residual(&signal, &envelope, ResidualMode::Amplitude),
            vec![-3.0, 0.0, 2.0]
        );
        assert_eq!(
            residual(&signal, &envelope, ResidualMode::Magnitude),
            vec![3.0, 0.0, 2.0]
        );
    }
}
