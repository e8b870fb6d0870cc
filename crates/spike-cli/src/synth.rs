use anyhow::{bail, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use spike_lib::request::DetectionRequest;

/// Parameters for a synthetic recording.
#[derive(Debug, Clone, Copy)]
pub struct SynthSpec {
    pub samples: usize,
    pub fs: f64,
    pub seed: u64,
    /// Half-range of the uniform background noise.
    pub noise: f64,
    pub spikes: usize,
    pub amplitude: f64,
}

/// Evenly spaced positions for `count` spikes in `samples` samples.
pub fn spike_positions(samples: usize, count: usize) -> Vec<usize> {
    (1..=count).map(|k| k * samples / (count + 1)).collect()
}

/// Seeded uniform noise with spikes of `amplitude` added on top.
pub fn synthesize(spec: &SynthSpec) -> Result<Vec<f64>> {
    if !spec.noise.is_finite() || spec.noise < 0.0 {
        bail!("noise must be a non-negative number, got {}", spec.noise);
    }
    if spec.spikes >= spec.samples {
        bail!(
            "cannot place {} spike(s) in {} sample(s)",
            spec.spikes,
            spec.samples
        );
    }
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let mut data: Vec<f64> = (0..spec.samples)
        .map(|_| {
            if spec.noise > 0.0 {
                rng.gen_range(-spec.noise..=spec.noise)
            } else {
                0.0
            }
        })
        .collect();
    for idx in spike_positions(spec.samples, spec.spikes) {
        data[idx] += spec.amplitude;
    }
    Ok(data)
}

/// Wrap a synthetic recording in a detection request.
pub fn synth_request(spec: &SynthSpec, include_indices: bool) -> Result<DetectionRequest> {
    let mut request = DetectionRequest::new(synthesize(spec)?, spec.fs);
    request.include_indices = include_indices;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(seed: u64) -> SynthSpec {
        SynthSpec {
            samples: 500,
            fs: 256.0,
            seed,
            noise: 1.0,
            spikes: 3,
            amplitude: 40.0,
        }
    }

    #[test]
    fn same_seed_same_samples() {
        assert_eq!(synthesize(&spec(7)).unwrap(), synthesize(&spec(7)).unwrap());
        assert_ne!(synthesize(&spec(7)).unwrap(), synthesize(&spec(8)).unwrap());
    }

    #[test]
    fn noise_stays_in_range_and_spikes_stand_out() {
        let data = synthesize(&spec(1)).unwrap();
        let positions = spike_positions(500, 3);
        assert_eq!(positions, vec![125, 250, 375]);
        for (i, v) in data.iter().enumerate() {
            if positions.contains(&i) {
                assert!(*v >= 39.0);
            } else {
                assert!(v.abs() <= 1.0);
            }
        }
    }

    #[test]
    fn rejects_negative_noise() {
        let mut bad = spec(1);
        bad.noise = -1.0;
        assert!(synthesize(&bad).is_err());
    }
}
