//! Optional band limiting ahead of the morphological stage.
//!
//! Coefficients are always designed for the sampling rate of the signal being
//! filtered. Both filters return a sequence of the input's length with no
//! phase shift: the IIR band-pass runs forward and backward, the FIR low-pass
//! is symmetric and its group delay is removed.

use crate::error::{SpikeError, SpikeResult};
use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const MAX_IIR_ORDER: usize = 8;
/// Longest FIR kernel the low-pass will design.
pub const MAX_FIR_TAPS: usize = 4097;

/// Band limiting stage configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BandLimit {
    /// Butterworth high-pass at `low_hz` cascaded with a Butterworth low-pass at `high_hz`.
    #[serde(rename_all = "camelCase")]
    BandPass {
        #[serde(alias = "low_hz")]
        low_hz: f64,
        #[serde(alias = "high_hz")]
        high_hz: f64,
        order: usize,
    },
    /// Hamming-windowed sinc low-pass.
    #[serde(rename_all = "camelCase")]
    LowPass {
        #[serde(alias = "cutoff_hz")]
        cutoff_hz: f64,
        taps: usize,
    },
}

impl BandLimit {
    pub fn apply(&self, data: &[f64], fs: f64) -> SpikeResult<Vec<f64>> {
        match *self {
            BandLimit::BandPass {
                low_hz,
                high_hz,
                order,
            } => {
                let sections = design_band_pass(fs, low_hz, high_hz, order)?;
                Ok(filtfilt(&sections, data))
            }
            BandLimit::LowPass { cutoff_hz, taps } => {
                let kernel = design_low_pass_fir(fs, cutoff_hz, taps)?;
                convolve_same(data, &kernel)
            }
        }
    }
}

/// Second-order section in normalised form (`a0 == 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Biquad {
    fn low_pass(k: f64, q: f64) -> Self {
        let norm = 1.0 / (1.0 + k / q + k * k);
        let b0 = k * k * norm;
        Self {
            b0,
            b1: 2.0 * b0,
            b2: b0,
            a1: 2.0 * (k * k - 1.0) * norm,
            a2: (1.0 - k / q + k * k) * norm,
        }
    }

    fn high_pass(k: f64, q: f64) -> Self {
        let norm = 1.0 / (1.0 + k / q + k * k);
        Self {
            b0: norm,
            b1: -2.0 * norm,
            b2: norm,
            a1: 2.0 * (k * k - 1.0) * norm,
            a2: (1.0 - k / q + k * k) * norm,
        }
    }

    fn low_pass_first_order(k: f64) -> Self {
        let norm = 1.0 / (1.0 + k);
        Self {
            b0: k * norm,
            b1: k * norm,
            b2: 0.0,
            a1: (k - 1.0) * norm,
            a2: 0.0,
        }
    }

    fn high_pass_first_order(k: f64) -> Self {
        let norm = 1.0 / (1.0 + k);
        Self {
            b0: norm,
            b1: -norm,
            b2: 0.0,
            a1: (k - 1.0) * norm,
            a2: 0.0,
        }
    }

    fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }

    fn is_finite(&self) -> bool {
        [self.b0, self.b1, self.b2, self.a1, self.a2]
            .iter()
            .all(|c| c.is_finite())
            && self.dc_gain().is_finite()
    }
}

#[derive(Clone, Copy)]
enum Pass {
    Low,
    High,
}

fn check_nyquist(fs: f64, cutoffs: &[f64]) -> SpikeResult<()> {
    if !fs.is_finite() || fs <= 0.0 {
        return Err(SpikeError::InvalidSamplingRate(format!(
            "sampling frequency must be positive, got {}",
            fs
        )));
    }
    let nyquist = fs * 0.5;
    if let Some(&bad) = cutoffs.iter().find(|&&c| c >= nyquist) {
        return Err(SpikeError::InvalidSamplingRate(format!(
            "cutoff {} Hz is at or above Nyquist ({} Hz)",
            bad, nyquist
        )));
    }
    Ok(())
}

fn butterworth(fs: f64, cutoff: f64, order: usize, pass: Pass) -> Vec<Biquad> {
    let k = (PI * cutoff / fs).tan();
    let mut sections = Vec::with_capacity(order / 2 + 1);
    for idx in 0..order / 2 {
        let theta = PI * (2 * idx + 1) as f64 / (2 * order) as f64;
        let q = 1.0 / (2.0 * theta.sin());
        sections.push(match pass {
            Pass::Low => Biquad::low_pass(k, q),
            Pass::High => Biquad::high_pass(k, q),
        });
    }
    if order % 2 == 1 {
        sections.push(match pass {
            Pass::Low => Biquad::low_pass_first_order(k),
            Pass::High => Biquad::high_pass_first_order(k),
        });
    }
    sections
}

/// Design the cascaded Butterworth band-pass as second-order sections.
pub fn design_band_pass(
    fs: f64,
    low_hz: f64,
    high_hz: f64,
    order: usize,
) -> SpikeResult<Vec<Biquad>> {
    check_nyquist(fs, &[low_hz, high_hz])?;
    if order == 0 || order > MAX_IIR_ORDER {
        return Err(SpikeError::NumericInstability(format!(
            "band-pass order must be within 1..={}, got {}",
            MAX_IIR_ORDER, order
        )));
    }
    if !(low_hz.is_finite() && high_hz.is_finite()) || low_hz <= 0.0 || low_hz >= high_hz {
        return Err(SpikeError::NumericInstability(format!(
            "degenerate band edges {}..{} Hz",
            low_hz, high_hz
        )));
    }
    let mut sections = butterworth(fs, low_hz, order, Pass::High);
    sections.extend(butterworth(fs, high_hz, order, Pass::Low));
    if sections.iter().any(|s| !s.is_finite()) {
        return Err(SpikeError::NumericInstability(
            "band-pass design produced non-finite coefficients".into(),
        ));
    }
    Ok(sections)
}

/// Design a unit-DC-gain Hamming-windowed sinc low-pass with an odd number of taps.
pub fn design_low_pass_fir(fs: f64, cutoff_hz: f64, taps: usize) -> SpikeResult<Vec<f64>> {
    check_nyquist(fs, &[cutoff_hz])?;
    if !cutoff_hz.is_finite() || cutoff_hz <= 0.0 {
        return Err(SpikeError::NumericInstability(format!(
            "low-pass cutoff must be positive, got {}",
            cutoff_hz
        )));
    }
    if taps == 0 || taps > MAX_FIR_TAPS {
        return Err(SpikeError::NumericInstability(format!(
            "low-pass taps must be within 1..={}, got {}",
            MAX_FIR_TAPS, taps
        )));
    }
    let taps = taps | 1;
    if taps == 1 {
        return Ok(vec![1.0]);
    }
    let fc = cutoff_hz / fs;
    let span = (taps - 1) as f64;
    let mut kernel: Vec<f64> = (0..taps)
        .map(|i| {
            let t = i as f64 - span / 2.0;
            let sinc = if t == 0.0 {
                2.0 * fc
            } else {
                (2.0 * PI * fc * t).sin() / (PI * t)
            };
            let window = 0.54 - 0.46 * (2.0 * PI * i as f64 / span).cos();
            sinc * window
        })
        .collect();
    let gain: f64 = kernel.iter().sum();
    if !gain.is_finite() || gain.abs() < f64::EPSILON {
        return Err(SpikeError::NumericInstability(
            "low-pass design has no DC gain".into(),
        ));
    }
    for tap in kernel.iter_mut() {
        *tap /= gain;
    }
    Ok(kernel)
}

/// Direct form II transposed, each section primed with its step steady state.
fn run_sections(sections: &[Biquad], data: &mut [f64]) {
    let Some(&x0) = data.first() else {
        return;
    };
    let mut first = x0;
    for s in sections {
        let y0 = s.dc_gain() * first;
        let mut z2 = s.b2 * first - s.a2 * y0;
        let mut z1 = s.b1 * first - s.a1 * y0 + z2;
        for v in data.iter_mut() {
            let x = *v;
            let y = s.b0 * x + z1;
            z1 = s.b1 * x - s.a1 * y + z2;
            z2 = s.b2 * x - s.a2 * y;
            *v = y;
        }
        first = data[0];
    }
}

/// Forward-backward filtering with odd-extension padding at both ends.
pub fn filtfilt(sections: &[Biquad], data: &[f64]) -> Vec<f64> {
    let n = data.len();
    if n < 2 {
        return data.to_vec();
    }
    let pad = (3 * (2 * sections.len() + 1)).min(n - 1);
    let mut ext = Vec::with_capacity(n + 2 * pad);
    for i in (1..=pad).rev() {
        ext.push(2.0 * data[0] - data[i]);
    }
    ext.extend_from_slice(data);
    for i in 1..=pad {
        ext.push(2.0 * data[n - 1] - data[n - 1 - i]);
    }
    run_sections(sections, &mut ext);
    ext.reverse();
    run_sections(sections, &mut ext);
    ext.reverse();
    ext[pad..pad + n].to_vec()
}

/// Centered convolution with an odd-length symmetric kernel, edges replicated.
fn convolve_same(data: &[f64], kernel: &[f64]) -> SpikeResult<Vec<f64>> {
    let n = data.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    let delay = (kernel.len() - 1) / 2;
    let mut ext = Vec::with_capacity(n + 2 * delay);
    ext.extend(std::iter::repeat(data[0]).take(delay));
    ext.extend_from_slice(data);
    ext.extend(std::iter::repeat(data[n - 1]).take(delay));

    let len = (ext.len() + kernel.len() - 1).next_power_of_two();
    let mut planner = RealFftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(len);
    let inverse = planner.plan_fft_inverse(len);

    let mut signal_in = forward.make_input_vec();
    signal_in[..ext.len()].copy_from_slice(&ext);
    let mut kernel_in = forward.make_input_vec();
    kernel_in[..kernel.len()].copy_from_slice(kernel);
    let mut signal_spec = forward.make_output_vec();
    let mut kernel_spec = forward.make_output_vec();
    forward
        .process(&mut signal_in, &mut signal_spec)
        .map_err(|e| SpikeError::NumericInstability(e.to_string()))?;
    forward
        .process(&mut kernel_in, &mut kernel_spec)
        .map_err(|e| SpikeError::NumericInstability(e.to_string()))?;

    for (s, k) in signal_spec.iter_mut().zip(kernel_spec.iter()) {
        *s *= *k;
    }
    if let Some(dc) = signal_spec.first_mut() {
        dc.im = 0.0;
    }
    if len % 2 == 0 {
        if let Some(nyq) = signal_spec.last_mut() {
            nyq.im = 0.0;
        }
    }
    let mut out = inverse.make_output_vec();
    inverse
        .process(&mut signal_spec, &mut out)
        .map_err(|e| SpikeError::NumericInstability(e.to_string()))?;

    let scale = 1.0 / len as f64;
    Ok(out[2 * delay..2 * delay + n]
        .iter()
        .map(|v| v * scale)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(fs: f64, freq: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn band_pass_rejects_dc_and_keeps_in_band_tone() {
        let fs = 256.0;
        let limit = BandLimit::BandPass {
            low_hz: 5.0,
            high_hz: 20.0,
            order: 4,
        };
        let dc = limit.apply(&vec![3.0; 1024], fs).unwrap();
        assert!(dc[200..800].iter().all(|v| v.abs() < 1e-3));

        let tone = sine(fs, 10.0, 2048);
        let out = limit.apply(&tone, fs).unwrap();
        assert_eq!(out.len(), tone.len());
        let peak = out[512..1536].iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(peak > 0.9 && peak < 1.1, "peak {}", peak);
        // zero phase: output tracks the input sample for sample
        let err = out[512..1536]
            .iter()
            .zip(&tone[512..1536])
            .fold(0.0f64, |m, (a, b)| m.max((a - b).abs()));
        assert!(err < 0.1, "phase error {}", err);
    }

    #[test]
    fn band_pass_attenuates_out_of_band_tone() {
        let fs = 256.0;
        let limit = BandLimit::BandPass {
            low_hz: 5.0,
            high_hz: 20.0,
            order: 3,
        };
        let out = limit.apply(&sine(fs, 80.0, 2048), fs).unwrap();
        let peak = out[512..1536].iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(peak < 0.05, "peak {}", peak);
    }

    #[test]
    fn low_pass_keeps_slow_tone_and_drops_fast_one() {
        let fs = 512.0;
        let slow = sine(fs, 5.0, 2048);
        let mixed: Vec<f64> = slow
            .iter()
            .zip(sine(fs, 100.0, 2048))
            .map(|(a, b)| a + b)
            .collect();
        let limit = BandLimit::LowPass {
            cutoff_hz: 30.0,
            taps: 101,
        };
        let out = limit.apply(&mixed, fs).unwrap();
        assert_eq!(out.len(), mixed.len());
        let err = out[200..1800]
            .iter()
            .zip(&slow[200..1800])
            .fold(0.0f64, |m, (a, b)| m.max((a - b).abs()));
        assert!(err < 0.02, "error {}", err);
    }

    #[test]
    fn low_pass_passes_dc_to_the_edges() {
        let limit = BandLimit::LowPass {
            cutoff_hz: 10.0,
            taps: 30,
        };
        let out = limit.apply(&vec![2.5; 300], 256.0).unwrap();
        assert!(out.iter().all(|v| (v - 2.5).abs() < 1e-9));
    }

    #[test]
    fn fir_kernel_is_odd_symmetric_and_normalised() {
        let kernel = design_low_pass_fir(256.0, 20.0, 64).unwrap();
        assert_eq!(kernel.len(), 65);
        assert!((kernel.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        for i in 0..kernel.len() / 2 {
            assert!((kernel[i] - kernel[kernel.len() - 1 - i]).abs() < 1e-12);
        }
    }

    #[test]
    fn cutoff_at_nyquist_is_invalid_sampling_rate() {
        let err = design_band_pass(256.0, 5.0, 128.0, 4).unwrap_err();
        assert_eq!(err.kind(), "InvalidSamplingRate");
        let err = design_low_pass_fir(100.0, 60.0, 31).unwrap_err();
        assert_eq!(err.kind(), "InvalidSamplingRate");
    }

    #[test]
    fn degenerate_band_edges_are_numeric_instability() {
        assert_eq!(
            design_band_pass(256.0, 0.0, 20.0, 4).unwrap_err().kind(),
            "NumericInstability"
        );
        assert_eq!(
            design_band_pass(256.0, 30.0, 20.0, 4).unwrap_err().kind(),
            "NumericInstability"
        );
        assert_eq!(
            design_band_pass(256.0, 5.0, 20.0, 0).unwrap_err().kind(),
            "NumericInstability"
        );
    }

    #[test]
    fn oversized_fir_is_rejected_before_allocating() {
        for taps in [MAX_FIR_TAPS + 1, usize::MAX / 2, usize::MAX] {
            let err = design_low_pass_fir(256.0, 10.0, taps).unwrap_err();
            assert_eq!(err.kind(), "NumericInstability");
        }
        assert_eq!(
            design_low_pass_fir(256.0, 10.0, MAX_FIR_TAPS).unwrap().len(),
            MAX_FIR_TAPS
        );
    }
}
