//! Constrained local-maximum extraction.
//!
//! Prominence and width follow the usual topographic definitions: the base on
//! each side is the lowest sample between the peak and the nearest strictly
//! higher sample (or the array edge); the width is measured where the signal
//! crosses half of the prominence below the peak, with linear interpolation.

use crate::signal::PeakSet;
use serde::{Deserialize, Serialize};

/// Fraction of the prominence below the peak at which widths are measured.
const WIDTH_REL_HEIGHT: f64 = 0.5;

/// Height, width and prominence limits a peak must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakConstraints {
    pub height: f64,
    /// Minimum width in samples at half prominence.
    pub min_width: usize,
    pub min_prominence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub index: usize,
    pub height: f64,
    pub prominence: f64,
    pub width: f64,
}

#[derive(Debug, Clone, Copy)]
struct Prominence {
    value: f64,
    left_base: usize,
    right_base: usize,
}

/// Strict local maxima. A flat top bounded by lower samples on both sides is
/// reported once, at its midpoint `(left + right) / 2`; plateaus that touch
/// either end of the array are not peaks.
pub fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }
    let last = x.len() - 1;
    let mut i = 1;
    while i < last {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < last && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

fn prominence(x: &[f64], peak: usize) -> Prominence {
    let top = x[peak];

    let mut left_base = peak;
    let mut left_min = top;
    let mut i = peak as isize;
    while i >= 0 && x[i as usize] <= top {
        if x[i as usize] < left_min {
            left_min = x[i as usize];
            left_base = i as usize;
        }
        i -= 1;
    }

    let mut right_base = peak;
    let mut right_min = top;
    let mut j = peak;
    while j < x.len() && x[j] <= top {
        if x[j] < right_min {
            right_min = x[j];
            right_base = j;
        }
        j += 1;
    }

    Prominence {
        value: top - left_min.max(right_min),
        left_base,
        right_base,
    }
}

fn width(x: &[f64], peak: usize, prom: &Prominence) -> f64 {
    let level = x[peak] - prom.value * WIDTH_REL_HEIGHT;

    let mut i = peak;
    while prom.left_base < i && level < x[i] {
        i -= 1;
    }
    let mut left = i as f64;
    if x[i] < level {
        left += (level - x[i]) / (x[i + 1] - x[i]);
    }

    let mut j = peak;
    while j < prom.right_base && level < x[j] {
        j += 1;
    }
    let mut right = j as f64;
    if x[j] < level {
        right -= (level - x[j]) / (x[j - 1] - x[j]);
    }

    right - left
}

/// All local maxima of `residual` satisfying `constraints`, in index order.
pub fn find_peaks(residual: &[f64], constraints: &PeakConstraints) -> Vec<Peak> {
    local_maxima(residual)
        .into_iter()
        .filter(|&i| residual[i] >= constraints.height)
        .filter_map(|i| {
            let prom = prominence(residual, i);
            let peak = Peak {
                index: i,
                height: residual[i],
                prominence: prom.value,
                width: width(residual, i, &prom),
            };
            (peak.width >= constraints.min_width as f64
                && peak.prominence >= constraints.min_prominence)
                .then_some(peak)
        })
        .collect()
}

/// Indices only.
pub fn extract_peaks(residual: &[f64], constraints: &PeakConstraints) -> PeakSet {
    PeakSet::from_indices(
        find_peaks(residual, constraints)
            .into_iter()
            .map(|p| p.index)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(height: f64) -> PeakConstraints {
        PeakConstraints {
            height,
            min_width: 0,
            min_prominence: 0.0,
        }
    }

    #[test]
    fn plateau_reports_midpoint() {
        let x = [0.0, 1.0, 3.0, 3.0, 3.0, 3.0, 1.0, 0.0];
        assert_eq!(local_maxima(&x), vec![3]);
        let x = [0.0, 2.0, 2.0, 2.0, 0.0];
        assert_eq!(local_maxima(&x), vec![2]);
    }

    #[test]
    fn edges_and_edge_plateaus_are_not_peaks() {
        assert!(local_maxima(&[5.0, 1.0, 0.0]).is_empty());
        assert!(local_maxima(&[0.0, 1.0, 5.0]).is_empty());
        assert!(local_maxima(&[0.0, 4.0, 4.0, 4.0]).is_empty());
    }

    #[test]
    fn single_spike_width_and_prominence() {
        let mut x = vec![0.0; 30];
        x[12] = 100.0;
        let peaks = find_peaks(&x, &open(0.0));
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 12);
        assert!((peaks[0].prominence - 100.0).abs() < 1e-12);
        assert!((peaks[0].width - 1.0).abs() < 1e-12);
    }

    #[test]
    fn prominence_uses_higher_base() {
        // left base 1.0, right base -2.0 -> prominence relative to 1.0
        let x = [6.0, 1.0, 4.0, -2.0, 7.0];
        let peaks = find_peaks(&x, &open(f64::NEG_INFINITY));
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 2);
        assert!((peaks[0].prominence - 3.0).abs() < 1e-12);
    }

    #[test]
    fn constraints_filter_peaks() {
        // narrow tall spike at 5, broad bump centred at 20
        let mut x = vec![0.0; 40];
        x[5] = 10.0;
        for (k, v) in [1.0, 3.0, 5.0, 6.0, 5.0, 3.0, 1.0].iter().enumerate() {
            x[17 + k] = *v;
        }
        assert_eq!(extract_peaks(&x, &open(0.0)).indices, vec![5, 20]);
        assert_eq!(extract_peaks(&x, &open(8.0)).indices, vec![5]);
        let wide = PeakConstraints {
            height: 0.0,
            min_width: 3,
            min_prominence: 0.0,
        };
        assert_eq!(extract_peaks(&x, &wide).indices, vec![20]);
        let prominent = PeakConstraints {
            height: 0.0,
            min_width: 0,
            min_prominence: 7.0,
        };
        assert_eq!(extract_peaks(&x, &prominent).indices, vec![5]);
    }

    #[test]
    fn output_is_strictly_increasing() {
        let x: Vec<f64> = (0..200).map(|i| ((i as f64) * 0.7).sin()).collect();
        let peaks = extract_peaks(&x, &open(0.0));
        assert!(peaks.indices.windows(2).all(|w| w[0] < w[1]));
        assert!(!peaks.is_empty());
    }
}
