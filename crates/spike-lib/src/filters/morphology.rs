//! Grayscale morphology over one-dimensional sequences.
//!
//! Boundaries use edge replication, so every operator returns a sequence of
//! the same length as its input. Dilation walks the reflected support of the
//! structuring element, which makes erosion and dilation an adjunction:
//! flat openings and closings are idempotent for odd and even widths alike.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Parabolic structuring function `a * k^2 + b` evaluated at offset `k`.
///
/// Only concave profiles (`a <= 0`, `b >= 0`) keep erosion below and dilation
/// above the signal and keep opening and closing idempotent under edge
/// replication; [`Parabola::is_concave`] checks this.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parabola {
    pub a: f64,
    pub b: f64,
}

impl Parabola {
    pub fn weight(&self, offset: isize) -> f64 {
        let k = offset as f64;
        self.a * k * k + self.b
    }

    pub fn is_concave(&self) -> bool {
        self.a <= 0.0 && self.b >= 0.0
    }
}

/// Neighbourhood used by erosion and dilation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuringElement {
    /// Neighbourhood length in samples; 1 is the identity transform.
    pub width: usize,
    /// Optional structuring function. `None` means flat morphology.
    pub parabola: Option<Parabola>,
}

impl Default for StructuringElement {
    fn default() -> Self {
        Self::flat(5)
    }
}

impl StructuringElement {
    pub fn flat(width: usize) -> Self {
        Self {
            width,
            parabola: None,
        }
    }

    pub fn parabolic(width: usize, a: f64, b: f64) -> Self {
        Self {
            width,
            parabola: Some(Parabola { a, b }),
        }
    }

    /// Width clamped to `[1, len]`.
    pub fn effective_width(&self, len: usize) -> usize {
        self.width.clamp(1, len.max(1))
    }

    /// Offsets `[lo, hi]` covered by a neighbourhood of `width` samples.
    fn support(width: usize) -> (isize, isize) {
        let lo = -((width / 2) as isize);
        (lo, lo + width as isize - 1)
    }
}

/// Erosion, dilation and their compositions for one structuring element.
#[derive(Debug, Clone, Copy)]
pub struct MorphologicalFilter {
    element: StructuringElement,
}

impl MorphologicalFilter {
    pub fn new(element: StructuringElement) -> Self {
        Self { element }
    }

    pub fn erode(&self, data: &[f64]) -> Vec<f64> {
        if data.is_empty() {
            return Vec::new();
        }
        let (lo, hi) = StructuringElement::support(self.element.effective_width(data.len()));
        match self.element.parabola {
            None => sliding_extreme(data, lo, hi, |kept, incoming| kept < incoming),
            Some(p) => (0..data.len() as isize)
                .map(|i| {
                    (lo..=hi)
                        .map(|k| replicate(data, i + k) - p.weight(k))
                        .fold(f64::INFINITY, f64::min)
                })
                .collect(),
        }
    }

    pub fn dilate(&self, data: &[f64]) -> Vec<f64> {
        if data.is_empty() {
            return Vec::new();
        }
        let (lo, hi) = StructuringElement::support(self.element.effective_width(data.len()));
        match self.element.parabola {
            None => sliding_extreme(data, -hi, -lo, |kept, incoming| kept > incoming),
            Some(p) => (0..data.len() as isize)
                .map(|i| {
                    (lo..=hi)
                        .map(|k| replicate(data, i - k) + p.weight(k))
                        .fold(f64::NEG_INFINITY, f64::max)
                })
                .collect(),
        }
    }

    /// Erosion followed by dilation; removes upward spikes narrower than the element.
    pub fn open(&self, data: &[f64]) -> Vec<f64> {
        self.dilate(&self.erode(data))
    }

    /// Dilation followed by erosion; removes downward spikes narrower than the element.
    pub fn close(&self, data: &[f64]) -> Vec<f64> {
        self.erode(&self.dilate(data))
    }

    /// Average of open-then-close and close-then-open.
    pub fn occo(&self, data: &[f64]) -> Vec<f64> {
        let open_close = self.close(&self.open(data));
        let close_open = self.open(&self.close(data));
        open_close
            .iter()
            .zip(close_open.iter())
            .map(|(a, b)| 0.5 * (a + b))
            .collect()
    }
}

fn replicate(data: &[f64], pos: isize) -> f64 {
    let last = data.len() as isize - 1;
    data[pos.clamp(0, last) as usize]
}

/// Running extreme over `[i + lo, i + hi]` (truncated at the edges, which is
/// the same as replicating them) with a monotonic deque. `lo <= 0 <= hi`.
fn sliding_extreme(data: &[f64], lo: isize, hi: isize, keeps: fn(f64, f64) -> bool) -> Vec<f64> {
    let n = data.len() as isize;
    let mut out = Vec::with_capacity(data.len());
    let mut candidates: VecDeque<usize> = VecDeque::new();
    let mut next = 0isize;
    for i in 0..n {
        let end = (i + hi).min(n - 1);
        while next <= end {
            let incoming = data[next as usize];
            while candidates
                .back()
                .map_or(false, |&b| !keeps(data[b], incoming))
            {
                candidates.pop_back();
            }
            candidates.push_back(next as usize);
            next += 1;
        }
        let start = (i + lo).max(0) as usize;
        while candidates.front().map_or(false, |&f| f < start) {
            candidates.pop_front();
        }
        if let Some(&best) = candidates.front() {
            out.push(data[best]);
        }
    }
    out
}
