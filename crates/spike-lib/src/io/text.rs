//! Newline-delimited samples.
//!
//! Blank lines and `#` comments are skipped. A comment of the form
//! `# fs = 256` (or `# sampling_frequency: 256`) declares the sampling rate.

use super::Recording;
use anyhow::{bail, Context, Result};
use std::path::Path;

const RATE_KEYS: [&str; 3] = ["fs", "sampling_frequency", "samplingfrequency"];

/// Sampling rate declared by a header comment, if this line is one.
fn rate_header(comment: &str) -> Option<Result<f64>> {
    let (key, value) = comment.split_once(['=', ':'])?;
    let key = key.trim().to_ascii_lowercase();
    if !RATE_KEYS.contains(&key.as_str()) {
        return None;
    }
    let value = value.trim().trim_end_matches("Hz").trim();
    Some(
        value
            .parse::<f64>()
            .with_context(|| format!("sampling rate header is not a number: {}", value)),
    )
}

pub fn parse_recording(text: &str) -> Result<Recording> {
    let mut samples = Vec::new();
    let mut fs = None;
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(comment) = trimmed.strip_prefix('#') {
            if let Some(rate) = rate_header(comment) {
                if fs.is_some() {
                    bail!("line {}: sampling rate declared twice", idx + 1);
                }
                fs = Some(rate.with_context(|| format!("line {}", idx + 1))?);
            }
            continue;
        }
        let value: f64 = trimmed
            .parse()
            .with_context(|| format!("line {} is not a number: {}", idx + 1, trimmed))?;
        samples.push(value);
    }
    if samples.is_empty() {
        bail!("no numeric samples found");
    }
    Ok(Recording { samples, fs })
}

pub fn read_recording(path: &Path) -> Result<Recording> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_recording(&text).with_context(|| format!("in {}", path.display()))
}
