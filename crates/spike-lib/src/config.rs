use crate::detectors::SpikeDetectorConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse a detector configuration from TOML. Missing keys keep their defaults.
pub fn parse_config(text: &str) -> Result<SpikeDetectorConfig> {
    let cfg: SpikeDetectorConfig = toml::from_str(text).context("parsing detector config")?;
    cfg.validate()?;
    Ok(cfg)
}

/// Read a detector configuration file.
pub fn read_config(path: &Path) -> Result<SpikeDetectorConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("in {}", path.display()))
}
