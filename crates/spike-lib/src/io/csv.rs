use super::Recording;
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use std::path::Path;

/// Load one column (matched case-insensitively by header) of a delimited file.
pub fn read_column(path: &Path, column: &str, delimiter: u8) -> Result<Vec<f64>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let idx = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(column))
        .with_context(|| format!("missing column '{}'", column))?;
    let mut values = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading row {}", row + 1))?;
        let raw = record
            .get(idx)
            .ok_or_else(|| anyhow!("row {} has no '{}' value", row + 1, column))?;
        let value = raw
            .trim()
            .parse::<f64>()
            .with_context(|| format!("row {}: '{}' is not a number", row + 1, raw))?;
        values.push(value);
    }
    Ok(values)
}

/// One comma-separated column; CSV files carry no sampling rate.
pub fn read_csv_recording(path: &Path, column: &str) -> Result<Recording> {
    Ok(Recording {
        samples: read_column(path, column, b',')?,
        fs: None,
    })
}
