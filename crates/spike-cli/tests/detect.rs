use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::{error::Error, fs};
use tempfile::tempdir;

fn spike_train(n: usize, at: &[usize]) -> Vec<f64> {
    let mut data = vec![0.0; n];
    for &i in at {
        data[i] = 80.0;
    }
    data
}

fn as_lines(data: &[f64]) -> String {
    data.iter().map(|v| format!("{}\n", v)).collect()
}

#[test]
fn detect_reads_stdin_and_reports_indices() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("spike");
    cmd.args(["detect", "--fs", "256", "--multiplier", "2", "--indices"])
        .write_stdin(as_lines(&spike_train(200, &[77])));
    let output = cmd.assert().success().get_output().stdout.clone();
    let report: Value = serde_json::from_slice(&output)?;
    assert_eq!(report["peaksCount"], 1);
    assert_eq!(report["peakIndices"], serde_json::json!([77]));
    Ok(())
}

#[test]
fn detect_flat_signal_finds_nothing() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("spike");
    cmd.args(["detect", "--width", "9"])
        .write_stdin(as_lines(&vec![0.0; 1000]));
    let output = cmd.assert().success().get_output().stdout.clone();
    let report: Value = serde_json::from_slice(&output)?;
    assert_eq!(report["peaksCount"], 0);
    Ok(())
}

#[test]
fn detect_sweeps_csv_column_with_config() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    // 2.5 minutes at 4 Hz, spikes in every minute
    let data = spike_train(600, &[100, 340, 500, 560]);
    let mut csv = String::from("time,Cz\n");
    for (i, v) in data.iter().enumerate() {
        csv.push_str(&format!("{},{}\n", i as f64 / 4.0, v));
    }
    let csv_path = dir.path().join("rec.csv");
    fs::write(&csv_path, csv)?;
    let config_path = dir.path().join("detector.toml");
    fs::write(&config_path, "threshold_multiplier = 2.0\n")?;

    let mut cmd = cargo_bin_cmd!("spike");
    cmd.args([
        "detect",
        "--fs",
        "4",
        "--csv",
        csv_path.to_str().expect("utf8 path"),
        "--column",
        "cz",
        "--config",
        config_path.to_str().expect("utf8 path"),
        "--duration-minutes",
        "1",
        "--sweep",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let sweep: Value = serde_json::from_slice(&output)?;
    assert_eq!(sweep["totalPeaks"], 4);
    assert_eq!(sweep["windows"].as_array().map(|w| w.len()), Some(3));
    Ok(())
}

#[test]
fn detect_rejects_band_above_nyquist() {
    let mut cmd = cargo_bin_cmd!("spike");
    cmd.args(["detect", "--fs", "100", "--band-pass", "1", "60"])
        .write_stdin(as_lines(&spike_train(300, &[150])));
    cmd.assert().failure();
}

#[test]
fn detect_uses_declared_rate_unless_fs_given() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("rec.txt");
    let samples = as_lines(&spike_train(600, &[100, 340, 500, 560]));
    fs::write(&path, format!("# fs = 4\n{}", samples))?;
    let path = path.to_str().expect("utf8 path");

    let sweep = |extra: &[&str]| -> Result<Value, Box<dyn Error>> {
        let mut cmd = cargo_bin_cmd!("spike");
        cmd.args(["detect", "--input", path, "--multiplier", "2"])
            .args(["--duration-minutes", "1", "--sweep"])
            .args(extra);
        let output = cmd.assert().success().get_output().stdout.clone();
        Ok(serde_json::from_slice(&output)?)
    };

    let declared = sweep(&[])?;
    assert_eq!(declared["windows"].as_array().map(|w| w.len()), Some(3));
    assert_eq!(declared["totalPeaks"], 4);

    let overridden = sweep(&["--fs", "8"])?;
    assert_eq!(overridden["windows"].as_array().map(|w| w.len()), Some(2));
    assert_eq!(overridden["totalPeaks"], 4);
    Ok(())
}
