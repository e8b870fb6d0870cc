use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::{json, Value};
use std::error::Error;

#[test]
fn request_answers_single_detection() -> Result<(), Box<dyn Error>> {
    let mut signal = vec![0.0; 200];
    signal[77] = 100.0;
    let body = json!({
        "signal": signal,
        "samplingFrequency": 256,
        "neighborhoodWidth": 5,
        "thresholdMultiplier": 2,
        "includeIndices": true
    });
    let mut cmd = cargo_bin_cmd!("spike");
    cmd.arg("request").write_stdin(body.to_string());
    let output = cmd.assert().success().get_output().stdout.clone();
    let response: Value = serde_json::from_slice(&output)?;
    assert_eq!(response["peaksCount"], 1);
    assert_eq!(response["peakIndices"], json!([77]));
    Ok(())
}

#[test]
fn request_missing_field_prints_error_object() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("spike");
    cmd.arg("request")
        .write_stdin(json!({ "signal": [0.0, 1.0, 0.0] }).to_string());
    let output = cmd.assert().failure().get_output().stdout.clone();
    let response: Value = serde_json::from_slice(&output)?;
    assert_eq!(response["error"], "MissingField");
    assert!(response["message"]
        .as_str()
        .is_some_and(|m| m.contains("samplingFrequency")));
    Ok(())
}

#[test]
fn request_start_beyond_signal_is_empty() -> Result<(), Box<dyn Error>> {
    let body = json!({
        "signal": vec![1.0; 512],
        "samplingFrequency": 256,
        "startMinute": 10
    });
    let mut cmd = cargo_bin_cmd!("spike");
    cmd.arg("request").write_stdin(body.to_string());
    let output = cmd.assert().success().get_output().stdout.clone();
    let response: Value = serde_json::from_slice(&output)?;
    assert_eq!(response["peaksCount"], 0);
    Ok(())
}

#[test]
fn serve_answers_each_line() -> Result<(), Box<dyn Error>> {
    let mut signal = vec![0.0; 100];
    signal[40] = 50.0;
    let good = json!({ "signal": signal, "samplingFrequency": 128, "thresholdMultiplier": 2 });
    let input = format!("{}\n{{broken\n{}\n", good, json!({ "samplingFrequency": 128 }));
    let mut cmd = cargo_bin_cmd!("spike");
    cmd.arg("serve").write_stdin(input);
    let output = cmd.assert().success().get_output().stdout.clone();
    let lines: Vec<Value> = String::from_utf8(output)?
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["peaksCount"], 1);
    assert_eq!(lines[1]["error"], "InvalidRequest");
    assert_eq!(lines[2]["error"], "MissingField");
    Ok(())
}

#[test]
fn synth_output_feeds_request() -> Result<(), Box<dyn Error>> {
    let mut synth = cargo_bin_cmd!("spike");
    synth.args([
        "synth",
        "--samples",
        "1000",
        "--seed",
        "3",
        "--spikes",
        "4",
        "--amplitude",
        "60",
        "--indices",
    ]);
    let body = synth.assert().success().get_output().stdout.clone();

    let mut cmd = cargo_bin_cmd!("spike");
    cmd.arg("request").write_stdin(body);
    let output = cmd.assert().success().get_output().stdout.clone();
    let response: Value = serde_json::from_slice(&output)?;
    let indices: Vec<u64> = serde_json::from_value(response["peakIndices"].clone())?;
    for expected in [200, 400, 600, 800] {
        assert!(indices.contains(&expected), "missing spike at {}", expected);
    }
    Ok(())
}

#[test]
fn synth_without_noise_counts_exactly() -> Result<(), Box<dyn Error>> {
    let mut synth = cargo_bin_cmd!("spike");
    synth.args(["synth", "--samples", "600", "--noise", "0", "--spikes", "5"]);
    let body = synth.assert().success().get_output().stdout.clone();

    let mut cmd = cargo_bin_cmd!("spike");
    cmd.arg("request").write_stdin(body);
    let output = cmd.assert().success().get_output().stdout.clone();
    let response: Value = serde_json::from_slice(&output)?;
    assert_eq!(response["peaksCount"], 5);
    Ok(())
}
