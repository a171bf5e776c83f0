use assert_cmd::cargo::cargo_bin_cmd;
use ekg_lib::{metrics::RhythmStats, pipeline::AnalysisReport, signal::Beats};
use serde::Deserialize;
use std::{error::Error, f64::consts::PI, fs, path::Path};

#[derive(Deserialize)]
struct BeatsOutput {
    fs: f64,
    count: usize,
    beats: Beats,
}

#[derive(Deserialize)]
struct ConditionOutput {
    fs: f64,
    data: Vec<f64>,
}

/// One Gaussian QRS per second starting at 0.5 s, on a slow baseline wander.
fn write_recording(dir: &Path, fs: f64, seconds: f64) -> Result<String, Box<dyn Error>> {
    let lines: Vec<String> = (0..(fs * seconds) as usize)
        .map(|i| {
            let t = i as f64 / fs;
            let phase = (t - 0.5).rem_euclid(1.0);
            let dist = phase.min(1.0 - phase);
            let v = 1.2 * (-0.5 * (dist / 0.02).powi(2)).exp() + 0.05 * (2.0 * PI * t).sin();
            format!("{v:.6}")
        })
        .collect();
    let path = dir.join("recording.txt");
    fs::write(&path, lines.join("\n"))?;
    Ok(path.to_str().expect("utf8 path").to_owned())
}

fn write_probabilities(dir: &Path, values: &[f64]) -> Result<String, Box<dyn Error>> {
    let text: Vec<String> = values.iter().map(|p| p.to_string()).collect();
    let path = dir.join("probabilities.txt");
    fs::write(&path, text.join("\n"))?;
    Ok(path.to_str().expect("utf8 path").to_owned())
}

#[test]
fn detect_beats_finds_one_beat_per_second() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let recording = write_recording(dir.path(), 250.0, 30.0)?;

    let mut cmd = cargo_bin_cmd!("ekg");
    cmd.args(["detect-beats", "--fs", "250", "--input", &recording]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let actual: BeatsOutput = serde_json::from_slice(&output)?;

    assert_eq!(actual.fs, 250.0);
    assert_eq!(actual.count, actual.beats.len());
    assert!((29..=30).contains(&actual.count), "beats {:?}", actual.beats);
    assert!(actual.beats.is_strictly_increasing());
    Ok(())
}

#[test]
fn rhythm_stats_from_beat_indices() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let beats = dir.path().join("beats.txt");
    fs::write(&beats, "100\n350\n600\n850\n")?;

    let mut cmd = cargo_bin_cmd!("ekg");
    cmd.args(["rhythm-stats", "--fs", "250", "--beats"]);
    cmd.arg(&beats);
    let output = cmd.assert().success().get_output().stdout.clone();
    let stats: RhythmStats = serde_json::from_slice(&output)?;

    assert_eq!(stats.beat_count, 4);
    assert_eq!(stats.rr.rr_ms, vec![1000.0, 1000.0, 1000.0]);
    assert_close(stats.heart_rate.avg_bpm, 60.0, 1e-9);
    assert_close(stats.hrv.sdnn_ms, 0.0, 1e-9);
    assert_close(stats.hrv.rmssd_ms, 0.0, 1e-9);
    Ok(())
}

#[test]
fn rhythm_stats_needs_two_beats() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let beats = dir.path().join("beats.txt");
    fs::write(&beats, "100\n")?;

    let mut cmd = cargo_bin_cmd!("ekg");
    cmd.args(["rhythm-stats", "--beats"]);
    cmd.arg(&beats);
    let output = cmd.assert().failure().get_output().stderr.clone();
    assert!(String::from_utf8(output)?.contains("insufficient data"));
    Ok(())
}

#[test]
fn episodes_honour_threshold_and_duration_overrides() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let recording = write_recording(dir.path(), 250.0, 30.0)?;
    let probabilities = write_probabilities(dir.path(), &[0.1, 0.2, 0.6, 0.7, 0.8])?;

    let run = |extra: &[&str]| -> Result<serde_json::Value, Box<dyn Error>> {
        let mut cmd = cargo_bin_cmd!("ekg");
        cmd.args(["episodes", "--input", &recording, "--probabilities", &probabilities]);
        cmd.args(extra);
        let output = cmd.assert().success().get_output().stdout.clone();
        Ok(serde_json::from_slice(&output)?)
    };

    let default = run(&[])?;
    assert_eq!(default["windows"].as_array().map(Vec::len), Some(5));
    assert_eq!(default["episodes"][0]["start_s"], 10.0);
    assert_eq!(default["episodes"][0]["end_s"], 30.0);
    assert_eq!(default["summary"]["detected"], true);

    let strict = run(&["--threshold", "0.75"])?;
    assert_eq!(strict["episodes"][0]["start_s"], 20.0);
    assert_close(
        strict["episodes"][0]["confidence"].as_f64().unwrap_or_default(),
        0.8,
        1e-12,
    );

    let long = run(&["--min-episode-s", "25"])?;
    assert_eq!(long["episodes"].as_array().map(Vec::len), Some(0));
    assert_eq!(long["summary"]["detected"], false);
    Ok(())
}

#[test]
fn analyze_reads_config_file() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let recording = write_recording(dir.path(), 250.0, 30.0)?;
    let probabilities = write_probabilities(dir.path(), &[0.1, 0.2, 0.6, 0.7, 0.8])?;
    let config = dir.path().join("analysis.toml");
    fs::write(&config, "[episodes]\nthreshold = 0.65\n")?;

    let mut cmd = cargo_bin_cmd!("ekg");
    cmd.args(["analyze", "--input", &recording, "--probabilities", &probabilities, "--config"]);
    cmd.arg(&config);
    let output = cmd.assert().success().get_output().stdout.clone();
    let report: AnalysisReport = serde_json::from_slice(&output)?;

    assert_eq!(report.sample_count, 7500);
    assert!((29..=30).contains(&report.beats.len()));
    let rhythm = report.rhythm.expect("rhythm section");
    assert_close(rhythm.heart_rate.avg_bpm, 60.0, 2.0);
    assert_eq!(report.episodes.len(), 1);
    assert_eq!(report.episodes[0].start_s, 15.0);
    assert_close(report.summary.burden_percent, 50.0, 1e-9);
    Ok(())
}

#[test]
fn analyze_rejects_recording_shorter_than_a_window() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let recording = write_recording(dir.path(), 250.0, 8.0)?;
    let probabilities = write_probabilities(dir.path(), &[0.5])?;

    let mut cmd = cargo_bin_cmd!("ekg");
    cmd.args(["analyze", "--input", &recording, "--probabilities", &probabilities]);
    let output = cmd.assert().failure().get_output().stderr.clone();
    assert!(String::from_utf8(output)?.contains("insufficient signal"));
    Ok(())
}

#[test]
fn condition_resamples_csv_column() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("lead.csv");
    let mut body = String::from("time;ecg\n");
    for i in 0..1000 {
        let t = i as f64 / 500.0;
        body.push_str(&format!("{t};{}\n", 2.0 * (2.0 * PI * 2.0 * t).sin()));
    }
    fs::write(&path, body)?;

    let mut cmd = cargo_bin_cmd!("ekg");
    cmd.args(["condition", "--fs", "500", "--csv-column", "ECG", "--delimiter", ";", "--input"]);
    cmd.arg(&path);
    let output = cmd.assert().success().get_output().stdout.clone();
    let signal: ConditionOutput = serde_json::from_slice(&output)?;

    assert_eq!(signal.fs, 250.0);
    assert_eq!(signal.data.len(), 500);
    let peak = signal.data.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
    assert_close(peak, 1.0, 1e-12);
    Ok(())
}

#[test]
fn samples_are_read_from_stdin() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("ekg");
    cmd.args(["condition", "--fs", "250"]);
    cmd.write_stdin("1\n-4\n2\n");
    let output = cmd.assert().success().get_output().stdout.clone();
    let signal: ConditionOutput = serde_json::from_slice(&output)?;
    assert_eq!(signal.data, vec![0.25, -1.0, 0.5]);
    Ok(())
}

fn assert_close(actual: f64, expected: f64, tol: f64) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tol,
        "expected {expected}, got {actual} (diff {diff} > tol {tol})"
    );
}
