//! Integration tests for the perf-visualizer CLI and library.
//!
//! These tests verify end-to-end functionality including:
//! - CLI commands parse and run
//! - Peak campaigns produce charts, frontiers and reports
//! - Local runs merge into one frontier

#![allow(clippy::needless_raw_string_hashes)]
#![allow(clippy::unwrap_used)]

use perf_visualizer::{
    process_peak, FrontierReducer, Curve, PeakResults, PipelineContext, Point, Publisher,
    VisualizerConfig,
};
use std::path::Path;
use std::process::Command;

const BIN: &str = env!("CARGO_BIN_EXE_perf-visualizer");

const DISABLED_PUBLISH: &str = r#"
publish:
  enabled: false
  region: ""
  access_key: ""
  secret_key: ""
  bucket: ""
"#;

fn write_run(dir: &Path, rows: &[(u32, f64, f64)]) {
    std::fs::create_dir_all(dir).unwrap();
    let records: Vec<serde_json::Value> = rows
        .iter()
        .map(|(c, tokens, latency)| {
            serde_json::json!({
                "concurrency": c,
                "success": 10,
                "fail": 0,
                "total": 10,
                "throughput": f64::from(*c) / 2.0,
                "outputTokensPerSecond": tokens,
                "avgTimeClientSide": latency,
            })
        })
        .collect();
    std::fs::write(
        dir.join("statistics_2024-06-01-12-00-00.json"),
        serde_json::to_string_pretty(&records).unwrap(),
    )
    .unwrap();
}

// ============================================================================
// CLI Integration Tests
// ============================================================================

#[test]
fn test_cli_help_command() {
    let output = Command::new(BIN).arg("--help").output().unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("peak"), "Help should list peak command");
    assert!(stdout.contains("inline"), "Help should list inline command");
    assert!(stdout.contains("frontier"), "Help should list frontier command");
}

#[test]
fn test_cli_frontier_rejects_malformed_run() {
    let output = Command::new(BIN)
        .args(["frontier", "--runs", "no-separator"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("LABEL=DIR"));
}

#[test]
fn test_cli_frontier_writes_chart() {
    let tmp = tempfile::tempdir().unwrap();
    let run_8 = tmp.path().join("run8");
    let run_16 = tmp.path().join("run16");
    write_run(&run_8, &[(1, 10.0, 100.0), (2, 20.0, 150.0)]);
    write_run(&run_16, &[(1, 15.0, 300.0), (2, 30.0, 420.0)]);
    let out = tmp.path().join("out");

    let output = Command::new(BIN)
        .args([
            "frontier",
            "--runs",
            &format!("8={}", run_8.display()),
            &format!("16={}", run_16.display()),
            "--title",
            "merged",
            "--output-dir",
            out.to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Frontier: merged"));
    assert!(out.join("merged.html").exists());
}

#[test]
fn test_cli_peak_missing_json_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let config = tmp.path().join("config.yaml");
    std::fs::write(&config, DISABLED_PUBLISH).unwrap();

    let output = Command::new(BIN)
        .args([
            "peak",
            "--json",
            tmp.path().join("absent.json").to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to generate report"));
}

#[test]
fn test_cli_peak_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    let run = tmp.path().join("runs/1000/32");
    write_run(&run, &[(1, 12.0, 80.0), (2, 22.0, 90.0), (4, 40.0, 120.0)]);

    let json = tmp.path().join("peak_results.json");
    std::fs::write(
        &json,
        serde_json::json!({
            "config": {"user": "ops", "save": "local", "model": "demo"},
            "data": {"1000": {"32": {"cos_url": run.display().to_string()}}}
        })
        .to_string(),
    )
    .unwrap();
    let config = tmp.path().join("config.yaml");
    std::fs::write(&config, DISABLED_PUBLISH).unwrap();
    let out = tmp.path().join("out");

    let output = Command::new(BIN)
        .args([
            "peak",
            "--json",
            json.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
            "--output-dir",
            out.to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("input_tokens: 1000: 3 points"));
    assert!(out.join("throughput_vs_latency.html").exists());
}

// ============================================================================
// Library Integration Tests
// ============================================================================

#[test]
fn test_peak_two_groups_sorted_numerically() {
    let tmp = tempfile::tempdir().unwrap();
    let mut data = serde_json::Map::new();
    for input in ["2000", "500"] {
        let mut outputs = serde_json::Map::new();
        for output in ["128", "64"] {
            let dir = tmp.path().join(format!("runs/{input}/{output}"));
            write_run(&dir, &[(1, 10.0, 100.0), (2, 18.0, 130.0), (4, 30.0, 200.0)]);
            outputs.insert(
                output.to_string(),
                serde_json::json!({"cos_url": dir.display().to_string()}),
            );
        }
        data.insert(input.to_string(), serde_json::Value::Object(outputs));
    }
    let results: PeakResults = serde_json::from_value(serde_json::json!({
        "config": {"user": "ops"},
        "data": data,
    }))
    .unwrap();

    let config = VisualizerConfig {
        output_dir: tmp.path().join("out"),
        ..VisualizerConfig::default()
    };
    let ctx = PipelineContext::new(config, Publisher::disabled());
    let outcome = process_peak(&results, &ctx).unwrap();

    let labels: Vec<&str> = outcome.frontiers.iter().map(|f| f.label.as_str()).collect();
    assert_eq!(labels, vec!["input_tokens: 500", "input_tokens: 2000"]);
    let inputs: Vec<u64> = outcome
        .report
        .throughput
        .iter()
        .map(|g| g.input_tokens)
        .collect();
    assert_eq!(inputs, vec![500, 2000]);

    let html = std::fs::read_to_string(&outcome.files.html).unwrap();
    assert!(html.contains("throughput_vs_latency.html"));
}

#[test]
fn test_reducer_keeps_single_curve() {
    let curve = Curve::from_pairs("only", 1, &[(1.0, 10.0), (2.0, 20.0), (3.0, 30.0)]);
    let merged = FrontierReducer::default().merge(vec![curve], "m");

    assert_eq!(
        merged.points,
        vec![
            Point::new(1.0, 10.0),
            Point::new(2.0, 20.0),
            Point::new(3.0, 30.0)
        ]
    );
}
