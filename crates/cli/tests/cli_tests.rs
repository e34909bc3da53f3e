//! CLI integration tests

use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

const MATRIX: &str = r#"{
  "quarters": ["2016Q1", "2016Q2", "2016Q3", "2016Q4", "2017Q1", "2017Q2", "2017Q3", "2017Q4", "2018Q1", "2018Q2"],
  "terms": [
    {"term": "quantum computing", "counts": [10, 10, 10, 10, 10, 10, 10, 50, 60, 70]},
    {"term": "fax machine", "counts": [50, 48, 46, 44, 42, 40, 38, 36, 34, 32]},
    {"term": "blockchain", "counts": [20, 21, 19, 20, 22, 19, 20, 21, 20, 19]}
  ]
}"#;

fn matrix_file() -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(MATRIX.as_bytes()).unwrap();
    file
}

fn emtech(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_emtech"))
        .args(args)
        .env("RUST_LOG", "warn")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = emtech(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("forecast"), "Should show forecast command");
    assert!(stdout.contains("classify"), "Should show classify command");
    assert!(stdout.contains("predictors"), "Should show predictors command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = emtech(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("emtech"), "Should show binary name");
}

#[test]
fn test_predictors_listing() {
    let output = emtech(&["predictors", "--format", "json"]);
    assert!(output.status.success());
    let listing: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = listing.as_array().unwrap();
    assert_eq!(entries.len(), 13);
    assert_eq!(entries[0]["name"], "All");
    assert_eq!(entries[6]["name"], "Holt-Winters");
}

#[test]
fn test_classify_json() {
    let input = matrix_file();
    let output = emtech(&[
        "classify",
        "--input",
        input.path().to_str().unwrap(),
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let classifications: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let label_of = |term: &str| {
        classifications
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["term"] == term)
            .map(|c| c["label"].as_str().unwrap().to_string())
    };
    assert_eq!(label_of("quantum computing").as_deref(), Some("emergent"));
    assert_eq!(label_of("fax machine").as_deref(), Some("declining"));
    assert_eq!(label_of("blockchain").as_deref(), Some("stationary"));
}

#[test]
fn test_forecast_json_report() {
    let input = matrix_file();
    let output = emtech(&[
        "forecast",
        "--input",
        input.path().to_str().unwrap(),
        "--predictors",
        "Naive,Linear",
        "--emergence",
        "emergent,declining",
        "--steps-ahead",
        "2",
        "--test",
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let sections = report["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0]["title"], "Forecasts Evaluation (emergent)");
    assert_eq!(sections[1]["title"], "Forecasts Evaluation (declining)");

    let naive = &sections[0]["groups"][0];
    assert_eq!(naive["predictor"], "Naive");
    let result = &naive["results"][0];
    assert_eq!(result["term"], "quantum computing");
    assert_eq!(result["status"], "completed");
    assert_eq!(result["forecast"].as_array().unwrap().len(), 2);
    assert_eq!(result["forecast"][0]["quarter"], "2018Q1");
    assert!(result["errors"]["mae"].is_number());
}

#[test]
fn test_forecast_html_to_file() {
    let input = matrix_file();
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("report.html");
    let metrics_path = dir.path().join("metrics.prom");

    let output = emtech(&[
        "forecast",
        "--input",
        input.path().to_str().unwrap(),
        "--predictors",
        "2",
        "--normalised",
        "--format",
        "html",
        "--output",
        report_path.to_str().unwrap(),
        "--metrics-file",
        metrics_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let html = std::fs::read_to_string(&report_path).unwrap();
    assert!(html.contains("<title>Forecasts: Normalised Counts (emergent)</title>"));
    assert!(html.contains("Linear"));

    let metrics = std::fs::read_to_string(&metrics_path).unwrap();
    assert!(metrics.contains("emtech_runs_total 1"));
}

#[test]
fn test_forecast_explicit_terms_unfiltered() {
    let input = matrix_file();
    let output = emtech(&[
        "forecast",
        "--input",
        input.path().to_str().unwrap(),
        "--predictors",
        "Naive",
        "--terms",
        "fax machine,blockchain",
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let sections = report["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 1);
    assert!(sections[0]["label"].is_null());
    assert_eq!(sections[0]["title"], "Forecasts");
    assert_eq!(sections[0]["terms"], serde_json::json!(["fax machine", "blockchain"]));
}

#[test]
fn test_forecast_curves_in_html() {
    let input = matrix_file();
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("curves.html");
    let output = emtech(&[
        "forecast",
        "--input",
        input.path().to_str().unwrap(),
        "--unfiltered",
        "--curves",
        "--format",
        "html",
        "--output",
        report_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let html = std::fs::read_to_string(&report_path).unwrap();
    assert!(html.contains("<th>Fitted Curve</th>"));
    assert!(html.contains("<title>Forecasts</title>"));
}

#[test]
fn test_unknown_term_fails() {
    let input = matrix_file();
    let output = emtech(&[
        "forecast",
        "--input",
        input.path().to_str().unwrap(),
        "--terms",
        "cold fusion",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown term 'cold fusion'"));
}

#[test]
fn test_unknown_predictor_fails() {
    let input = matrix_file();
    let output = emtech(&[
        "forecast",
        "--input",
        input.path().to_str().unwrap(),
        "--predictors",
        "Prophet",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown predictor 'Prophet'"), "{}", stderr);
}

#[test]
fn test_missing_input_fails() {
    let output = emtech(&["forecast", "--input", "/nonexistent/matrix.json"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to open"));
}
