use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;
use ublink_core::modules::{
    BeamGeometry, PeakPredictor, PredictionRequest, ReflectionPredictor, b_matrix,
    select_predicted, write_orientation, write_peak_table,
};
use ublink_core::numerics::Mat3;
use ublink_core::{LatticeConstants, LinkConfig, OrientationMatrix, Peak, PeakCatalogue};

const CELL_CONFIG: &str = r#"{ "a": 5.0, "b": 5.0, "c": 5.0, "iterations": 4 }"#;

fn run_ublink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ublink"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("ublink should launch")
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent directory should be created");
    }
    fs::write(path, content).expect("file should be written");
}

fn read_json(path: &Path) -> Value {
    let content = fs::read_to_string(path).expect("JSON output should be readable");
    serde_json::from_str(&content).expect("JSON output should parse")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

fn reference_orientation() -> OrientationMatrix {
    let b = b_matrix(&LatticeConstants::cubic(5.0)).expect("B matrix should build");
    OrientationMatrix::new(b)
}

fn rotated_orientation() -> OrientationMatrix {
    let rotation = Mat3::rotation([0.0, 1.0, 1.0], 0.75_f64.to_radians());
    OrientationMatrix::new(rotation.matmul(reference_orientation().matrix()))
}

/// Writes the reference UB and a noise-free observed table for the rotated
/// crystal into `dir`.
fn write_synthetic_inputs(dir: &Path) {
    write_orientation(dir.join("reference_ub.json"), &reference_orientation())
        .expect("reference UB should be written");

    let config = LinkConfig::default().with_lattice(LatticeConstants::cubic(5.0));
    let request = PredictionRequest::from_config(&config, BeamGeometry::default());
    let predicted = ReflectionPredictor
        .predict(&rotated_orientation(), &request)
        .expect("prediction should succeed");
    let observed: PeakCatalogue = select_predicted(&predicted, 50)
        .iter()
        .map(|peak| Peak::observed(peak.q_lab, peak.d_spacing))
        .collect();
    write_peak_table(dir.join("observed.json"), &observed)
        .expect("observed table should be written");
}

#[test]
fn link_from_reference_ub_writes_all_outputs() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_synthetic_inputs(temp.path());
    let config = temp.path().join("config.json");
    write_file(&config, CELL_CONFIG);
    let output_dir = temp.path().join("out");

    let output = run_ublink(&[
        "link",
        "--config",
        path_arg(&config),
        "--observed",
        path_arg(&temp.path().join("observed.json")),
        "--reference-ub",
        path_arg(&temp.path().join("reference_ub.json")),
        "--output-dir",
        path_arg(&output_dir),
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("iteration ").count(), 4);

    let linked = read_json(&output_dir.join("LinkedPeaks.json"));
    let rows = linked["peaks"].as_array().expect("peaks should be an array");
    assert!(rows.len() >= 15);
    for row in rows {
        let hkl: Vec<i64> = row["hkl"]
            .as_array()
            .expect("linked rows carry hkl")
            .iter()
            .map(|value| value.as_i64().expect("integer index"))
            .collect();
        assert_ne!(hkl, vec![0, 0, 0]);
    }

    let predicted = read_json(&output_dir.join("LinkedPredictedPeaks.json"));
    assert!(!predicted["peaks"].as_array().expect("peaks array").is_empty());
    assert!(predicted["ub"].is_array());

    let ub = read_json(&output_dir.join("LinkedUB.json"));
    let expected = rotated_orientation().to_rows();
    for (row, expected_row) in expected.iter().enumerate() {
        for (col, expected_value) in expected_row.iter().enumerate() {
            let value = ub["ub"][row][col].as_f64().expect("UB element");
            assert!((value - expected_value).abs() < 1.0e-8);
        }
    }

    let summary =
        fs::read_to_string(output_dir.join("LinkedPeaks.dat")).expect("summary should exist");
    assert_eq!(summary.lines().count(), rows.len() + 1);
}

#[test]
fn degenerate_fit_exits_with_no_outputs() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = temp.path().join("config.json");
    write_file(
        &config,
        r#"{ "a": 5.0, "b": 5.0, "c": 5.0, "qTolerance": 0.01, "dTolerance": 0.01, "iterations": 1 }"#,
    );
    let observed = temp.path().join("observed.json");
    write_file(
        &observed,
        r#"{ "peaks": [ { "qLab": [1.0, 0.0, 0.0], "dSpacing": 5.0 } ] }"#,
    );
    let predicted = temp.path().join("predicted.json");
    write_file(
        &predicted,
        r#"{ "peaks": [ { "qLab": [1.0, 0.0, 0.0], "dSpacing": 5.0, "hkl": [1, 0, 0] } ] }"#,
    );
    let output_dir = temp.path().join("out");

    let output = run_ublink(&[
        "link",
        "--config",
        path_arg(&config),
        "--observed",
        path_arg(&observed),
        "--predicted",
        path_arg(&predicted),
        "--output-dir",
        path_arg(&output_dir),
    ]);

    assert_eq!(output.status.code(), Some(4));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: [RUN.DEGENERATE_FIT]"), "stderr: {stderr}");
    assert!(stderr.contains("FATAL EXIT CODE: 4"));
    assert!(!output_dir.join("LinkedPeaks.json").exists());
    assert!(!output_dir.join("LinkedPredictedPeaks.json").exists());
}

#[test]
fn workspace_is_deleted_only_after_success() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_synthetic_inputs(temp.path());
    let config = temp.path().join("config.json");
    write_file(
        &config,
        r#"{ "a": 5.0, "b": 5.0, "c": 5.0, "iterations": 2, "deleteWorkspace": true }"#,
    );
    let workspace = temp.path().join("workspace.json");
    write_file(&workspace, r#"{ "beamDirection": [0.0, 0.0, 1.0] }"#);

    let failing = run_ublink(&[
        "link",
        "--config",
        path_arg(&config),
        "--observed",
        path_arg(&temp.path().join("missing.json")),
        "--reference-ub",
        path_arg(&temp.path().join("reference_ub.json")),
        "--workspace",
        path_arg(&workspace),
        "--output-dir",
        path_arg(&temp.path().join("out")),
    ]);
    assert_eq!(failing.status.code(), Some(3));
    assert!(workspace.exists());

    let output = run_ublink(&[
        "link",
        "--config",
        path_arg(&config),
        "--observed",
        path_arg(&temp.path().join("observed.json")),
        "--reference-ub",
        path_arg(&temp.path().join("reference_ub.json")),
        "--workspace",
        path_arg(&workspace),
        "--output-dir",
        path_arg(&temp.path().join("out")),
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(!workspace.exists());
}

#[test]
fn invalid_configuration_names_the_field() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = temp.path().join("config.json");
    write_file(&config, r#"{ "qDecrement": 1.5 }"#);

    let output = run_ublink(&["schedule", "--config", path_arg(&config)]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[INPUT.QDECREMENT]"), "stderr: {stderr}");
}

#[test]
fn unknown_configuration_keys_are_rejected() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = temp.path().join("config.json");
    write_file(&config, r#"{ "qTolerence": 0.3 }"#);

    let output = run_ublink(&["schedule", "--config", path_arg(&config)]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("[INPUT.CONFIG_FORMAT]"));
}

#[test]
fn schedule_prints_one_row_per_iteration() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = temp.path().join("config.json");
    write_file(&config, r#"{ "iterations": 3, "numPeaks": 5, "peakIncrement": 2 }"#);

    let output = run_ublink(&["schedule", "--config", path_arg(&config)]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let windows: Vec<&str> = stdout
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().last())
        .collect();
    assert_eq!(windows, ["5", "7", "9"]);
}

#[test]
fn predict_writes_a_predicted_table() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_synthetic_inputs(temp.path());
    let config = temp.path().join("config.json");
    write_file(&config, r#"{ "reflectionCondition": "F" }"#);
    let output_path = temp.path().join("predicted/peaks.json");

    let output = run_ublink(&[
        "predict",
        "--config",
        path_arg(&config),
        "--ub",
        path_arg(&temp.path().join("reference_ub.json")),
        "--output",
        path_arg(&output_path),
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let table = read_json(&output_path);
    let rows = table["peaks"].as_array().expect("peaks array");
    assert!(!rows.is_empty());
    for row in rows {
        let parity: Vec<i64> = row["hkl"]
            .as_array()
            .expect("predicted rows carry hkl")
            .iter()
            .map(|value| value.as_i64().expect("integer index").rem_euclid(2))
            .collect();
        assert!(parity.iter().all(|value| *value == parity[0]));
    }
}

#[test]
fn missing_seed_is_a_usage_error() {
    let output = run_ublink(&[
        "link",
        "--config",
        "config.json",
        "--observed",
        "observed.json",
        "--output-dir",
        "out",
    ]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("[INPUT.CLI_USAGE]"));
}
