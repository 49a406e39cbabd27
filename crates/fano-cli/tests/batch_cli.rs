use fano_core::modules::fano_value;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const TRUTH: [f64; 5] = [552.0, 10.0, 4.0, 0.5, 1.0];

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent directory should be created");
    }
    fs::write(path, content).expect("file should be written");
}

fn spectrum_text(intensity: impl Fn(f64) -> f64) -> String {
    (0..50)
        .map(|index| {
            let x = 530.0 + index as f64 * 0.8;
            format!("{};{}\n", x, intensity(x))
        })
        .collect()
}

fn stage_run(root: &Path) {
    write_file(
        &root.join("info.json"),
        r#"{
            "Spectrum Path": "Spectrum",
            "Background Path": "Background",
            "Results Path": "Results",
            "Plot Files": "True"
        }"#,
    );
    write_file(
        &root.join("Spectrum/A1_P250_TE_int100.txt"),
        &spectrum_text(|x| 150.0 * fano_value(x, &TRUTH)),
    );
    write_file(
        &root.join("Background/A1_P250_TE_int100_bg.txt"),
        &spectrum_text(|_| 150.0),
    );
}

fn run_fano_fit(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fano-fit"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("fano-fit should run")
}

#[test]
fn batch_command_writes_peak_json_and_fit_curve() {
    let temp = TempDir::new().expect("tempdir should be created");
    stage_run(temp.path());
    let config = temp.path().join("info.json");

    let output = run_fano_fit(&[
        "batch",
        "--config",
        config.to_str().expect("utf-8 path"),
        "--window",
        "535",
        "569",
    ]);

    assert!(
        output.status.success(),
        "batch should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Fitted 1 spectra; skipped 0"), "stdout: {stdout}");

    let results = temp.path().join("Results");
    let document: Value = serde_json::from_str(
        &fs::read_to_string(results.join("A1_Peak.json")).expect("batch output should exist"),
    )
    .expect("batch output should be JSON");
    assert_eq!(document["P250"]["polarization"], json!("TE"));
    assert_eq!(document["P250"]["integration_time_ms"], json!(100));
    assert_eq!(document["P250"]["converged"], json!(true));

    let curve = fs::read_to_string(results.join("A1_P250_Peak.csv"))
        .expect("fit curve should be written when plotting is enabled");
    assert!(curve.starts_with("wavelength,intensity,model\n"));
    assert_eq!(curve.lines().count(), 45);
}

#[test]
fn second_batch_run_keeps_existing_output_unless_overwriting() {
    let temp = TempDir::new().expect("tempdir should be created");
    stage_run(temp.path());
    let config = temp.path().join("info.json");
    let config = config.to_str().expect("utf-8 path");
    let output_path = temp.path().join("Results/A1_Peak.json");
    write_file(&output_path, "{}");

    let output = run_fano_fit(&["batch", "--config", config, "--window", "535", "569"]);
    assert!(output.status.success());
    assert_eq!(
        fs::read_to_string(&output_path).expect("output readable"),
        "{}"
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("Kept existing"));

    let output = run_fano_fit(&[
        "batch",
        "--config",
        config,
        "--window",
        "535",
        "569",
        "--overwrite",
    ]);
    assert!(output.status.success());
    assert_ne!(
        fs::read_to_string(&output_path).expect("output readable"),
        "{}"
    );
}

#[test]
fn fit_command_writes_single_entry_json() {
    let temp = TempDir::new().expect("tempdir should be created");
    stage_run(temp.path());
    let scan = temp.path().join("Spectrum/A1_P250_TE_int100.txt");
    let background = temp.path().join("Background/A1_P250_TE_int100_bg.txt");
    let json_path = temp.path().join("single.json");

    let output = run_fano_fit(&[
        "fit",
        scan.to_str().expect("utf-8 path"),
        "--background",
        background.to_str().expect("utf-8 path"),
        "--window",
        "569",
        "535",
        "--json",
        json_path.to_str().expect("utf-8 path"),
    ]);
    assert!(
        output.status.success(),
        "fit should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let entry: Value = serde_json::from_str(
        &fs::read_to_string(&json_path).expect("json output should exist"),
    )
    .expect("json output should parse");
    assert_eq!(entry["trim_range"], json!([6, 49]));
    assert_eq!(entry["background"]["integration_time_ms"], json!(100));
    let peak = entry["peak_wavelength"].as_f64().expect("peak is numeric");
    assert!((peak - TRUTH[0]).abs() <= 1.0e-4, "peak {peak}");
}

#[test]
fn missing_config_exits_with_io_code() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = temp.path().join("absent.json");

    let output = run_fano_fit(&[
        "batch",
        "--config",
        config.to_str().expect("utf-8 path"),
        "--window",
        "535",
        "569",
    ]);

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: [IO.FILE]"), "stderr: {stderr}");
    assert!(stderr.contains("FATAL EXIT CODE: 3"), "stderr: {stderr}");
}

#[test]
fn mismatched_background_is_a_usage_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    stage_run(temp.path());
    let scan = temp.path().join("Spectrum/A1_P250_TE_int100.txt");
    let other = temp.path().join("Background/A1_P250_TM_bg.txt");
    write_file(&other, &spectrum_text(|_| 150.0));

    let output = run_fano_fit(&[
        "fit",
        scan.to_str().expect("utf-8 path"),
        "--background",
        other.to_str().expect("utf-8 path"),
        "--window",
        "535",
        "569",
    ]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("[INPUT.CLI_USAGE]"));
}

#[test]
fn help_exits_cleanly() {
    let output = run_fano_fit(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("batch"));
    assert!(stdout.contains("fit"));
}
