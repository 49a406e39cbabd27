use super::fano::fano_value;
use crate::domain::{ErrorKind, FanoError, FanoResult, FitResult};
use serde::Serialize;
use std::fs;
use std::path::Path;

pub const FIT_CURVE_HEADER: &str = "wavelength,intensity,model";

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn write_text_artifact(path: &Path, content: &str) -> FanoResult<()> {
    fs::write(path, normalize_text_artifact(content)).map_err(|source| {
        FanoError::io(format!(
            "failed to write artifact '{}': {}",
            path.display(),
            source
        ))
    })
}

pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> FanoResult<String> {
    serde_json::to_string_pretty(value).map_err(|source| {
        FanoError::new(
            ErrorKind::Serialization,
            format!("failed to serialize JSON: {}", source),
        )
    })
}

pub fn write_json_artifact<T: Serialize + ?Sized>(path: &Path, value: &T) -> FanoResult<()> {
    write_text_artifact(path, &to_pretty_json(value)?)
}

/// Measured window next to the fitted model, one row per sample.
pub fn fit_curve_artifact(wavelength: &[f64], intensity: &[f64], fit: &FitResult) -> String {
    let parameters = fit.parameters();
    let mut content = String::from(FIT_CURVE_HEADER);
    content.push('\n');
    for (x, y) in wavelength.iter().zip(intensity) {
        let model = if fit.converged {
            fano_value(*x, &parameters)
        } else {
            0.0
        };
        content.push_str(&format!("{x},{y},{model}\n"));
    }
    content
}

#[cfg(test)]
mod tests {
    use super::{
        FIT_CURVE_HEADER, fit_curve_artifact, normalize_text_artifact, write_json_artifact,
        write_text_artifact,
    };
    use crate::domain::{FitResult, TrimRange};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn normalize_text_artifact_uses_canonical_line_endings() {
        let normalized = normalize_text_artifact("alpha\r\nbeta\rgamma");
        assert_eq!(normalized, "alpha\nbeta\ngamma\n");
    }

    #[test]
    fn repeated_text_writes_produce_identical_bytes() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("artifact.csv");
        let input = "line 1\r\nline 2\rline 3";

        write_text_artifact(&path, input).expect("first write should succeed");
        let first = fs::read(&path).expect("artifact should be readable");

        write_text_artifact(&path, input).expect("second write should succeed");
        let second = fs::read(&path).expect("artifact should be readable");

        assert_eq!(first, second);
        assert_eq!(second, b"line 1\nline 2\nline 3\n");
    }

    #[test]
    fn json_artifact_is_pretty_and_newline_terminated() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("A1_Peak.json");

        write_json_artifact(&path, &serde_json::json!({"A1": {"converged": true}}))
            .expect("json should be written");
        let content = fs::read_to_string(&path).expect("json should be readable");

        assert!(content.starts_with("{\n  \"A1\""));
        assert!(content.ends_with("}\n"));
    }

    #[test]
    fn failed_fit_curve_has_zero_model_column() {
        let fit = FitResult::failed(TrimRange::new(0, 1));
        let content = fit_curve_artifact(&[500.0, 500.5], &[0.25, 1.0], &fit);

        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec![FIT_CURVE_HEADER, "500,0.25,0", "500.5,1,0"]);
    }

    #[test]
    fn unwritable_path_is_an_io_error() {
        let temp = TempDir::new().expect("tempdir should be created");
        let error = write_text_artifact(&temp.path().join("missing/dir/out.csv"), "x")
            .expect_err("missing parent should fail");
        assert_eq!(error.kind(), crate::domain::ErrorKind::Io);
    }
}
