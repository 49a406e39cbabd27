//! Run configuration document (`info.json` by default).
//!
//! Keys follow the lab's existing files: `Spectrum Path`, `Background Path`,
//! `Results Path` and `Plot Files`. Relative paths are resolved against the
//! directory holding the document.

use crate::domain::{FanoError, FanoResult};
use crate::modules::index::DEFAULT_FILE_PATTERN;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE_NAME: &str = "info.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConfigDocument {
    #[serde(rename = "Spectrum Path")]
    pub spectrum_path: PathBuf,
    #[serde(rename = "Background Path", default)]
    pub background_path: Option<PathBuf>,
    #[serde(rename = "Results Path")]
    pub results_path: PathBuf,
    #[serde(rename = "Plot Files", default, deserialize_with = "deserialize_flag")]
    pub plot_files: bool,
    #[serde(rename = "File Pattern", default)]
    pub file_pattern: Option<String>,
}

impl ConfigDocument {
    pub fn resolve(self, base_dir: &Path) -> RunConfig {
        RunConfig {
            spectrum_dir: base_dir.join(self.spectrum_path),
            background_dir: self.background_path.map(|path| base_dir.join(path)),
            results_dir: base_dir.join(self.results_path),
            plot_files: self.plot_files,
            file_pattern: self
                .file_pattern
                .unwrap_or_else(|| DEFAULT_FILE_PATTERN.to_string()),
        }
    }
}

/// Configuration with every path made usable from the current directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub spectrum_dir: PathBuf,
    pub background_dir: Option<PathBuf>,
    pub results_dir: PathBuf,
    pub plot_files: bool,
    pub file_pattern: String,
}

pub fn load_config(path: &Path) -> FanoResult<RunConfig> {
    let source = fs::read_to_string(path).map_err(|source| {
        FanoError::io(format!(
            "failed to read config '{}': {}",
            path.display(),
            source
        ))
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    parse_config(&source, base_dir).map_err(|error| {
        FanoError::new(
            error.kind(),
            format!("{}: {}", path.display(), error.message()),
        )
    })
}

pub fn parse_config(source: &str, base_dir: &Path) -> FanoResult<RunConfig> {
    let document: ConfigDocument = serde_json::from_str(source).map_err(|source| {
        FanoError::invalid_config(format!("invalid config document: {}", source))
    })?;
    Ok(document.resolve(base_dir))
}

/// Case-insensitive `"true"` / `"false"`.
pub fn parse_flag(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Text(String),
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match FlagValue::deserialize(deserializer)? {
        FlagValue::Bool(value) => Ok(value),
        FlagValue::Text(text) => parse_flag(&text).ok_or_else(|| {
            D::Error::custom(format!("expected \"True\" or \"False\", got '{}'", text))
        }),
    }
}
