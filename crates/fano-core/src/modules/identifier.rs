//! File-name grammar: `<primary>_<secondary>_<unordered tokens>`.
//!
//! The unordered tail may carry one integration-time token (`100int`,
//! `int100`, `100ms`, `ms100`) and must carry one polarization token (`TE` or
//! `TM`). Anything else is kept as pass-through metadata.

use crate::domain::{
    DEFAULT_INTEGRATION_TIME_MS, ErrorKind, FanoError, ParserResult, Polarization,
    SampleIdentifier,
};
use std::path::Path;

const TOKEN_SEPARATOR: char = '_';
const INTEGRATION_MARKERS: [&str; 2] = ["int", "ms"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFileName {
    pub file_name: String,
    pub primary: String,
    pub secondary: String,
    /// `None` until the cross-file fallback has run.
    pub integration_time_ms: Option<u32>,
    pub polarization: Polarization,
    pub tokens: Vec<String>,
}

impl ParsedFileName {
    pub fn resolve(&self, integration_time_ms: Option<u32>) -> SampleIdentifier {
        SampleIdentifier {
            primary: self.primary.clone(),
            secondary: self.secondary.clone(),
            integration_time_ms: integration_time_ms
                .or(self.integration_time_ms)
                .unwrap_or(DEFAULT_INTEGRATION_TIME_MS),
            polarization: self.polarization,
            extra_tokens: self.tokens.clone(),
        }
    }

    pub fn shares_sample_with(&self, other: &ParsedFileName) -> bool {
        self.primary == other.primary
            && self.secondary == other.secondary
            && self.polarization == other.polarization
    }
}

/// File name without directory or extension.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn parse_path(path: &Path) -> ParserResult<ParsedFileName> {
    parse_file_name(&file_stem(path))
}

pub fn parse_file_name(file_name: &str) -> ParserResult<ParsedFileName> {
    let tokens: Vec<String> = file_name
        .split(TOKEN_SEPARATOR)
        .map(str::to_string)
        .collect();

    let (primary, secondary) = match tokens.as_slice() {
        [primary, secondary, ..] if !primary.is_empty() && !secondary.is_empty() => {
            (primary.clone(), secondary.clone())
        }
        _ => {
            return Err(FanoError::new(
                ErrorKind::MissingIdentifier,
                format!(
                    "file name '{}' needs non-empty primary and secondary tokens separated by '{}'",
                    file_name, TOKEN_SEPARATOR
                ),
            ));
        }
    };

    let polarization = tokens
        .iter()
        .find_map(|token| Polarization::from_token(token))
        .ok_or_else(|| {
            FanoError::new(
                ErrorKind::MissingPolarization,
                format!("file name '{}' has no TE or TM token", file_name),
            )
        })?;

    let integration_time_ms = tokens
        .iter()
        .find_map(|token| parse_integration_token(token));

    Ok(ParsedFileName {
        file_name: file_name.to_string(),
        primary,
        secondary,
        integration_time_ms,
        polarization,
        tokens,
    })
}

/// Milliseconds from `<digits>int`, `int<digits>`, `<digits>ms` or `ms<digits>`.
pub fn parse_integration_token(token: &str) -> Option<u32> {
    INTEGRATION_MARKERS.iter().find_map(|marker| {
        token
            .strip_suffix(marker)
            .or_else(|| token.strip_prefix(marker))
            .and_then(parse_digit_run)
    })
}

fn parse_digit_run(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
