use super::identifier::ParsedFileName;
use super::index::FileIndex;
use crate::domain::DEFAULT_INTEGRATION_TIME_MS;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundMatch {
    Found {
        path: PathBuf,
        parsed: ParsedFileName,
    },
    Missing,
}

impl BackgroundMatch {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    fn integration_time_ms(&self) -> Option<Option<u32>> {
        match self {
            Self::Found { parsed, .. } => Some(parsed.integration_time_ms),
            Self::Missing => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrationTimes {
    pub scan_ms: u32,
    /// `None` when no background was matched.
    pub background_ms: Option<u32>,
}

/// First background (in index order) with the scan's primary, secondary and
/// polarization. Integration time is deliberately not compared.
pub fn resolve_background(scan: &ParsedFileName, index: &FileIndex) -> BackgroundMatch {
    for file in index.backgrounds() {
        match file.parse() {
            Ok(parsed) if parsed.shares_sample_with(scan) => {
                tracing::debug!(
                    scan = %scan.file_name,
                    background = %file.path.display(),
                    "matched background"
                );
                return BackgroundMatch::Found {
                    path: file.path.clone(),
                    parsed,
                };
            }
            Ok(_) => {}
            Err(error) => {
                tracing::debug!(
                    background = %file.path.display(),
                    "ignoring background with unparseable name: {error}"
                );
            }
        }
    }

    BackgroundMatch::Missing
}

/// Cross-file integration-time fallback: whichever file names a time lends
/// it to the other; if neither does both use the default.
pub fn reconcile_integration_times(
    scan: &ParsedFileName,
    background: &BackgroundMatch,
) -> IntegrationTimes {
    match background.integration_time_ms() {
        None => IntegrationTimes {
            scan_ms: scan
                .integration_time_ms
                .unwrap_or(DEFAULT_INTEGRATION_TIME_MS),
            background_ms: None,
        },
        Some(background_ms) => {
            let scan_ms = scan
                .integration_time_ms
                .or(background_ms)
                .unwrap_or(DEFAULT_INTEGRATION_TIME_MS);
            let background_ms = background_ms.unwrap_or(scan_ms);
            IntegrationTimes {
                scan_ms,
                background_ms: Some(background_ms),
            }
        }
    }
}
