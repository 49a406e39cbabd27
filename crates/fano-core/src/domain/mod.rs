pub mod errors;

pub use errors::{
    ErrorCategory, ErrorKind, FanoError, FanoResult, ParserResult, PipelineResult,
};

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DEFAULT_INTEGRATION_TIME_MS: u32 = 1000;

/// Fitted parameter names in optimizer order.
pub const FANO_PARAMETER_NAMES: [&str; 5] = ["peak", "gamma", "q", "amplitude", "damping"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Polarization {
    #[serde(rename = "TE")]
    Te,
    #[serde(rename = "TM")]
    Tm,
}

impl Polarization {
    /// Exact, case-sensitive token match.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "TE" => Some(Self::Te),
            "TM" => Some(Self::Tm),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Te => "TE",
            Self::Tm => "TM",
        }
    }
}

impl Display for Polarization {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileRole {
    Scan,
    Background,
}

impl FileRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Background => "background",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleIdentifier {
    pub primary: String,
    pub secondary: String,
    pub integration_time_ms: u32,
    pub polarization: Polarization,
    pub extra_tokens: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Spectrum {
    pub wavelength: Vec<f64>,
    pub intensity: Vec<f64>,
}

impl Spectrum {
    pub fn new(wavelength: Vec<f64>, intensity: Vec<f64>) -> Self {
        Self {
            wavelength,
            intensity,
        }
    }

    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumRecord {
    pub spectrum: Spectrum,
    pub identifier: SampleIdentifier,
    pub source_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSpectrum {
    pub wavelength: Vec<f64>,
    pub normalized_intensity: Vec<f64>,
    pub background_used: bool,
}

/// Inclusive index window over a spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(into = "[usize; 2]")]
pub struct TrimRange {
    pub start: usize,
    pub end: usize,
}

impl TrimRange {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of points covered; zero for an inverted range.
    pub const fn width(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }
}

impl From<TrimRange> for [usize; 2] {
    fn from(range: TrimRange) -> Self {
        [range.start, range.end]
    }
}

impl Display for TrimRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitResult {
    pub gamma: f64,
    pub q: f64,
    pub amplitude: f64,
    pub damping_factor: f64,
    pub peak_wavelength: f64,
    pub peak_error: f64,
    pub errors: BTreeMap<String, f64>,
    pub converged: bool,
    pub trim_range: TrimRange,
}

impl FitResult {
    /// Zeroed result for a fit the optimizer could not complete.
    pub fn failed(trim_range: TrimRange) -> Self {
        Self {
            gamma: 0.0,
            q: 0.0,
            amplitude: 0.0,
            damping_factor: 0.0,
            peak_wavelength: 0.0,
            peak_error: 0.0,
            errors: FANO_PARAMETER_NAMES
                .iter()
                .map(|name| (name.to_string(), 0.0))
                .collect(),
            converged: false,
            trim_range,
        }
    }

    /// Parameter values in `FANO_PARAMETER_NAMES` order.
    pub fn parameters(&self) -> [f64; 5] {
        [
            self.peak_wavelength,
            self.gamma,
            self.q,
            self.amplitude,
            self.damping_factor,
        ]
    }
}
