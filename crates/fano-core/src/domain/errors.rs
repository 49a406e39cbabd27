use std::error::Error;
use std::fmt::{Display, Formatter};

pub type FanoResult<T> = Result<T, FanoError>;
pub type ParserResult<T> = FanoResult<T>;
pub type PipelineResult<T> = FanoResult<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Success,
    InputValidationError,
    IoSystemError,
    ComputationError,
    InternalError,
}

impl ErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::ComputationError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::ComputationError => "ComputationError",
            Self::InternalError => "InternalError",
        }
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

/// Every failure the core can report for a single file or for the run setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingIdentifier,
    MissingPolarization,
    UnsupportedDelimiter,
    EmptyFile,
    InvalidIntegrationTime,
    ZeroBackground,
    SpectrumLengthMismatch,
    InsufficientData,
    InvalidTrimRange,
    NonFiniteData,
    DegenerateSpectrum,
    RegionSelection,
    InvalidConfig,
    Usage,
    Io,
    Serialization,
}

impl ErrorKind {
    pub const fn category(self) -> ErrorCategory {
        match self {
            Self::MissingIdentifier
            | Self::MissingPolarization
            | Self::UnsupportedDelimiter
            | Self::EmptyFile
            | Self::InvalidIntegrationTime
            | Self::SpectrumLengthMismatch
            | Self::InsufficientData
            | Self::InvalidTrimRange
            | Self::NonFiniteData
            | Self::RegionSelection
            | Self::InvalidConfig
            | Self::Usage => ErrorCategory::InputValidationError,
            Self::ZeroBackground | Self::DegenerateSpectrum => ErrorCategory::ComputationError,
            Self::Io => ErrorCategory::IoSystemError,
            Self::Serialization => ErrorCategory::InternalError,
        }
    }

    pub const fn placeholder(self) -> &'static str {
        match self {
            Self::MissingIdentifier => "INPUT.MISSING_IDENTIFIER",
            Self::MissingPolarization => "INPUT.MISSING_POLARIZATION",
            Self::UnsupportedDelimiter => "INPUT.UNSUPPORTED_DELIMITER",
            Self::EmptyFile => "INPUT.EMPTY_FILE",
            Self::InvalidIntegrationTime => "INPUT.INVALID_INTEGRATION_TIME",
            Self::ZeroBackground => "RUN.ZERO_BACKGROUND",
            Self::SpectrumLengthMismatch => "INPUT.SPECTRUM_LENGTH_MISMATCH",
            Self::InsufficientData => "INPUT.INSUFFICIENT_DATA",
            Self::InvalidTrimRange => "INPUT.INVALID_TRIM_RANGE",
            Self::NonFiniteData => "INPUT.NON_FINITE_DATA",
            Self::DegenerateSpectrum => "RUN.DEGENERATE_SPECTRUM",
            Self::RegionSelection => "INPUT.REGION_SELECTION",
            Self::InvalidConfig => "INPUT.INVALID_CONFIG",
            Self::Usage => "INPUT.CLI_USAGE",
            Self::Io => "IO.FILE",
            Self::Serialization => "SYS.SERIALIZATION",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoError {
    kind: ErrorKind,
    message: String,
}

impl FanoError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConfig, message)
    }

    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    pub const fn placeholder(&self) -> &'static str {
        self.kind.placeholder()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.kind.category().exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category().is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.placeholder(), self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category()
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl Display for FanoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category().as_str(),
            self.placeholder(),
            self.message
        )
    }
}

impl Error for FanoError {}

#[cfg(test)]
mod tests {
    use super::{ErrorCategory, ErrorKind, FanoError};

    #[test]
    fn exit_codes_are_stable_per_category() {
        let cases = [
            (ErrorCategory::Success, 0),
            (ErrorCategory::InputValidationError, 2),
            (ErrorCategory::IoSystemError, 3),
            (ErrorCategory::ComputationError, 4),
            (ErrorCategory::InternalError, 5),
        ];

        for (category, exit_code) in cases {
            assert_eq!(category.exit_code(), exit_code);
        }
    }

    #[test]
    fn per_file_kinds_map_to_expected_categories() {
        assert_eq!(
            ErrorKind::MissingPolarization.category(),
            ErrorCategory::InputValidationError
        );
        assert_eq!(
            ErrorKind::ZeroBackground.category(),
            ErrorCategory::ComputationError
        );
        assert_eq!(ErrorKind::Io.category(), ErrorCategory::IoSystemError);
    }

    #[test]
    fn fatal_error_renders_diagnostic_lines() {
        let error = FanoError::new(
            ErrorKind::MissingPolarization,
            "file name 'A1_P250_int100' has no TE/TM token",
        );

        assert_eq!(error.exit_code(), 2);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [INPUT.MISSING_POLARIZATION] file name 'A1_P250_int100' has no TE/TM token"
        );
        assert_eq!(
            error.fatal_exit_line().as_deref(),
            Some("FATAL EXIT CODE: 2")
        );
        assert_eq!(
            error.to_string(),
            "InputValidationError [INPUT.MISSING_POLARIZATION] file name 'A1_P250_int100' has no TE/TM token"
        );
    }
}
