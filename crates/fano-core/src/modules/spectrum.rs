use crate::domain::{ErrorKind, FanoError, FanoResult, Spectrum};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Semicolon,
}

impl Delimiter {
    pub const fn as_char(self) -> char {
        match self {
            Self::Comma => ',',
            Self::Semicolon => ';',
        }
    }

    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Comma => b',',
            Self::Semicolon => b';',
        }
    }
}

pub fn read_spectrum(path: &Path) -> FanoResult<Spectrum> {
    let source = fs::read_to_string(path).map_err(|source| {
        FanoError::io(format!(
            "failed to read spectrum '{}': {}",
            path.display(),
            source
        ))
    })?;
    parse_spectrum_source(&source, &path.display().to_string())
}

/// Parses two-column text; malformed rows are dropped with a warning.
pub fn parse_spectrum_source(source: &str, label: &str) -> FanoResult<Spectrum> {
    let delimiter = detect_delimiter(source, label)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter.as_byte())
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source.as_bytes());

    let mut spectrum = Spectrum::default();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!(source = label, "skipping unreadable spectrum row: {error}");
                continue;
            }
        };
        if record.iter().all(str::is_empty) {
            continue;
        }

        match parse_record(&record) {
            Ok((wavelength, intensity)) => {
                spectrum.wavelength.push(wavelength);
                spectrum.intensity.push(intensity);
            }
            Err(reason) => {
                tracing::warn!(
                    source = label,
                    line = record.position().map_or(0, csv::Position::line),
                    "skipping malformed spectrum row: {reason}"
                );
            }
        }
    }

    if spectrum.is_empty() {
        return Err(FanoError::new(
            ErrorKind::EmptyFile,
            format!("spectrum '{}' contains no numeric rows", label),
        ));
    }

    Ok(spectrum)
}

pub fn write_delimited(spectrum: &Spectrum, delimiter: Delimiter) -> String {
    let separator = delimiter.as_char();
    let mut content = String::with_capacity(spectrum.len() * 24);
    for (wavelength, intensity) in spectrum.wavelength.iter().zip(&spectrum.intensity) {
        content.push_str(&format!("{wavelength}{separator}{intensity}\n"));
    }
    content
}

/// Decided by the first non-blank line that carries a separator.
fn detect_delimiter(source: &str, label: &str) -> FanoResult<Delimiter> {
    for line in source.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if line.contains(';') {
            return Ok(Delimiter::Semicolon);
        }
        if line.contains(',') {
            return Ok(Delimiter::Comma);
        }
        if line.split_whitespace().count() > 1 {
            return Err(FanoError::new(
                ErrorKind::UnsupportedDelimiter,
                format!(
                    "spectrum '{}' is neither comma nor semicolon delimited (first row '{}')",
                    label, line
                ),
            ));
        }
    }

    Err(FanoError::new(
        ErrorKind::EmptyFile,
        format!("spectrum '{}' contains no delimited rows", label),
    ))
}

fn parse_record(record: &csv::StringRecord) -> Result<(f64, f64), String> {
    let mut fields: Vec<&str> = record.iter().collect();
    while fields.len() > 2 && fields.last().is_some_and(|field| field.is_empty()) {
        fields.pop();
    }

    let [wavelength, intensity] = fields.as_slice() else {
        return Err(format!("expected 2 columns, found {}", fields.len()));
    };

    Ok((parse_field(wavelength)?, parse_field(intensity)?))
}

fn parse_field(field: &str) -> Result<f64, String> {
    let value = field
        .parse::<f64>()
        .map_err(|_| format!("'{field}' is not a number"))?;
    if !value.is_finite() {
        return Err(format!("'{field}' is not finite"));
    }
    Ok(value)
}
