use super::CliError;
use anyhow::Context;
use fano_core::domain::{ErrorKind, FanoError, FanoResult, TrimRange};
use fano_core::modules::{
    BackgroundEntry, BatchReport, OutputSummary, RegionRequest, RegionSelector,
    SampleResultEntry, WavelengthWindow,
};
use std::fmt::Write as _;
use std::io::{BufRead, Write};
use tracing_subscriber::EnvFilter;

pub(super) fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // A second initialisation in the same process keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub(super) fn window_from_bounds(bounds: &[f64]) -> Result<WavelengthWindow, CliError> {
    match bounds {
        [first, second] => Ok(WavelengthWindow::new(*first, *second)),
        _ => Err(CliError::Usage(format!(
            "--window expects two wavelengths, got {}",
            bounds.len()
        ))),
    }
}

/// Asks for two wavelengths per file on `output` and reads them from `input`.
pub(super) struct PromptRegionSelector<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptRegionSelector<R, W> {
    pub(super) fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn prompt(&mut self, request: &RegionRequest<'_>) -> anyhow::Result<Option<String>> {
        let (low, high) = request
            .wavelength
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), value| {
                (low.min(*value), high.max(*value))
            });
        write!(
            self.output,
            "{}: enter fit window as two wavelengths within [{}, {}]: ",
            request.label, low, high
        )
        .context("failed to write region prompt")?;
        self.output.flush().context("failed to flush region prompt")?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("failed to read region selection")?;
        Ok((read > 0).then_some(line))
    }
}

impl<R: BufRead, W: Write> RegionSelector for PromptRegionSelector<R, W> {
    fn select_region(&mut self, request: &RegionRequest<'_>) -> FanoResult<TrimRange> {
        let line = self
            .prompt(request)
            .map_err(|error| FanoError::io(format!("{error:#}")))?
            .ok_or_else(|| {
                FanoError::new(
                    ErrorKind::RegionSelection,
                    format!("no window entered for '{}'", request.label),
                )
            })?;

        let bounds = parse_window_line(&line).ok_or_else(|| {
            FanoError::new(
                ErrorKind::RegionSelection,
                format!(
                    "expected two wavelengths for '{}', got '{}'",
                    request.label,
                    line.trim()
                ),
            )
        })?;
        WavelengthWindow::new(bounds[0], bounds[1]).resolve(request.wavelength)
    }
}

/// Two numbers separated by whitespace and/or a comma.
fn parse_window_line(line: &str) -> Option<[f64; 2]> {
    let values = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|field| !field.is_empty())
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    match values.as_slice() {
        [first, second] => Some([*first, *second]),
        _ => None,
    }
}

pub(super) fn render_fit_summary(entry: &SampleResultEntry) -> String {
    let fit = &entry.fit;
    let mut summary = String::new();
    let _ = writeln!(summary, "File: {}", entry.file_name);
    let background = match &entry.background {
        BackgroundEntry::Matched(background) => background.file_name.as_str(),
        BackgroundEntry::Missing => fano_core::modules::NO_BACKGROUND,
    };
    let _ = writeln!(summary, "Background: {}", background);
    let _ = writeln!(summary, "Window: {}", fit.trim_range);
    if fit.converged {
        let _ = writeln!(
            summary,
            "Peak: {:.4} +/- {:.4} nm",
            fit.peak_wavelength, fit.peak_error
        );
        let _ = writeln!(summary, "Gamma: {:.4}", fit.gamma);
        let _ = writeln!(summary, "q: {:.4}", fit.q);
        let _ = writeln!(summary, "Amplitude: {:.4}", fit.amplitude);
        let _ = writeln!(summary, "Damping: {:.4}", fit.damping_factor);
    } else {
        let _ = writeln!(summary, "Fit did not converge");
    }
    summary
}

pub(super) fn render_batch_summary(report: &BatchReport, outputs: &OutputSummary) -> String {
    let mut summary = String::new();
    let _ = writeln!(
        summary,
        "Fitted {} spectra; skipped {}",
        report.results.entry_count(),
        report.skipped.len()
    );
    for skipped in &report.skipped {
        let _ = writeln!(
            summary,
            "Skipped {}: {}",
            skipped.path.display(),
            skipped.reason.diagnostic_line()
        );
    }
    for path in &outputs.written {
        let _ = writeln!(summary, "Wrote {}", path.display());
    }
    for path in &outputs.kept_existing {
        let _ = writeln!(summary, "Kept existing {}", path.display());
    }
    for failed in &outputs.failed {
        let _ = writeln!(
            summary,
            "Failed to write {}: {}",
            failed.path.display(),
            failed.reason.diagnostic_line()
        );
    }
    summary
}
