//! Per-file wiring of the parse → normalize → select → fit → aggregate chain,
//! and the batch loop that keeps going when a file fails.

use super::aggregate::{
    BackgroundEntry, BackgroundSummary, BatchResults, ResultSlot, SampleResultEntry,
};
use super::background::{BackgroundMatch, reconcile_integration_times, resolve_background};
use super::fano::{FanoFitter, trim_window};
use super::identifier::file_stem;
use super::index::{FileIndex, IndexedFile};
use super::normalize::{normalize_with_background, normalize_without_background};
use super::region::{RegionRequest, RegionSelector};
use super::serialization::{fit_curve_artifact, write_json_artifact, write_text_artifact};
use super::spectrum::read_spectrum;
use crate::domain::{FanoError, FanoResult, PipelineResult, SpectrumRecord};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: FanoError,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchReport {
    pub results: BatchResults,
    pub skipped: Vec<SkippedFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputOptions {
    pub overwrite: bool,
    pub plot_files: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputSummary {
    pub written: Vec<PathBuf>,
    pub kept_existing: Vec<PathBuf>,
    /// Batch outputs that could not be written; the remaining batches still are.
    pub failed: Vec<SkippedFile>,
}

pub fn batch_output_path(results_dir: &Path, primary: &str) -> PathBuf {
    results_dir.join(format!("{primary}_Peak.json"))
}

/// Runs one scan through every stage. Any error is fatal for this file only.
pub fn process_file<S: RegionSelector + ?Sized>(
    scan: &IndexedFile,
    index: &FileIndex,
    selector: &mut S,
    fitter: &FanoFitter,
) -> PipelineResult<SampleResultEntry> {
    let parsed = scan.parse()?;
    let background = resolve_background(&parsed, index);
    let times = reconcile_integration_times(&parsed, &background);

    let record = SpectrumRecord {
        spectrum: read_spectrum(&scan.path)?,
        identifier: parsed.resolve(Some(times.scan_ms)),
        source_path: scan.path.clone(),
    };

    let (normalized, background_entry) = match &background {
        BackgroundMatch::Found {
            path,
            parsed: reference_name,
        } => {
            let background_ms = times.background_ms.unwrap_or(times.scan_ms);
            let reference = read_spectrum(path)?;
            let normalized = normalize_with_background(
                &record.spectrum,
                &reference,
                times.scan_ms,
                background_ms,
            )?;
            let summary = BackgroundSummary {
                file_name: reference_name.file_name.clone(),
                file_path: path.display().to_string(),
                integration_time_ms: background_ms,
                polarization: reference_name.polarization,
                extra_tokens: reference_name.tokens.clone(),
            };
            (normalized, BackgroundEntry::Matched(summary))
        }
        BackgroundMatch::Missing => (
            normalize_without_background(&record.spectrum, times.scan_ms)?,
            BackgroundEntry::Missing,
        ),
    };

    let range = selector.select_region(&RegionRequest {
        label: &parsed.file_name,
        wavelength: &normalized.wavelength,
        intensity: &normalized.normalized_intensity,
    })?;
    let fit = fitter.fit(
        &normalized.wavelength,
        &normalized.normalized_intensity,
        range,
        None,
    )?;
    let (region_wavelength, region_intensity) = trim_window(
        &normalized.wavelength,
        &normalized.normalized_intensity,
        range,
    )?;

    tracing::info!(
        file = %parsed.file_name,
        background = normalized.background_used,
        converged = fit.converged,
        peak = fit.peak_wavelength,
        "processed spectrum"
    );

    Ok(SampleResultEntry {
        file_name: file_stem(&record.source_path),
        file_path: record.source_path.display().to_string(),
        identifier: record.identifier,
        background: background_entry,
        fit,
        region_wavelength: region_wavelength.to_vec(),
        region_intensity: region_intensity.to_vec(),
    })
}

/// Processes every scan in the index, batch by batch.
pub fn run_batch<S: RegionSelector + ?Sized>(
    index: &FileIndex,
    selector: &mut S,
    fitter: &FanoFitter,
) -> BatchReport {
    let grouped = index.scans_by_primary();
    let mut report = BatchReport::default();

    for (file, reason) in grouped.unparsed {
        tracing::warn!(file = %file.path.display(), "skipping scan: {}", reason.message());
        report.skipped.push(SkippedFile {
            path: file.path.clone(),
            reason,
        });
    }

    for (primary, files) in grouped.batches {
        tracing::info!(batch = %primary, files = files.len(), "processing batch");
        for file in files {
            match process_file(file, index, selector, fitter) {
                Ok(entry) => report.results.insert(entry),
                Err(reason) => {
                    tracing::warn!(
                        file = %file.path.display(),
                        "skipping scan: {}",
                        reason.diagnostic_line()
                    );
                    report.skipped.push(SkippedFile {
                        path: file.path.clone(),
                        reason,
                    });
                }
            }
        }
    }

    report
}

/// Writes one `{primary}_Peak.json` per batch, plus fit curves when asked.
///
/// Existing batch files are left alone unless `overwrite` is set.
pub fn write_batch_outputs(
    results: &BatchResults,
    results_dir: &Path,
    options: OutputOptions,
) -> FanoResult<OutputSummary> {
    fs::create_dir_all(results_dir).map_err(|source| {
        FanoError::io(format!(
            "failed to create results directory '{}': {}",
            results_dir.display(),
            source
        ))
    })?;

    let mut summary = OutputSummary::default();
    for (primary, group) in results.groups() {
        let path = batch_output_path(results_dir, primary);
        if path.exists() && !options.overwrite {
            tracing::info!(output = %path.display(), "batch output exists; leaving it untouched");
            summary.kept_existing.push(path);
            continue;
        }

        if let Err(reason) =
            write_batch_group(results_dir, primary, group, &path, options, &mut summary.written)
        {
            tracing::warn!(
                batch = %primary,
                output = %path.display(),
                "failed to write batch output: {}",
                reason.diagnostic_line()
            );
            summary.failed.push(SkippedFile { path, reason });
        }
    }

    Ok(summary)
}

fn write_batch_group(
    results_dir: &Path,
    primary: &str,
    group: &BTreeMap<String, ResultSlot>,
    path: &Path,
    options: OutputOptions,
    written: &mut Vec<PathBuf>,
) -> FanoResult<()> {
    write_json_artifact(path, group)?;
    written.push(path.to_path_buf());

    if !options.plot_files {
        return Ok(());
    }
    for (secondary, slot) in group {
        let numbered = slot.len() > 1;
        for (position, entry) in slot.entries().iter().enumerate() {
            let name = if numbered {
                format!("{primary}_{secondary}_{}_Peak.csv", position + 1)
            } else {
                format!("{primary}_{secondary}_Peak.csv")
            };
            let curve_path = results_dir.join(name);
            write_text_artifact(
                &curve_path,
                &fit_curve_artifact(&entry.region_wavelength, &entry.region_intensity, &entry.fit),
            )?;
            written.push(curve_path);
        }
    }
    Ok(())
}
