use super::CliError;
use super::helpers::{PromptRegionSelector, render_batch_summary, render_fit_summary, window_from_bounds};
use fano_core::common::{DEFAULT_CONFIG_FILE_NAME, load_config};
use fano_core::domain::FileRole;
use fano_core::modules::serialization::write_json_artifact;
use fano_core::modules::{
    FanoFitter, FileIndex, IndexedFile, OutputOptions, parse_path, process_file, run_batch,
    write_batch_outputs,
};
use std::io;
use std::path::PathBuf;

#[derive(clap::Args)]
pub(super) struct BatchArgs {
    /// Configuration document naming the spectrum, background and results directories
    #[arg(long, default_value = DEFAULT_CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Fit window as two wavelengths; prompts per file when omitted
    #[arg(
        long,
        num_args = 2,
        value_names = ["LO", "HI"],
        allow_negative_numbers = true
    )]
    window: Option<Vec<f64>>,

    /// Replace existing `{batch}_Peak.json` outputs
    #[arg(long)]
    overwrite: bool,

    /// Results directory (overrides the configuration document)
    #[arg(long)]
    results: Option<PathBuf>,

    /// Write fit-curve CSV files next to the JSON output
    #[arg(long)]
    plot: bool,
}

#[derive(clap::Args)]
pub(super) struct FitArgs {
    /// Scan file to fit
    scan: PathBuf,

    /// Background file sharing the scan's sample, grating and polarization
    #[arg(long)]
    background: Option<PathBuf>,

    /// Fit window as two wavelengths
    #[arg(
        long,
        num_args = 2,
        required = true,
        value_names = ["LO", "HI"],
        allow_negative_numbers = true
    )]
    window: Vec<f64>,

    /// Write the result entry as JSON instead of printing a summary
    #[arg(long)]
    json: Option<PathBuf>,
}

pub(super) fn run_batch_command(args: BatchArgs) -> Result<i32, CliError> {
    let mut config = load_config(&args.config)?;
    if let Some(results) = args.results {
        config.results_dir = results;
    }

    let index = FileIndex::from_directories(
        &config.spectrum_dir,
        config.background_dir.as_deref(),
        &config.file_pattern,
    )?;
    tracing::info!(
        scans = index.scans().count(),
        backgrounds = index.backgrounds().count(),
        "indexed input files"
    );

    let fitter = FanoFitter::default();
    let report = match args.window {
        Some(bounds) => run_batch(&index, &mut window_from_bounds(&bounds)?, &fitter),
        None => {
            let stdin = io::stdin();
            let mut prompt = PromptRegionSelector::new(stdin.lock(), io::stderr());
            run_batch(&index, &mut prompt, &fitter)
        }
    };

    let outputs = write_batch_outputs(
        &report.results,
        &config.results_dir,
        OutputOptions {
            overwrite: args.overwrite,
            plot_files: config.plot_files || args.plot,
        },
    )?;

    print!("{}", render_batch_summary(&report, &outputs));
    Ok(outputs
        .failed
        .first()
        .map_or(0, |failed| failed.reason.exit_code()))
}

pub(super) fn run_fit_command(args: FitArgs) -> Result<i32, CliError> {
    let mut files = vec![IndexedFile {
        path: args.scan.clone(),
        role: FileRole::Scan,
    }];

    if let Some(background) = args.background {
        let scan_name = parse_path(&args.scan)?;
        let background_name = parse_path(&background)?;
        if !background_name.shares_sample_with(&scan_name) {
            return Err(CliError::Usage(format!(
                "background '{}' does not match scan '{}' on sample, grating and polarization",
                background.display(),
                args.scan.display()
            )));
        }
        files.push(IndexedFile {
            path: background,
            role: FileRole::Background,
        });
    }

    let index = FileIndex::from_files(files);
    let scan = index
        .scans()
        .next()
        .ok_or_else(|| CliError::Usage("no scan file given".to_string()))?;

    let mut window = window_from_bounds(&args.window)?;
    let entry = process_file(scan, &index, &mut window, &FanoFitter::default())?;

    match args.json {
        Some(path) => {
            write_json_artifact(&path, &entry)?;
            println!("Wrote {}", path.display());
        }
        None => print!("{}", render_fit_summary(&entry)),
    }
    Ok(0)
}
