mod commands;
mod helpers;

use clap::Parser;
use fano_core::domain::{ErrorKind, FanoError};

const PROGRAM_NAME: &str = "fano-fit";

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let diagnostic = error.as_fano_error();
            eprintln!("{}", diagnostic.diagnostic_line());
            if let Some(summary_line) = diagnostic.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            diagnostic.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once(PROGRAM_NAME.to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            helpers::init_logging(cli.verbose);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "fano-fit",
    version,
    about = "Fano resonance fitting for batches of spectrometer scans"
)]
struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Fit every scan in the configured spectrum directory
    Batch(commands::BatchArgs),
    /// Fit a single scan file
    Fit(commands::FitArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Batch(args) => commands::run_batch_command(args),
        CliCommand::Fit(args) => commands::run_fit_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(FanoError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<FanoError> for CliError {
    fn from(error: FanoError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_fano_error(&self) -> FanoError {
        match self {
            Self::Usage(message) => FanoError::new(ErrorKind::Usage, message.trim_end()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => FanoError::io(format!("{error:#}")),
        }
    }
}
