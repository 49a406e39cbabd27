pub mod aggregate;
pub mod background;
pub mod fano;
pub mod identifier;
pub mod index;
pub mod normalize;
pub mod pipeline;
pub mod region;
pub mod serialization;
pub mod spectrum;

pub use aggregate::{
    BackgroundEntry, BackgroundSummary, BatchResults, NO_BACKGROUND, ResultSlot,
    SampleResultEntry,
};
pub use background::{
    BackgroundMatch, IntegrationTimes, reconcile_integration_times, resolve_background,
};
pub use fano::{FanoFitter, FanoGuess, FanoModel, MIN_FIT_POINTS, fano_value, fit_fano};
pub use identifier::{ParsedFileName, parse_file_name, parse_path};
pub use index::{FileIndex, IndexedFile, ScanBatches};
pub use normalize::{normalize_with_background, normalize_without_background};
pub use pipeline::{
    BatchReport, OutputOptions, OutputSummary, SkippedFile, batch_output_path, process_file,
    run_batch, write_batch_outputs,
};
pub use region::{FixedRegion, RegionRequest, RegionSelector, WavelengthWindow, nearest_index};
pub use spectrum::{Delimiter, parse_spectrum_source, read_spectrum, write_delimited};
