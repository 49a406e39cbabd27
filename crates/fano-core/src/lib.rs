//! Fano resonance extraction for batches of spectrometer scans.
//!
//! The pipeline parses sample metadata out of file names, normalizes each scan
//! against its matching background, fits a single Fano lineshape over a
//! caller-selected window and folds the result into a nested per-sample map.

pub mod common;
pub mod domain;
pub mod modules;
pub mod numerics;
