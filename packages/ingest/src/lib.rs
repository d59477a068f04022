#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ingestion of accident exports into an in-memory [`Dataset`].
//!
//! Reads a delimited-text source (optionally wrapped in a zip archive or a
//! gzip stream), restricts it to the configured columns, drops rows that
//! miss a required field, and derives time features for every kept row.
//! Structural failures abort the load; row-level data-quality problems
//! only null a field or drop the row.

pub mod categorical;
pub mod parsing;
pub mod reader;
pub mod registry;
pub mod schema;
pub mod source;

use road_safety_accident_models::Dataset;
use road_safety_ingest_models::{IngestStats, LoadConfig};

/// Errors that abort an ingestion run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The source path does not exist.
    #[error("Source not found: {path}")]
    SourceNotFound {
        /// Path that was requested.
        path: String,
    },

    /// I/O error opening or reading the source.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The archive wrapper could not be read.
    #[error("Malformed archive {path}: {source}")]
    Archive {
        /// Path of the archive.
        path: String,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },

    /// The requested entry is not in the archive.
    #[error("Entry {entry} not found in archive {path}")]
    ArchiveEntryNotFound {
        /// Path of the archive.
        path: String,
        /// Entry name (or pattern) that was looked up.
        entry: String,
    },

    /// The delimited text is malformed or the stream failed mid-read.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A declared, mandatory, or required column is not available.
    #[error("Column {column} is not available in the source")]
    MissingColumn {
        /// Column header that could not be resolved.
        column: String,
    },

    /// The load configuration itself is invalid.
    #[error("Invalid load configuration: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}

/// Anything that can turn a [`LoadConfig`] into a [`Dataset`].
///
/// The dataset cache depends on this trait rather than on the CSV reader
/// directly so callers can substitute their own source.
pub trait DatasetLoader: Send + Sync {
    /// Loads a complete dataset.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] on any structural failure. A partial dataset
    /// is never returned.
    fn load(&self, config: &LoadConfig) -> Result<Dataset, IngestError>;
}

/// Loads datasets from local CSV, zip, or gzip files.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvDatasetLoader;

impl DatasetLoader for CsvDatasetLoader {
    fn load(&self, config: &LoadConfig) -> Result<Dataset, IngestError> {
        load_dataset(config).map(|(dataset, _)| dataset)
    }
}

/// Reads the configured source and returns the dataset plus row-level
/// statistics.
///
/// # Errors
///
/// Returns [`IngestError`] if the source is missing, the archive is
/// malformed, a required column is absent, or the CSV cannot be parsed.
pub fn load_dataset(config: &LoadConfig) -> Result<(Dataset, IngestStats), IngestError> {
    let start = std::time::Instant::now();

    let result = source::read_source(&config.source, &config.params)?;

    log::info!(
        "Loaded {} records from {} in {:.2?}",
        result.0.len(),
        config.source.path.display(),
        start.elapsed()
    );

    Ok(result)
}
