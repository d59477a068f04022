#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ingestion configuration, load profile, and result types.
//!
//! A [`LoadConfig`] pairs a [`SourceIdentity`] (where the rows live) with
//! [`LoadParameters`] (how to read and clean them). Together they form the
//! key the dataset cache memoizes on, so every type here is `Ord` and
//! `Hash`.

use std::collections::BTreeSet;
use std::path::PathBuf;

use road_safety_accident_models::Field;
use serde::{Deserialize, Serialize};

/// Default field delimiter.
pub const DEFAULT_DELIMITER: char = ',';

/// Compression wrapper around the delimited-text source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum ArchiveFormat {
    /// A zip archive containing the CSV as one of its entries.
    Zip {
        /// Entry name inside the archive. When absent, the first `.csv`
        /// entry is used.
        #[serde(default)]
        entry: Option<String>,
    },
    /// A single gzip-compressed stream.
    Gzip,
}

/// Where the raw rows come from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceIdentity {
    /// Path to the CSV file or to the archive wrapping it.
    pub path: PathBuf,
    /// Compression wrapper, if any.
    #[serde(default)]
    pub archive: Option<ArchiveFormat>,
}

impl SourceIdentity {
    /// A plain, uncompressed CSV file.
    #[must_use]
    pub fn csv(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            archive: None,
        }
    }

    /// A CSV inside a zip archive.
    #[must_use]
    pub fn zip(path: impl Into<PathBuf>, entry: Option<String>) -> Self {
        Self {
            path: path.into(),
            archive: Some(ArchiveFormat::Zip { entry }),
        }
    }

    /// A gzip-compressed CSV.
    #[must_use]
    pub fn gzip(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            archive: Some(ArchiveFormat::Gzip),
        }
    }

    /// Picks the wrapper from the file extension: `.zip` is read as an
    /// archive (first `.csv` entry), `.gz` as a gzip stream, anything else
    /// as plain CSV.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("zip") => Self::zip(path, None),
            Some("gz") => Self::gzip(path),
            _ => Self::csv(path),
        }
    }
}

/// How rows are read and which ones survive cleaning.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LoadParameters {
    /// Maximum number of data rows read from the source, in source order.
    pub row_cap: u64,
    /// Allow-list of columns to materialize. `None` reads every column.
    #[serde(default)]
    pub declared_columns: Option<Vec<String>>,
    /// Columns removed from the materialized set.
    #[serde(default)]
    pub excluded_columns: Vec<String>,
    /// Fields that must be non-null for a row to be kept, in addition to
    /// [`Field::INVARIANT`].
    #[serde(default)]
    pub required_fields: BTreeSet<Field>,
    /// Field delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

const fn default_delimiter() -> char {
    DEFAULT_DELIMITER
}

impl LoadParameters {
    /// Parameters that read up to `row_cap` rows of every column and only
    /// enforce the invariant fields.
    #[must_use]
    pub const fn new(row_cap: u64) -> Self {
        Self {
            row_cap,
            declared_columns: None,
            excluded_columns: Vec::new(),
            required_fields: BTreeSet::new(),
            delimiter: DEFAULT_DELIMITER,
        }
    }

    /// Restricts the materialized columns to `columns`.
    #[must_use]
    pub fn with_declared_columns<S: Into<String>>(
        mut self,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.declared_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Drops `columns` from the materialized set.
    #[must_use]
    pub fn with_excluded_columns<S: Into<String>>(
        mut self,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.excluded_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds fields to the required-fields policy.
    #[must_use]
    pub fn with_required_fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.required_fields.extend(fields);
        self
    }

    /// The complete set of fields a row must carry: the configured policy
    /// plus [`Field::INVARIANT`].
    #[must_use]
    pub fn effective_required_fields(&self) -> BTreeSet<Field> {
        self.required_fields
            .iter()
            .chain(Field::INVARIANT)
            .copied()
            .collect()
    }
}

/// Complete description of one ingestion: the source plus how to read it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Where the rows come from.
    pub source: SourceIdentity,
    /// How to read and clean them.
    pub params: LoadParameters,
}

/// A named, embedded load configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadProfile {
    /// Unique identifier (e.g., `"full_dashboard"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Free-form notes about where this configuration comes from.
    #[serde(default)]
    pub description: Option<String>,
    /// Default source for this profile.
    pub source: SourceIdentity,
    /// Read and cleaning parameters.
    pub params: LoadParameters,
}

impl LoadProfile {
    /// Builds the [`LoadConfig`] for this profile.
    #[must_use]
    pub fn config(&self) -> LoadConfig {
        LoadConfig {
            source: self.source.clone(),
            params: self.params.clone(),
        }
    }
}

/// Row-level bookkeeping from one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    /// Data rows read from the source (bounded by the row cap).
    pub rows_read: u64,
    /// Rows that made it into the dataset.
    pub rows_kept: u64,
    /// Rows dropped because a required field was missing or invalid.
    pub dropped_missing_required: u64,
    /// Rows dropped because severity was missing or outside 1-4.
    pub dropped_invalid_severity: u64,
    /// Rows dropped because a required cell was not valid UTF-8.
    pub dropped_invalid_encoding: u64,
    /// Optional cells nulled because they were not valid UTF-8.
    pub undecodable_cells: u64,
    /// Kept rows whose start time could not be parsed.
    pub unparsable_start_time: u64,
}

impl IngestStats {
    /// Total rows dropped for any reason.
    #[must_use]
    pub const fn rows_dropped(&self) -> u64 {
        self.dropped_missing_required
            + self.dropped_invalid_severity
            + self.dropped_invalid_encoding
    }
}
