//! Opens a [`SourceIdentity`] and streams it through the row reader.
//!
//! Plain files and gzip streams are read directly. Zip archives are opened
//! and a single CSV entry is streamed out without extracting to disk.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use flate2::read::GzDecoder;
use road_safety_accident_models::Dataset;
use road_safety_ingest_models::{ArchiveFormat, IngestStats, LoadParameters, SourceIdentity};

use crate::IngestError;
use crate::reader::read_records;

/// Reads the source and builds a dataset.
///
/// # Errors
///
/// Returns [`IngestError::SourceNotFound`] if the path does not exist, or
/// another [`IngestError`] if the archive or the CSV inside it cannot be
/// read.
pub fn read_source(
    source: &SourceIdentity,
    params: &LoadParameters,
) -> Result<(Dataset, IngestStats), IngestError> {
    let file = open_file(&source.path)?;

    match &source.archive {
        None => {
            log::info!("Reading CSV {}", source.path.display());
            read_records(BufReader::new(file), params)
        }
        Some(ArchiveFormat::Gzip) => {
            log::info!("Reading gzip-compressed CSV {}", source.path.display());
            read_records(GzDecoder::new(BufReader::new(file)), params)
        }
        Some(ArchiveFormat::Zip { entry }) => {
            read_zip_entry(file, &source.path, entry.as_deref(), params)
        }
    }
}

fn open_file(path: &Path) -> Result<File, IngestError> {
    File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::SourceNotFound {
                path: path.display().to_string(),
            }
        } else {
            IngestError::Io {
                path: path.display().to_string(),
                source: e,
            }
        }
    })
}

fn read_zip_entry(
    file: File,
    path: &Path,
    entry: Option<&str>,
    params: &LoadParameters,
) -> Result<(Dataset, IngestStats), IngestError> {
    let mut archive =
        zip::ZipArchive::new(BufReader::new(file)).map_err(|e| IngestError::Archive {
            path: path.display().to_string(),
            source: e,
        })?;

    let name = match entry {
        Some(name) => name.to_string(),
        None => archive
            .file_names()
            .find(|n| n.to_ascii_lowercase().ends_with(".csv"))
            .map(ToOwned::to_owned)
            .ok_or_else(|| IngestError::ArchiveEntryNotFound {
                path: path.display().to_string(),
                entry: "*.csv".to_string(),
            })?,
    };

    let zip_entry = archive.by_name(&name).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => IngestError::ArchiveEntryNotFound {
            path: path.display().to_string(),
            entry: name.clone(),
        },
        other => IngestError::Archive {
            path: path.display().to_string(),
            source: other,
        },
    })?;

    log::info!("Reading {name} from zip archive {}", path.display());

    read_records(zip_entry, params)
}
