//! Row reader: turns delimited text into cleaned [`AccidentRecord`]s.

use std::collections::BTreeSet;
use std::io::Read;

use road_safety_accident_models::{AccidentRecord, Dataset, Field};
use road_safety_ingest_models::{IngestStats, LoadParameters};

use crate::IngestError;
use crate::categorical::CategoryInterner;
use crate::parsing::{parse_coordinate, parse_severity, parse_start_time};
use crate::schema::ColumnLayout;

/// Why a row did not make it into the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowRejection {
    MissingRequired(Field),
    InvalidSeverity,
    InvalidEncoding(Field),
}

/// A kept record and how many of its optional cells were nulled because
/// they did not decode.
struct BuiltRow {
    record: AccidentRecord,
    undecodable: u64,
}

/// Reads up to `params.row_cap` rows from `source` and builds a dataset.
///
/// Rows missing a required field are dropped; unparsable start times are
/// kept with null time features. Cells are decoded as UTF-8 one field at a
/// time, and only for materialized fields: a bad required cell drops the
/// row, a bad optional cell is nulled. Structural problems (bad header,
/// missing column, unreadable stream) abort the whole read.
///
/// # Errors
///
/// Returns [`IngestError`] if the delimiter is not a single ASCII
/// character, the header cannot be resolved, or the stream is malformed.
pub fn read_records<R: Read>(
    source: R,
    params: &LoadParameters,
) -> Result<(Dataset, IngestStats), IngestError> {
    let delimiter = delimiter_byte(params.delimiter)?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(source);

    let layout = ColumnLayout::resolve(reader.headers()?.iter(), params)?;
    let required = params.effective_required_fields();

    let mut interner = CategoryInterner::new();
    let mut stats = IngestStats::default();
    let mut records = Vec::new();
    let mut row = csv::ByteRecord::new();

    while stats.rows_read < params.row_cap && reader.read_byte_record(&mut row)? {
        stats.rows_read += 1;

        match build_record(&row, &layout, &required, &mut interner) {
            Ok(BuiltRow {
                record,
                undecodable,
            }) => {
                if record.start_time.is_none() {
                    stats.unparsable_start_time += 1;
                }
                stats.undecodable_cells += undecodable;
                records.push(record);
            }
            Err(RowRejection::MissingRequired(field)) => {
                log::trace!("Dropping row {}: missing {field}", stats.rows_read);
                stats.dropped_missing_required += 1;
            }
            Err(RowRejection::InvalidSeverity) => {
                log::trace!("Dropping row {}: invalid severity", stats.rows_read);
                stats.dropped_invalid_severity += 1;
            }
            Err(RowRejection::InvalidEncoding(field)) => {
                log::trace!("Dropping row {}: {field} is not valid UTF-8", stats.rows_read);
                stats.dropped_invalid_encoding += 1;
            }
        }
    }

    stats.rows_kept = records.len() as u64;

    if stats.rows_read >= params.row_cap {
        log::info!("Reached row cap ({}), stopping CSV parse", params.row_cap);
    }
    log::info!(
        "Read {} rows: kept {}, dropped {} ({} missing required, {} invalid severity, {} invalid encoding), {} without a start time, {} undecodable cells nulled, {} distinct categories",
        stats.rows_read,
        stats.rows_kept,
        stats.rows_dropped(),
        stats.dropped_missing_required,
        stats.dropped_invalid_severity,
        stats.dropped_invalid_encoding,
        stats.unparsable_start_time,
        stats.undecodable_cells,
        interner.len(),
    );

    Ok((Dataset::new(records, layout.into_columns()), stats))
}

fn delimiter_byte(delimiter: char) -> Result<u8, IngestError> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| IngestError::Config {
            message: format!("delimiter {delimiter:?} is not a single ASCII character"),
        })
}

fn build_record(
    row: &csv::ByteRecord,
    layout: &ColumnLayout,
    required: &BTreeSet<Field>,
    interner: &mut CategoryInterner,
) -> Result<BuiltRow, RowRejection> {
    let strict = |field: Field| {
        layout
            .cell(row, field)
            .map_err(|_| RowRejection::InvalidEncoding(field))
    };

    for field in required {
        if strict(*field)?.is_none() {
            return Err(RowRejection::MissingRequired(*field));
        }
    }

    let severity = strict(Field::Severity)?
        .and_then(parse_severity)
        .ok_or(RowRejection::InvalidSeverity)?;
    let start_lat = strict(Field::StartLat)?
        .and_then(parse_coordinate)
        .ok_or(RowRejection::MissingRequired(Field::StartLat))?;
    let start_lng = strict(Field::StartLng)?
        .and_then(parse_coordinate)
        .ok_or(RowRejection::MissingRequired(Field::StartLng))?;
    let locality = strict(Field::City)?.ok_or(RowRejection::MissingRequired(Field::City))?;
    let region = strict(Field::State)?.ok_or(RowRejection::MissingRequired(Field::State))?;

    let mut undecodable = 0;
    let mut lenient = |field: Field| {
        layout.cell(row, field).unwrap_or_else(|_| {
            undecodable += 1;
            None
        })
    };

    let start_time = lenient(Field::StartTime).and_then(parse_start_time);
    let street = lenient(Field::Street).map(str::to_string);
    let postal_code = lenient(Field::Zipcode).map(str::to_string);
    let weather = lenient(Field::WeatherCondition);

    let record = AccidentRecord::new(
        severity,
        start_time,
        start_lat,
        start_lng,
        interner.intern(locality),
        interner.intern(region),
    )
    .with_street(street)
    .with_postal_code(postal_code)
    .with_weather_condition(weather.map(|w| interner.intern(w)));

    Ok(BuiltRow {
        record,
        undecodable,
    })
}
