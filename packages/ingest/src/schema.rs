//! Column resolution: maps the source header onto record fields.

use std::collections::BTreeMap;

use road_safety_accident_models::Field;
use road_safety_ingest_models::LoadParameters;

use crate::IngestError;
use crate::parsing::non_empty;

/// Columns that must be materialized for any load, on top of the
/// required-fields policy.
const MANDATORY_COLUMNS: &[Field] = &[Field::Severity, Field::StartTime];

/// The materialized column set and where each known field sits in a row.
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    columns: Vec<String>,
    positions: BTreeMap<Field, usize>,
}

impl ColumnLayout {
    /// Resolves the header row against the load parameters.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::MissingColumn`] if a declared column is not in
    /// the header, or if a mandatory or required field is not materialized.
    pub fn resolve<'h>(
        headers: impl IntoIterator<Item = &'h str>,
        params: &LoadParameters,
    ) -> Result<Self, IngestError> {
        let headers: Vec<&str> = headers.into_iter().map(str::trim).collect();

        if let Some(declared) = &params.declared_columns
            && let Some(missing) = declared.iter().find(|d| !headers.contains(&d.as_str()))
        {
            return Err(IngestError::MissingColumn {
                column: missing.clone(),
            });
        }

        let mut columns = Vec::new();
        let mut positions = BTreeMap::new();

        for (index, header) in headers.iter().enumerate() {
            let declared = params
                .declared_columns
                .as_ref()
                .is_none_or(|d| d.iter().any(|c| c == header));
            let excluded = params.excluded_columns.iter().any(|c| c == header);
            if !declared || excluded || columns.iter().any(|c| c == header) {
                continue;
            }

            columns.push((*header).to_string());
            if let Ok(field) = header.parse::<Field>() {
                positions.insert(field, index);
            }
        }

        let layout = Self { columns, positions };

        for field in MANDATORY_COLUMNS
            .iter()
            .copied()
            .chain(params.effective_required_fields())
        {
            if layout.position(field).is_none() {
                return Err(IngestError::MissingColumn {
                    column: field.column().to_string(),
                });
            }
        }

        log::debug!(
            "Materializing {} of {} columns: {}",
            layout.columns.len(),
            headers.len(),
            layout.columns.join(", ")
        );

        Ok(layout)
    }

    /// Materialized column names in header order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Consumes the layout, returning the materialized column names.
    #[must_use]
    pub fn into_columns(self) -> Vec<String> {
        self.columns
    }

    /// Index of `field` within a row, if its column was materialized.
    #[must_use]
    pub fn position(&self, field: Field) -> Option<usize> {
        self.positions.get(&field).copied()
    }

    /// The non-blank, trimmed cell for `field` in `row`.
    ///
    /// Only this cell is decoded, so bad bytes elsewhere in the row never
    /// surface here.
    ///
    /// # Errors
    ///
    /// Returns the decode error if the cell is not valid UTF-8.
    pub fn cell<'r>(
        &self,
        row: &'r csv::ByteRecord,
        field: Field,
    ) -> Result<Option<&'r str>, std::str::Utf8Error> {
        let Some(bytes) = self.position(field).and_then(|index| row.get(index)) else {
            return Ok(None);
        };
        std::str::from_utf8(bytes).map(|text| non_empty(Some(text)))
    }
}
