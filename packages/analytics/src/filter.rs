//! Conjunctive record filtering.

use road_safety_accident_models::{AccidentRecord, Dataset};
use road_safety_analytics_models::FilterCriteria;

use crate::FilterError;

/// The records of a [`Dataset`] that matched a request, in source order.
///
/// Holds positions into the dataset rather than copies, so building a view
/// never allocates records and every record it yields belongs to the
/// dataset.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// A view of every record in `dataset`.
    #[must_use]
    pub fn all(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            indices: (0..dataset.len()).collect(),
        }
    }

    /// The dataset this view borrows from.
    #[must_use]
    pub const fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// Positions of the matching records within the dataset.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of matching records.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether nothing matched.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Returns the `position`-th matching record.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&'a AccidentRecord> {
        self.indices
            .get(position)
            .and_then(|&index| self.dataset.get(index))
    }

    /// Iterates the matching records in source order.
    pub fn iter(&self) -> impl Iterator<Item = &'a AccidentRecord> + '_ {
        let records = self.dataset.records();
        self.indices.iter().map(move |&index| &records[index])
    }

    /// The first `n` matching records.
    pub fn head(&self, n: usize) -> impl Iterator<Item = &'a AccidentRecord> + '_ {
        self.iter().take(n)
    }
}

/// Checks a request before any records are scanned.
///
/// # Errors
///
/// Returns [`FilterError::InvalidHourRange`] if the hour window is reversed
/// or out of bounds.
pub const fn validate(criteria: &FilterCriteria) -> Result<(), FilterError> {
    let range = criteria.hour_range;
    if range.is_valid() {
        Ok(())
    } else {
        Err(FilterError::InvalidHourRange {
            lower: range.lower,
            upper: range.upper,
        })
    }
}

/// Whether `record` satisfies every restriction in `criteria`.
#[must_use]
pub fn matches(record: &AccidentRecord, criteria: &FilterCriteria) -> bool {
    criteria.region.matches(&record.region)
        && (criteria.localities.is_empty() || criteria.localities.contains(&*record.locality))
        && criteria.hour_range.contains(record.hour)
        && (criteria.weather_conditions.is_empty()
            || record
                .weather_condition
                .as_deref()
                .is_some_and(|weather| criteria.weather_conditions.contains(weather)))
}

/// Returns the records of `dataset` matching `criteria`.
///
/// An empty view is a normal result.
///
/// # Errors
///
/// Returns [`FilterError`] if `criteria` is invalid. Nothing is scanned in
/// that case.
pub fn apply<'a>(
    dataset: &'a Dataset,
    criteria: &FilterCriteria,
) -> Result<FilteredView<'a>, FilterError> {
    validate(criteria)?;

    let indices: Vec<usize> = dataset
        .records()
        .iter()
        .enumerate()
        .filter(|(_, record)| matches(record, criteria))
        .map(|(index, _)| index)
        .collect();

    log::debug!(
        "Filter matched {} of {} records",
        indices.len(),
        dataset.len()
    );

    Ok(FilteredView { dataset, indices })
}
