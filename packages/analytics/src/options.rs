//! Selectable values for each filter control.

use std::collections::BTreeSet;

use road_safety_accident_models::{Dataset, Field};
use road_safety_analytics_models::RegionSelection;

/// Every distinct region in the dataset, sorted.
#[must_use]
pub fn region_options(dataset: &Dataset) -> Vec<String> {
    sorted_distinct(dataset.records().iter().map(|r| &*r.region))
}

/// Localities offered once `region` is selected, sorted.
///
/// Only localities observed in the selected region are offered. Selecting
/// every region offers none, leaving the locality control unrestricted.
#[must_use]
pub fn locality_options(dataset: &Dataset, region: &RegionSelection) -> Vec<String> {
    match region {
        RegionSelection::All => Vec::new(),
        RegionSelection::Only(selected) => sorted_distinct(
            dataset
                .records()
                .iter()
                .filter(|r| &*r.region == selected.as_str())
                .map(|r| &*r.locality),
        ),
    }
}

/// Distinct non-null weather conditions in the order they first appear.
///
/// Empty when the weather column was not loaded.
#[must_use]
pub fn weather_options(dataset: &Dataset) -> Vec<String> {
    if !dataset.has_field(Field::WeatherCondition) {
        return Vec::new();
    }

    let mut seen = BTreeSet::new();
    dataset
        .records()
        .iter()
        .filter_map(|r| r.weather_condition.as_deref())
        .filter(|weather| seen.insert(*weather))
        .map(str::to_string)
        .collect()
}

fn sorted_distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
