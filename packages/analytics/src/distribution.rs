//! Per-bucket counts behind the dashboard charts.

use std::collections::BTreeMap;

use road_safety_accident_models::{AccidentSeverity, Weekday};
use road_safety_analytics_models::{
    CategoryCount, HourBucket, MAX_HOUR, SeverityCount, WeekdayCount,
};

use crate::filter::FilteredView;

/// Number of weather conditions returned by default.
pub const DEFAULT_TOP_WEATHER: usize = 10;

/// Counts occurrences of each value, listed in first-seen order.
pub(crate) fn tally<'a>(values: impl Iterator<Item = &'a str>) -> Vec<(&'a str, u64)> {
    let mut positions: BTreeMap<&str, usize> = BTreeMap::new();
    let mut counts: Vec<(&str, u64)> = Vec::new();
    for value in values {
        if let Some(&position) = positions.get(value) {
            counts[position].1 += 1;
        } else {
            positions.insert(value, counts.len());
            counts.push((value, 1));
        }
    }
    counts
}

/// Records per hour of day, one bucket for each hour 0-23. Records without
/// a start time are left out.
#[must_use]
pub fn hourly_histogram(view: &FilteredView<'_>) -> Vec<HourBucket> {
    let mut counts = [0u64; MAX_HOUR as usize + 1];
    for hour in view.iter().filter_map(|r| r.hour) {
        if let Some(count) = counts.get_mut(usize::from(hour)) {
            *count += 1;
        }
    }

    (0..=MAX_HOUR)
        .zip(counts)
        .map(|(hour, count)| HourBucket { hour, count })
        .collect()
}

/// Records per severity level, one bucket for each level 1-4.
#[must_use]
pub fn severity_distribution(view: &FilteredView<'_>) -> Vec<SeverityCount> {
    AccidentSeverity::all()
        .iter()
        .map(|&severity| SeverityCount {
            severity,
            count: view.iter().filter(|r| r.severity == severity).count() as u64,
        })
        .collect()
}

/// The `limit` most frequent weather conditions, most frequent first.
/// Equal counts keep first-seen order.
#[must_use]
pub fn top_weather(view: &FilteredView<'_>, limit: usize) -> Vec<CategoryCount> {
    let mut counts = tally(view.iter().filter_map(|r| r.weather_condition.as_deref()));
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(limit)
        .map(|(category, count)| CategoryCount {
            category: category.to_string(),
            count,
        })
        .collect()
}

/// Records per day of the week, Monday first. Records without a start time
/// are left out.
#[must_use]
pub fn weekday_distribution(view: &FilteredView<'_>) -> Vec<WeekdayCount> {
    Weekday::all()
        .iter()
        .map(|&weekday| WeekdayCount {
            weekday,
            count: view.iter().filter(|r| r.weekday == Some(weekday)).count() as u64,
        })
        .collect()
}
