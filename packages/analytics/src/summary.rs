//! Headline metrics of a filtered view.

use road_safety_accident_models::Field;
use road_safety_analytics_models::{Metrics, Summary};

use crate::distribution::tally;
use crate::filter::FilteredView;

/// Summarizes `view`, or reports [`Summary::Empty`] when it has no records.
///
/// Modal values break ties in favor of the value encountered first in
/// source order, so the same view always produces the same summary.
#[must_use]
pub fn summarize(view: &FilteredView<'_>) -> Summary {
    let Some(modal_locality) = modal(view.iter().map(|r| &*r.locality)) else {
        return Summary::Empty;
    };

    let modal_weather = if view.dataset().has_field(Field::WeatherCondition) {
        modal(view.iter().filter_map(|r| r.weather_condition.as_deref()))
    } else {
        None
    };

    Summary::Metrics(Metrics {
        count: view.len() as u64,
        modal_locality,
        mean_severity: mean_severity(view),
        modal_weather,
    })
}

/// Most frequent value, first-encountered on ties. `None` for no values.
fn modal<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    let counts = tally(values);
    let mut best: Option<(&str, u64)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.to_string())
}

/// Mean severity rounded to two decimals. Only called on non-empty views.
#[allow(clippy::cast_precision_loss)]
fn mean_severity(view: &FilteredView<'_>) -> f64 {
    let total: u64 = view.iter().map(|r| u64::from(r.severity.value())).sum();
    let mean = total as f64 / view.len() as f64;
    (mean * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::apply;
    use crate::test_support::{dataset, record};
    use road_safety_analytics_models::FilterCriteria;

    fn metrics(summary: &Summary) -> &Metrics {
        summary.metrics().expect("expected metrics")
    }

    #[test]
    fn region_scenario_counts_and_averages() {
        let data = dataset(
            vec![
                record("CA", "Los Angeles", 1, Some(1), None),
                record("CA", "San Diego", 2, Some(1), None),
                record("NY", "Buffalo", 2, Some(1), None),
                record("CA", "Los Angeles", 3, Some(1), None),
                record("TX", "Austin", 4, Some(1), None),
            ],
            false,
        );
        let view = apply(&data, &FilterCriteria::default().with_region("CA")).unwrap();
        let summary = summarize(&view);
        let metrics = metrics(&summary);
        assert_eq!(metrics.count, 3);
        assert!((metrics.mean_severity - 2.0).abs() < 1e-9);
        assert_eq!(metrics.modal_locality, "Los Angeles");
        assert_eq!(metrics.modal_weather, None);
    }

    #[test]
    fn mean_is_rounded_to_two_decimals() {
        let data = dataset(
            vec![
                record("CA", "Fresno", 2, Some(1), None),
                record("CA", "Fresno", 2, Some(1), None),
                record("CA", "Fresno", 3, Some(1), None),
            ],
            false,
        );
        let summary = summarize(&FilteredView::all(&data));
        let metrics = metrics(&summary);
        assert_eq!(metrics.count, 3);
        assert!((metrics.mean_severity - 2.33).abs() < 1e-9);
    }

    #[test]
    fn empty_view_is_signaled() {
        let data = dataset(vec![record("CA", "Fresno", 2, Some(1), None)], true);
        let view = apply(&data, &FilterCriteria::default().with_region("NY")).unwrap();
        assert_eq!(summarize(&view), Summary::Empty);
    }

    #[test]
    fn ties_go_to_the_first_encountered_value() {
        let data = dataset(
            vec![
                record("CA", "Oakland", 1, Some(1), Some("Rain")),
                record("CA", "Berkeley", 1, Some(1), Some("Clear")),
                record("CA", "Berkeley", 1, Some(1), Some("Clear")),
                record("CA", "Oakland", 1, Some(1), Some("Rain")),
            ],
            true,
        );
        let summary = summarize(&FilteredView::all(&data));
        let metrics = metrics(&summary);
        assert_eq!(metrics.modal_locality, "Oakland");
        assert_eq!(metrics.modal_weather.as_deref(), Some("Rain"));
    }

    #[test]
    fn modal_weather_ignores_missing_values() {
        let data = dataset(
            vec![
                record("CA", "Fresno", 1, Some(1), None),
                record("CA", "Fresno", 1, Some(1), None),
                record("CA", "Fresno", 1, Some(1), Some("Fog")),
            ],
            true,
        );
        let summary = summarize(&FilteredView::all(&data));
        assert_eq!(metrics(&summary).modal_weather.as_deref(), Some("Fog"));
    }

    #[test]
    fn modal_weather_absent_when_every_value_is_missing() {
        let data = dataset(vec![record("CA", "Fresno", 1, Some(1), None)], true);
        let summary = summarize(&FilteredView::all(&data));
        assert_eq!(metrics(&summary).modal_weather, None);
    }

    #[test]
    fn modal_weather_absent_when_column_not_loaded() {
        let data = dataset(vec![record("CA", "Fresno", 1, Some(1), Some("Fog"))], false);
        let summary = summarize(&FilteredView::all(&data));
        assert_eq!(metrics(&summary).modal_weather, None);
    }

    #[test]
    fn summary_is_deterministic() {
        let data = dataset(
            vec![
                record("CA", "Oakland", 1, Some(1), Some("Rain")),
                record("CA", "Berkeley", 4, Some(2), Some("Clear")),
            ],
            true,
        );
        let view = FilteredView::all(&data);
        assert_eq!(summarize(&view), summarize(&view));
    }
}
