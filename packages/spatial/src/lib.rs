#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map rendering support for filtered accident views.
//!
//! A map can only draw a bounded number of markers, so [`GeoSampler`]
//! picks a uniform random subset of the view without replacement. The map
//! is centered on the [`centroid`] of the whole view, not of the sample.

use geo::{Centroid as _, MultiPoint, Point};
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use road_safety_accident_models::{AccidentRecord, AccidentSeverity};
use road_safety_analytics::FilteredView;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Markers drawn when no cap is configured.
pub const DEFAULT_SAMPLE_CAP: usize = 1000;

/// A latitude/longitude pair in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapCenter {
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
}

/// Visual weight of a marker.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MarkerTone {
    /// Severity 3 or 4.
    High,
    /// Severity 1 or 2.
    Low,
}

impl From<AccidentSeverity> for MarkerTone {
    fn from(severity: AccidentSeverity) -> Self {
        if severity.is_high() {
            Self::High
        } else {
            Self::Low
        }
    }
}

/// One marker on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPoint {
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Severity of the accident.
    pub severity: AccidentSeverity,
    /// Marker tone derived from severity.
    pub marker: MarkerTone,
    /// Popup text, e.g. `"Dayton (Sev: 3)"`.
    pub label: String,
}

impl From<&AccidentRecord> for MapPoint {
    fn from(record: &AccidentRecord) -> Self {
        Self {
            latitude: record.start_lat,
            longitude: record.start_lng,
            severity: record.severity,
            marker: record.severity.into(),
            label: format!("{} (Sev: {})", record.locality, record.severity.value()),
        }
    }
}

/// Everything a map needs: where to center and which markers to draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSample {
    /// Center of the full view. `None` when the view is empty.
    pub center: Option<MapCenter>,
    /// Sampled markers.
    pub points: Vec<MapPoint>,
}

/// Mean latitude and longitude across every record in `view`.
///
/// Returns `None` for an empty view.
#[must_use]
pub fn centroid(view: &FilteredView<'_>) -> Option<MapCenter> {
    let points: MultiPoint<f64> = view
        .iter()
        .map(|r| Point::new(r.start_lng, r.start_lat))
        .collect::<Vec<_>>()
        .into();

    points.centroid().map(|point| MapCenter {
        latitude: point.y(),
        longitude: point.x(),
    })
}

/// Draws bounded, uniform random samples of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoSampler {
    cap: usize,
    seed: Option<u64>,
}

impl Default for GeoSampler {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_CAP)
    }
}

impl GeoSampler {
    /// An unseeded sampler drawing at most `cap` records.
    #[must_use]
    pub const fn new(cap: usize) -> Self {
        Self { cap, seed: None }
    }

    /// Makes every draw reproducible from `seed`.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Maximum sample size.
    #[must_use]
    pub const fn cap(&self) -> usize {
        self.cap
    }

    /// Configured seed, if any.
    #[must_use]
    pub const fn seed(&self) -> Option<u64> {
        self.seed
    }

    fn rng(&self) -> StdRng {
        self.seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64)
    }

    /// Picks `min(cap, view.len())` distinct records of `view`.
    ///
    /// Every record has the same chance of being picked. The order of the
    /// result carries no meaning.
    #[must_use]
    pub fn sample<'a>(&self, view: &FilteredView<'a>) -> Vec<&'a AccidentRecord> {
        let amount = self.cap.min(view.len());
        if amount == 0 {
            return Vec::new();
        }

        let mut rng = self.rng();
        rand::seq::index::sample(&mut rng, view.len(), amount)
            .into_iter()
            .filter_map(|position| view.get(position))
            .collect()
    }

    /// Samples `view` and pairs the markers with the view's centroid.
    #[must_use]
    pub fn map_sample(&self, view: &FilteredView<'_>) -> MapSample {
        let points: Vec<MapPoint> = self
            .sample(view)
            .into_iter()
            .map(MapPoint::from)
            .collect();

        log::debug!("Sampled {} of {} records for the map", points.len(), view.len());

        MapSample {
            center: centroid(view),
            points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use chrono::NaiveDate;
    use road_safety_accident_models::Dataset;
    use road_safety_analytics::apply;
    use road_safety_analytics_models::FilterCriteria;

    fn record(lat: f64, lng: f64, severity: u8, city: &str) -> AccidentRecord {
        AccidentRecord::new(
            AccidentSeverity::from_value(severity).unwrap(),
            None,
            lat,
            lng,
            city,
            "OH",
        )
    }

    fn dataset(n: usize) -> Dataset {
        #[allow(clippy::cast_precision_loss)]
        let records = (0..n)
            .map(|i| record(39.0 + i as f64 * 0.001, -84.0, 1, "Dayton"))
            .collect();
        Dataset::new(records, vec!["City".to_string()])
    }

    #[test]
    fn sample_size_is_bounded_by_cap_and_view() {
        let data = dataset(50);
        let view = FilteredView::all(&data);

        assert_eq!(GeoSampler::new(10).sample(&view).len(), 10);
        assert_eq!(GeoSampler::new(1000).sample(&view).len(), 50);
        assert_eq!(GeoSampler::default().cap(), DEFAULT_SAMPLE_CAP);
    }

    #[test]
    fn sample_draws_distinct_view_members() {
        let data = dataset(200);
        let view = FilteredView::all(&data);
        let sample = GeoSampler::new(64).sample(&view);

        let addresses: BTreeSet<*const AccidentRecord> =
            sample.iter().map(|r| std::ptr::from_ref(*r)).collect();
        assert_eq!(addresses.len(), 64);
        for record in &sample {
            assert!(view.iter().any(|r| std::ptr::eq(r, *record)));
        }
    }

    #[test]
    fn sample_only_draws_from_the_filtered_view() {
        let start = NaiveDate::from_ymd_opt(2020, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let timed = |city: &str, severity: u8| {
            AccidentRecord::new(
                AccidentSeverity::from_value(severity).unwrap(),
                Some(start),
                40.0,
                -81.0,
                city,
                "OH",
            )
        };
        let mut records: Vec<_> = (0..20).map(|_| timed("Erie", 1)).collect();
        records.extend((0..20).map(|_| timed("Akron", 4)));
        let data = Dataset::new(records, vec!["City".to_string()]);
        let view = apply(&data, &FilterCriteria::default().with_localities(["Akron"])).unwrap();

        let sample = GeoSampler::new(100).sample(&view);
        assert_eq!(sample.len(), 20);
        assert!(sample.iter().all(|r| &*r.locality == "Akron"));
    }

    #[test]
    fn empty_view_yields_empty_sample_and_no_center() {
        let data = dataset(0);
        let view = FilteredView::all(&data);
        let map = GeoSampler::default().map_sample(&view);
        assert!(map.points.is_empty());
        assert!(map.center.is_none());
    }

    #[test]
    fn seeded_samples_repeat() {
        let data = dataset(500);
        let view = FilteredView::all(&data);
        let sampler = GeoSampler::new(25).with_seed(7);

        let draw = || -> Vec<u64> {
            sampler
                .sample(&view)
                .iter()
                .map(|r| r.start_lat.to_bits())
                .collect()
        };
        assert_eq!(draw(), draw());
    }

    #[test]
    fn centroid_of_three_points() {
        let data = Dataset::new(
            vec![
                record(0.0, 0.0, 1, "A"),
                record(3.0, 6.0, 1, "B"),
                record(6.0, 3.0, 1, "C"),
            ],
            Vec::new(),
        );
        let center = centroid(&FilteredView::all(&data)).unwrap();
        assert!((center.latitude - 3.0).abs() < 1e-9);
        assert!((center.longitude - 3.0).abs() < 1e-9);
    }

    #[test]
    fn map_points_carry_tone_and_label() {
        let serious = MapPoint::from(&record(1.0, 2.0, 3, "Dayton"));
        assert_eq!(serious.marker, MarkerTone::High);
        assert_eq!(serious.label, "Dayton (Sev: 3)");
        assert!((serious.latitude - 1.0).abs() < f64::EPSILON);

        let moderate = MapPoint::from(&record(1.0, 2.0, 2, "Dayton"));
        assert_eq!(moderate.marker, MarkerTone::Low);
        assert_eq!(MarkerTone::High.to_string(), "HIGH");
    }
}
