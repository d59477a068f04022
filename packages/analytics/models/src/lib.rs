#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request and result types for accident analytics.
//!
//! [`FilterCriteria`] describes which records a request is about. The
//! remaining types are what the aggregations hand back: a [`Summary`] of
//! the filtered view and the per-bucket counts behind each chart.

use std::collections::BTreeSet;

use road_safety_accident_models::{AccidentSeverity, Weekday};
use serde::{Deserialize, Serialize};

/// Highest hour of day a record can carry.
pub const MAX_HOUR: u8 = 23;

/// Region restriction of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "value")]
pub enum RegionSelection {
    /// No region restriction.
    #[default]
    All,
    /// Only records whose region equals this value.
    Only(String),
}

impl RegionSelection {
    /// Builds a selection from a UI value where `"All"` (or nothing) means
    /// no restriction.
    #[must_use]
    pub fn from_option(value: Option<&str>) -> Self {
        match value {
            None | Some("All") => Self::All,
            Some(region) => Self::Only(region.to_string()),
        }
    }

    /// Whether `region` passes this selection.
    #[must_use]
    pub fn matches(&self, region: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(selected) => selected == region,
        }
    }
}

/// Inclusive hour-of-day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourRange {
    /// First hour included.
    pub lower: u8,
    /// Last hour included.
    pub upper: u8,
}

impl HourRange {
    /// The whole day, `0..=23`.
    pub const FULL_DAY: Self = Self {
        lower: 0,
        upper: MAX_HOUR,
    };

    /// Creates a range without validating it.
    #[must_use]
    pub const fn new(lower: u8, upper: u8) -> Self {
        Self { lower, upper }
    }

    /// Whether both bounds are within `0..=23` and `lower <= upper`.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.lower <= self.upper && self.upper <= MAX_HOUR
    }

    /// Whether `hour` falls inside the window. A missing hour never does.
    #[must_use]
    pub fn contains(self, hour: Option<u8>) -> bool {
        hour.is_some_and(|h| (self.lower..=self.upper).contains(&h))
    }
}

impl Default for HourRange {
    fn default() -> Self {
        Self::FULL_DAY
    }
}

/// Which records a request covers. All restrictions are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    /// Region restriction.
    #[serde(default)]
    pub region: RegionSelection,
    /// Allowed localities. Empty means no restriction.
    #[serde(default)]
    pub localities: BTreeSet<String>,
    /// Allowed hours of day.
    #[serde(default)]
    pub hour_range: HourRange,
    /// Allowed weather conditions. Empty means no restriction.
    #[serde(default)]
    pub weather_conditions: BTreeSet<String>,
}

impl FilterCriteria {
    /// Restricts to a single region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = RegionSelection::Only(region.into());
        self
    }

    /// Restricts to the given localities.
    #[must_use]
    pub fn with_localities<S: Into<String>>(
        mut self,
        localities: impl IntoIterator<Item = S>,
    ) -> Self {
        self.localities = localities.into_iter().map(Into::into).collect();
        self
    }

    /// Restricts to an hour window.
    #[must_use]
    pub const fn with_hour_range(mut self, lower: u8, upper: u8) -> Self {
        self.hour_range = HourRange::new(lower, upper);
        self
    }

    /// Restricts to the given weather conditions.
    #[must_use]
    pub fn with_weather_conditions<S: Into<String>>(
        mut self,
        conditions: impl IntoIterator<Item = S>,
    ) -> Self {
        self.weather_conditions = conditions.into_iter().map(Into::into).collect();
        self
    }
}

/// Headline metrics of a non-empty view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Number of records in the view.
    pub count: u64,
    /// Most frequent locality.
    pub modal_locality: String,
    /// Mean severity, rounded to two decimal places.
    pub mean_severity: f64,
    /// Most frequent weather condition. Absent when the column was not
    /// loaded or every record in the view lacks it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modal_weather: Option<String>,
}

/// Result of summarizing a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum Summary {
    /// The view matched no records.
    Empty,
    /// The view matched at least one record.
    Metrics(Metrics),
}

impl Summary {
    /// Returns the metrics, if the view was non-empty.
    #[must_use]
    pub const fn metrics(&self) -> Option<&Metrics> {
        match self {
            Self::Empty => None,
            Self::Metrics(metrics) => Some(metrics),
        }
    }

    /// Whether the view was empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Count of records sharing one categorical value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    /// Category value.
    pub category: String,
    /// Number of records.
    pub count: u64,
}

/// Records starting within one hour of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourBucket {
    /// Hour of day (0-23).
    pub hour: u8,
    /// Number of records.
    pub count: u64,
}

/// Records at one severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityCount {
    /// Severity level.
    pub severity: AccidentSeverity,
    /// Number of records.
    pub count: u64,
}

/// Records starting on one day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayCount {
    /// Day of the week.
    pub weekday: Weekday,
    /// Number of records.
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hour_range_excludes_missing_hours() {
        assert!(HourRange::FULL_DAY.contains(Some(0)));
        assert!(HourRange::FULL_DAY.contains(Some(23)));
        assert!(!HourRange::FULL_DAY.contains(None));
        assert!(!HourRange::new(8, 10).contains(Some(11)));
    }

    #[test]
    fn hour_range_validation() {
        assert!(HourRange::new(5, 5).is_valid());
        assert!(!HourRange::new(6, 5).is_valid());
        assert!(!HourRange::new(0, 24).is_valid());
    }

    #[test]
    fn region_selection_from_ui_value() {
        assert_eq!(RegionSelection::from_option(Some("All")), RegionSelection::All);
        assert_eq!(RegionSelection::from_option(None), RegionSelection::All);
        let ny = RegionSelection::from_option(Some("NY"));
        assert!(ny.matches("NY"));
        assert!(!ny.matches("CA"));
    }

    #[test]
    fn criteria_deserialize_with_defaults() {
        let criteria: FilterCriteria = serde_json::from_str("{}").unwrap();
        assert_eq!(criteria, FilterCriteria::default());
        assert_eq!(criteria.hour_range, HourRange::FULL_DAY);
    }

    #[test]
    fn empty_summary_serializes_as_status() {
        let json = serde_json::to_value(Summary::Empty).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "empty" }));
    }

    #[test]
    fn metrics_omit_absent_weather() {
        let summary = Summary::Metrics(Metrics {
            count: 3,
            modal_locality: "Los Angeles".to_string(),
            mean_severity: 2.33,
            modal_weather: None,
        });
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["status"], "metrics");
        assert_eq!(json["modalLocality"], "Los Angeles");
        assert!(json.get("modalWeather").is_none());
    }
}
