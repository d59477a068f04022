#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request-level facade over the accident analytics pipeline.
//!
//! A [`Dashboard`] owns the dataset cache and the active load
//! configuration. Each [`Dashboard::query`] resolves the cached dataset,
//! filters it, and assembles everything a page needs in one
//! [`DashboardResponse`]: a preview, headline metrics, the map sample, and
//! the chart distributions. Failures only end the current request.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use road_safety_accident_models::{AccidentRecord, Dataset, Weekday};
use road_safety_analytics::distribution::{
    DEFAULT_TOP_WEATHER, hourly_histogram, severity_distribution, top_weather,
    weekday_distribution,
};
use road_safety_analytics::{FilterError, options, summarize};
use road_safety_analytics_models::{
    CategoryCount, FilterCriteria, HourBucket, RegionSelection, SeverityCount, Summary,
    WeekdayCount,
};
use road_safety_cache::DatasetCache;
use road_safety_ingest::{CsvDatasetLoader, DatasetLoader, IngestError};
use road_safety_ingest_models::{ArchiveFormat, LoadConfig, LoadProfile, SourceIdentity};
use road_safety_spatial::{GeoSampler, MapSample};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rows shown in the data preview when no limit is configured.
pub const DEFAULT_PREVIEW_ROWS: usize = 100;

/// Environment variable that overrides a profile's source path.
pub const SOURCE_ENV_VAR: &str = "ROAD_SAFETY_SOURCE";

/// Shown alongside an empty result instead of metrics.
pub const NO_MATCH_NOTICE: &str = "No data matches your filters.";

/// Errors that end a dashboard request.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// The dataset could not be loaded.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// The request's filter criteria are invalid.
    #[error(transparent)]
    Filter(#[from] FilterError),
}

impl DashboardError {
    /// A message suitable for showing to the person using the dashboard.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Ingest(IngestError::SourceNotFound { path }) => {
                format!("File '{path}' not found! Make sure it is in the same folder.")
            }
            Self::Ingest(e) => format!("Error loading data: {e}"),
            Self::Filter(FilterError::InvalidHourRange { lower, upper }) => {
                format!("Invalid hour range {lower}-{upper}: pick hours from 0 to 23, start first.")
            }
        }
    }
}

/// One row of the data preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRow {
    /// Severity level (1-4).
    pub severity: u8,
    /// Start time, if it parsed.
    pub start_time: Option<NaiveDateTime>,
    /// Start latitude.
    pub start_lat: f64,
    /// Start longitude.
    pub start_lng: f64,
    /// City.
    pub city: String,
    /// State.
    pub state: String,
    /// Street name.
    pub street: Option<String>,
    /// ZIP code.
    pub zipcode: Option<String>,
    /// Weather condition.
    pub weather_condition: Option<String>,
    /// Hour of day.
    pub hour: Option<u8>,
    /// Day of week.
    pub weekday: Option<Weekday>,
    /// Calendar date.
    pub date: Option<NaiveDate>,
}

impl From<&AccidentRecord> for PreviewRow {
    fn from(record: &AccidentRecord) -> Self {
        Self {
            severity: record.severity.value(),
            start_time: record.start_time,
            start_lat: record.start_lat,
            start_lng: record.start_lng,
            city: record.locality.to_string(),
            state: record.region.to_string(),
            street: record.street.clone(),
            zipcode: record.postal_code.clone(),
            weather_condition: record.weather_condition.as_deref().map(str::to_string),
            hour: record.hour,
            weekday: record.weekday,
            date: record.date,
        }
    }
}

/// Everything rendered for one filter request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    /// Records in the loaded dataset.
    pub dataset_size: u64,
    /// Records matching the filters.
    pub total: u64,
    /// Headline metrics, or the empty signal.
    pub summary: Summary,
    /// Message to show when nothing matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    /// Leading matching records.
    pub preview: Vec<PreviewRow>,
    /// Map center and sampled markers.
    pub map: MapSample,
    /// Matching records per hour of day.
    pub hourly: Vec<HourBucket>,
    /// Matching records per severity level.
    pub severity: Vec<SeverityCount>,
    /// Most frequent weather conditions.
    pub top_weather: Vec<CategoryCount>,
    /// Matching records per day of week.
    pub weekday: Vec<WeekdayCount>,
}

/// Values a UI can offer for each filter control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    /// Selectable regions, sorted.
    pub regions: Vec<String>,
    /// Localities within the selected region, sorted.
    pub localities: Vec<String>,
    /// Weather conditions in first-seen order.
    pub weather_conditions: Vec<String>,
}

/// Builds the load configuration for `profile`, optionally reading from
/// another file or a different number of rows.
///
/// An override path keeps the profile's zip entry name when both are zip
/// archives.
#[must_use]
pub fn resolve_config(
    profile: &LoadProfile,
    source: Option<PathBuf>,
    row_cap: Option<u64>,
) -> LoadConfig {
    let mut config = profile.config();

    if let Some(path) = source {
        let mut identity = SourceIdentity::from_path(path);
        if let (
            Some(ArchiveFormat::Zip { entry }),
            Some(ArchiveFormat::Zip {
                entry: profile_entry,
            }),
        ) = (&mut identity.archive, &profile.source.archive)
        {
            entry.clone_from(profile_entry);
        }
        config.source = identity;
    }

    if let Some(row_cap) = row_cap {
        config.params.row_cap = row_cap;
    }

    config
}

/// Owns the dataset cache and answers filter requests against the active
/// load configuration.
#[derive(Debug)]
pub struct Dashboard {
    cache: DatasetCache,
    config: LoadConfig,
    sampler: GeoSampler,
    preview_rows: usize,
    top_weather: usize,
}

impl Dashboard {
    /// A dashboard reading local CSV, zip, or gzip files.
    #[must_use]
    pub fn new(config: LoadConfig) -> Self {
        Self::with_loader(Arc::new(CsvDatasetLoader), config)
    }

    /// A dashboard that loads datasets through `loader`.
    #[must_use]
    pub fn with_loader(loader: Arc<dyn DatasetLoader>, config: LoadConfig) -> Self {
        Self {
            cache: DatasetCache::new(loader),
            config,
            sampler: GeoSampler::default(),
            preview_rows: DEFAULT_PREVIEW_ROWS,
            top_weather: DEFAULT_TOP_WEATHER,
        }
    }

    /// Uses `sampler` for the map.
    #[must_use]
    pub const fn with_sampler(mut self, sampler: GeoSampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Shows at most `rows` records in the preview.
    #[must_use]
    pub const fn with_preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows;
        self
    }

    /// Lists at most `limit` weather conditions in the top-weather chart.
    #[must_use]
    pub const fn with_top_weather(mut self, limit: usize) -> Self {
        self.top_weather = limit;
        self
    }

    /// The active load configuration.
    #[must_use]
    pub const fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// The underlying dataset cache.
    #[must_use]
    pub const fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    /// Switches to a different load configuration.
    ///
    /// The dataset of the previous configuration is dropped from the cache.
    pub fn reconfigure(&mut self, config: LoadConfig) {
        if config != self.config {
            self.cache.invalidate(&self.config);
            self.config = config;
        }
    }

    /// The dataset for the active configuration, loading it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Ingest`] if the dataset cannot be loaded.
    pub fn dataset(&self) -> Result<Arc<Dataset>, DashboardError> {
        Ok(self.cache.get_or_load(&self.config)?)
    }

    /// Sorted distinct regions.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Ingest`] if the dataset cannot be loaded.
    pub fn region_options(&self) -> Result<Vec<String>, DashboardError> {
        Ok(options::region_options(&*self.dataset()?))
    }

    /// Localities within `region`, sorted. Empty when every region is
    /// selected.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Ingest`] if the dataset cannot be loaded.
    pub fn locality_options(
        &self,
        region: &RegionSelection,
    ) -> Result<Vec<String>, DashboardError> {
        Ok(options::locality_options(&*self.dataset()?, region))
    }

    /// Weather conditions in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Ingest`] if the dataset cannot be loaded.
    pub fn weather_options(&self) -> Result<Vec<String>, DashboardError> {
        Ok(options::weather_options(&*self.dataset()?))
    }

    /// All option lists for the given region selection.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Ingest`] if the dataset cannot be loaded.
    pub fn filter_options(
        &self,
        region: &RegionSelection,
    ) -> Result<FilterOptions, DashboardError> {
        let dataset = self.dataset()?;
        Ok(FilterOptions {
            regions: options::region_options(&dataset),
            localities: options::locality_options(&dataset, region),
            weather_conditions: options::weather_options(&dataset),
        })
    }

    /// Answers one filter request.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Filter`] for invalid criteria (checked
    /// before the dataset is touched) and [`DashboardError::Ingest`] if the
    /// dataset cannot be loaded.
    pub fn query(&self, criteria: &FilterCriteria) -> Result<DashboardResponse, DashboardError> {
        road_safety_analytics::filter::validate(criteria)?;

        let dataset = self.dataset()?;
        let view = road_safety_analytics::apply(&dataset, criteria)?;
        let summary = summarize(&view);

        log::info!(
            "Query matched {} of {} records",
            view.len(),
            dataset.len()
        );

        Ok(DashboardResponse {
            dataset_size: dataset.len() as u64,
            total: view.len() as u64,
            notice: summary.is_empty().then(|| NO_MATCH_NOTICE.to_string()),
            summary,
            preview: view.head(self.preview_rows).map(PreviewRow::from).collect(),
            map: self.sampler.map_sample(&view),
            hourly: hourly_histogram(&view),
            severity: severity_distribution(&view),
            top_weather: top_weather(&view, self.top_weather),
            weekday: weekday_distribution(&view),
        })
    }
}
