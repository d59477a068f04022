#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Accident record types, severity levels, and the in-memory dataset.
//!
//! Every ingestion configuration produces [`AccidentRecord`]s collected
//! into a [`Dataset`]. Time-based features (`hour`, `weekday`, `date`)
//! are derived once when a record is constructed and never change
//! afterwards.

use std::sync::Arc;

use chrono::{Datelike as _, NaiveDate, NaiveDateTime, Timelike as _};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Severity of an accident's impact on traffic, from 1 (minor) to 4
/// (severe).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AccidentSeverity {
    /// Level 1: short delay, little traffic impact
    Minor = 1,
    /// Level 2: noticeable delay
    Moderate = 2,
    /// Level 3: significant delay
    Serious = 3,
    /// Level 4: long delay, major traffic impact
    Severe = 4,
}

impl AccidentSeverity {
    /// Returns the numeric value of this severity level.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Creates a severity level from a numeric value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the range 1-4.
    pub const fn from_value(value: u8) -> Result<Self, InvalidSeverityError> {
        match value {
            1 => Ok(Self::Minor),
            2 => Ok(Self::Moderate),
            3 => Ok(Self::Serious),
            4 => Ok(Self::Severe),
            _ => Err(InvalidSeverityError { value }),
        }
    }

    /// Whether this level is drawn as a high-severity marker on the map.
    #[must_use]
    pub const fn is_high(self) -> bool {
        self.value() >= 3
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Minor, Self::Moderate, Self::Serious, Self::Severe]
    }
}

/// Error returned when attempting to create an [`AccidentSeverity`] from an
/// invalid numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSeverityError {
    /// The invalid severity value that was provided.
    pub value: u8,
}

impl std::fmt::Display for InvalidSeverityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid severity value {}: expected 1-4", self.value)
    }
}

impl std::error::Error for InvalidSeverityError {}

/// Day of the week, stored as a compact categorical value.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// Returns all variants in calendar order, starting on Monday.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Monday,
            Self::Tuesday,
            Self::Wednesday,
            Self::Thursday,
            Self::Friday,
            Self::Saturday,
            Self::Sunday,
        ]
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(value: chrono::Weekday) -> Self {
        match value {
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
        }
    }
}

/// A source column that maps onto an [`AccidentRecord`] field.
///
/// The serialized form is the column header used by the accident exports
/// (e.g. `Start_Lat`), so load profiles can name fields exactly as they
/// appear in the file.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    IntoStaticStr,
)]
pub enum Field {
    Severity,
    #[serde(rename = "Start_Time")]
    #[strum(serialize = "Start_Time")]
    StartTime,
    #[serde(rename = "Start_Lat")]
    #[strum(serialize = "Start_Lat")]
    StartLat,
    #[serde(rename = "Start_Lng")]
    #[strum(serialize = "Start_Lng")]
    StartLng,
    City,
    State,
    Street,
    Zipcode,
    #[serde(rename = "Weather_Condition")]
    #[strum(serialize = "Weather_Condition")]
    WeatherCondition,
}

impl Field {
    /// Fields every surviving record must carry, regardless of the
    /// configured required-fields policy.
    pub const INVARIANT: &'static [Self] =
        &[Self::StartLat, Self::StartLng, Self::City, Self::State];

    /// Returns the source column header for this field.
    #[must_use]
    pub fn column(self) -> &'static str {
        self.into()
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Severity,
            Self::StartTime,
            Self::StartLat,
            Self::StartLng,
            Self::City,
            Self::State,
            Self::Street,
            Self::Zipcode,
            Self::WeatherCondition,
        ]
    }
}

/// A single accident event.
///
/// Categorical text (`locality`, `region`, `weather_condition`) is held as
/// shared [`Arc<str>`] handles so that records with the same value point
/// at one allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct AccidentRecord {
    /// Impact severity.
    pub severity: AccidentSeverity,
    /// When the accident started. `None` if the source value was missing or
    /// unparsable.
    pub start_time: Option<NaiveDateTime>,
    /// Start latitude (WGS84), always finite.
    pub start_lat: f64,
    /// Start longitude (WGS84), always finite.
    pub start_lng: f64,
    /// City.
    pub locality: Arc<str>,
    /// State abbreviation.
    pub region: Arc<str>,
    /// Street name.
    pub street: Option<String>,
    /// Postal (ZIP) code.
    pub postal_code: Option<String>,
    /// Weather at the time of the accident.
    pub weather_condition: Option<Arc<str>>,
    /// Hour of day (0-23) derived from `start_time`.
    pub hour: Option<u8>,
    /// Day of week derived from `start_time`.
    pub weekday: Option<Weekday>,
    /// Calendar date derived from `start_time`.
    pub date: Option<NaiveDate>,
}

impl AccidentRecord {
    /// Creates a record and derives its time features from `start_time`.
    #[must_use]
    pub fn new(
        severity: AccidentSeverity,
        start_time: Option<NaiveDateTime>,
        start_lat: f64,
        start_lng: f64,
        locality: impl Into<Arc<str>>,
        region: impl Into<Arc<str>>,
    ) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let hour = start_time.map(|t| t.hour() as u8);

        Self {
            severity,
            start_time,
            start_lat,
            start_lng,
            locality: locality.into(),
            region: region.into(),
            street: None,
            postal_code: None,
            weather_condition: None,
            hour,
            weekday: start_time.map(|t| t.weekday().into()),
            date: start_time.map(|t| t.date()),
        }
    }

    /// Sets the street name.
    #[must_use]
    pub fn with_street(mut self, street: Option<String>) -> Self {
        self.street = street;
        self
    }

    /// Sets the postal code.
    #[must_use]
    pub fn with_postal_code(mut self, postal_code: Option<String>) -> Self {
        self.postal_code = postal_code;
        self
    }

    /// Sets the weather condition.
    #[must_use]
    pub fn with_weather_condition(mut self, weather_condition: Option<Arc<str>>) -> Self {
        self.weather_condition = weather_condition;
        self
    }
}

/// An ordered collection of records produced by one ingestion run.
///
/// A dataset is never modified after it is built. Consumers hold it behind
/// an [`Arc`] and only ever see shared references to its records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<AccidentRecord>,
    columns: Vec<String>,
}

impl Dataset {
    /// Creates a dataset from records in source order and the names of the
    /// source columns that were materialized.
    #[must_use]
    pub const fn new(records: Vec<AccidentRecord>, columns: Vec<String>) -> Self {
        Self { records, columns }
    }

    /// All records in source order.
    #[must_use]
    pub fn records(&self) -> &[AccidentRecord] {
        &self.records
    }

    /// Returns the record at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&AccidentRecord> {
        self.records.get(index)
    }

    /// Number of records.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no records.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Names of the materialized source columns, in header order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Whether the source column backing `field` was materialized.
    #[must_use]
    pub fn has_field(&self, field: Field) -> bool {
        let name = field.column();
        self.columns.iter().any(|c| c == name)
    }
}
