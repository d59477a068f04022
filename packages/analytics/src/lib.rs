#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory analytics over a loaded accident [`Dataset`].
//!
//! [`filter::apply`] narrows a dataset to the records matching a
//! [`FilterCriteria`]. The resulting [`FilteredView`] borrows the dataset
//! and feeds [`summary::summarize`], the chart aggregations in
//! [`distribution`], and the geo sampler. [`options`] computes the values a
//! UI can offer for each filter.
//!
//! [`Dataset`]: road_safety_accident_models::Dataset
//! [`FilterCriteria`]: road_safety_analytics_models::FilterCriteria

pub mod distribution;
pub mod filter;
pub mod options;
pub mod summary;

pub use filter::{FilteredView, apply};
pub use summary::summarize;

use thiserror::Error;

/// Errors raised for invalid filter requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The hour window is reversed or reaches past hour 23.
    #[error("Invalid hour range {lower}-{upper}: bounds must be within 0-23 and lower <= upper")]
    InvalidHourRange {
        /// Requested first hour.
        lower: u8,
        /// Requested last hour.
        upper: u8,
    },
}
