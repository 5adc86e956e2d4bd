#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregation and query engine for municipal crime statistics.
//!
//! [`aggregate`] turns the raw incident table into the per-(municipality,
//! year, crime type) summary table with population-normalized rates;
//! [`query`] answers "crime series for municipality M, crime type(s) C"
//! against that table. Both are pure functions over immutable inputs, so
//! concurrent callers never need coordination.

pub mod aggregate;
pub mod query;

pub use aggregate::{CrimeCodeMap, aggregate, attach_cross_type_totals};
pub use query::{CrimeSeries, SeriesMode, SeriesPoint, TypeSeries, crime_series};
