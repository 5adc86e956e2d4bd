#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Core data types for municipal crime statistics.
//!
//! This crate defines the canonical row types shared across the whole
//! crime-lens system: raw incident rows as loaded from the reference
//! dataset, aggregated per-(municipality, year, crime type) rows, and the
//! compact identifiers used to key them.

use serde::{Deserialize, Serialize};

/// Canonical municipality identifier.
///
/// Source rows carry the municipal code as either text or a bare number
/// depending on their origin. Normalization to one string representation
/// happens exactly once, at construction, so equality at query time is a
/// plain string comparison.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MunicipalCode(String);

impl MunicipalCode {
    /// Creates a canonical code from any textual source form.
    ///
    /// Leading and trailing whitespace is stripped; the remaining text is
    /// kept verbatim.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        let code = code.into();
        Self(code.trim().to_owned())
    }

    /// Creates a canonical code from a numeric source form.
    #[must_use]
    pub fn from_numeric(code: u64) -> Self {
        Self(code.to_string())
    }

    /// Returns the canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MunicipalCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compact stable identifier for a free-text crime category label.
///
/// Codes are dense integers starting at 1, rendered as `C1`, `C2`, …; the
/// label-to-code assignment is owned by the aggregation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CrimeTypeCode(u16);

impl CrimeTypeCode {
    /// Creates a code from its 1-based ordinal.
    ///
    /// # Errors
    ///
    /// Returns an error if the ordinal is zero.
    pub const fn new(ordinal: u16) -> Result<Self, InvalidCrimeTypeCodeError> {
        if ordinal == 0 {
            return Err(InvalidCrimeTypeCodeError);
        }
        Ok(Self(ordinal))
    }

    /// Returns the 1-based ordinal of this code.
    #[must_use]
    pub const fn ordinal(self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for CrimeTypeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "C{}", self.0)
    }
}

impl std::str::FromStr for CrimeTypeCode {
    type Err = InvalidCrimeTypeCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ordinal = s
            .strip_prefix('C')
            .and_then(|n| n.parse::<u16>().ok())
            .ok_or(InvalidCrimeTypeCodeError)?;
        Self::new(ordinal)
    }
}

impl From<CrimeTypeCode> for String {
    fn from(code: CrimeTypeCode) -> Self {
        code.to_string()
    }
}

impl TryFrom<String> for CrimeTypeCode {
    type Error = InvalidCrimeTypeCodeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Error returned when parsing or constructing a malformed [`CrimeTypeCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidCrimeTypeCodeError;

impl std::fmt::Display for InvalidCrimeTypeCodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("invalid crime type code: expected 'C' followed by an ordinal >= 1")
    }
}

impl std::error::Error for InvalidCrimeTypeCodeError {}

/// Per-100,000-residents incidence rate, or an explicit marker that the
/// rate cannot be computed.
///
/// `Undefined` is a data-quality condition (zero or missing population),
/// not an error: it must stay distinguishable from a genuine `0.0` rate all
/// the way to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum CrimeRate {
    /// Incidents per 100,000 residents, rounded to 2 decimal places.
    Per100k(f64),
    /// The municipality's population is zero or missing for this row.
    Undefined,
}

impl CrimeRate {
    /// Computes the normalized rate for a count and a population.
    ///
    /// Returns [`CrimeRate::Undefined`] when `population` is zero rather
    /// than dividing by zero or propagating a NaN.
    #[must_use]
    pub fn compute(total_crime: u64, population: u64) -> Self {
        if population == 0 {
            return Self::Undefined;
        }
        #[allow(clippy::cast_precision_loss)]
        let raw = total_crime as f64 / population as f64 * 100_000.0;
        Self::Per100k((raw * 100.0).round() / 100.0)
    }

    /// Returns the numeric rate, or `None` when undefined.
    #[must_use]
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Per100k(v) => Some(v),
            Self::Undefined => None,
        }
    }

    /// Whether this rate is the undefined sentinel.
    #[must_use]
    pub const fn is_undefined(self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Sums two rates. Any `Undefined` operand makes the sum `Undefined`,
    /// so missing-population rows can never masquerade as a low combined
    /// rate.
    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        match (self, other) {
            (Self::Per100k(a), Self::Per100k(b)) => Self::Per100k(a + b),
            _ => Self::Undefined,
        }
    }
}

/// One raw observation row from the incident reference dataset.
///
/// `(municipal_code, year, crime_type)` may repeat across source rows;
/// duplicates carry partial counts and must be summed during aggregation,
/// never overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    /// Canonical municipality identifier.
    pub municipal_code: MunicipalCode,
    /// Human-readable municipality name.
    pub municipal_name: String,
    /// Join key to the boundary dataset's feature geometry.
    pub geo_id: String,
    /// Calendar year of the observation.
    pub year: i32,
    /// Free-text crime category label as it appears in the source.
    pub crime_type: String,
    /// Incident count for this observation.
    pub total_crime: u64,
    /// Municipality population for this year.
    pub population: u64,
}

/// One aggregated row: the summed counts and normalized rate for a
/// `(municipality, year, crime type)` combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedRow {
    /// Canonical municipality identifier.
    pub municipal_code: MunicipalCode,
    /// Calendar year.
    pub year: i32,
    /// Compact code for the crime category.
    pub crime_type_code: CrimeTypeCode,
    /// Incident count summed over duplicate source rows.
    pub total_crime: u64,
    /// Municipality population for this year (first observed value when
    /// duplicate rows disagree).
    pub population: u64,
    /// Population-normalized incidence rate.
    pub rate_per_100k: CrimeRate,
    /// Incident count summed across all crime types for this
    /// `(municipality, year)`, when the consumer asked for it.
    pub total_crime_all_types: Option<u64>,
}

/// Per-municipality reference row derived once at load time.
///
/// Used to populate selection choices and the choropleth trace; never
/// recomputed per query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MunicipalityMeta {
    /// Canonical municipality identifier.
    pub municipal_code: MunicipalCode,
    /// Human-readable municipality name.
    pub municipal_name: String,
    /// Join key to the boundary dataset's feature geometry.
    pub geo_id: String,
    /// Population in the latest observed year.
    pub population: u64,
    /// The latest observed year the population refers to.
    pub year: i32,
}
