//! Point queries against the aggregated summary table.
//!
//! Answers "crime series for municipality M, crime type(s) C" as an
//! ordered time series. Filtering is a pure function of its inputs: no
//! cursor, no cache, nothing a concurrent caller could corrupt.

use std::collections::{BTreeMap, BTreeSet};

use crime_lens_stats_models::{AggregatedRow, CrimeRate, CrimeTypeCode, MunicipalCode};
use serde::{Deserialize, Serialize};

/// How a multi-code query shapes its result.
///
/// The mode is always caller-supplied; it is never inferred from the
/// number of requested codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeriesMode {
    /// Sum matching values per year into a single series.
    Combined,
    /// Keep one series per crime type code for multi-series display.
    PerType,
}

/// One point of a time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    /// Calendar year.
    pub year: i32,
    /// Per-100k rate for this year.
    pub value: CrimeRate,
}

/// The time series for a single crime type code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSeries {
    /// The code this series belongs to.
    pub crime_type_code: CrimeTypeCode,
    /// Points in ascending year order.
    pub points: Vec<SeriesPoint>,
}

/// Result of a series query.
///
/// Years with no matching row are simply absent, never zero-filled;
/// callers needing a dense series zero-fill explicitly. An empty result is
/// a valid "no data" state, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "series", rename_all = "camelCase")]
pub enum CrimeSeries {
    /// One summed series, ascending by year.
    Combined(Vec<SeriesPoint>),
    /// One series per matched code, ordered by code, each ascending by
    /// year.
    PerType(Vec<TypeSeries>),
}

impl CrimeSeries {
    /// Whether the query matched no rows at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Combined(points) => points.is_empty(),
            Self::PerType(series) => series.is_empty(),
        }
    }
}

/// Filters the aggregated table to one municipality and a set of crime
/// type codes, returning the matching values as year-ordered series.
///
/// In [`SeriesMode::Combined`] the values of matching rows sharing a year
/// are summed; an undefined rate in any contributing row makes that year's
/// sum undefined rather than silently shrinking it.
#[must_use]
pub fn crime_series(
    table: &[AggregatedRow],
    municipality: &MunicipalCode,
    codes: &BTreeSet<CrimeTypeCode>,
    mode: SeriesMode,
) -> CrimeSeries {
    let matching = table
        .iter()
        .filter(|row| &row.municipal_code == municipality && codes.contains(&row.crime_type_code));

    match mode {
        SeriesMode::Combined => {
            let mut by_year: BTreeMap<i32, CrimeRate> = BTreeMap::new();
            for row in matching {
                by_year
                    .entry(row.year)
                    .and_modify(|value| *value = value.saturating_add(row.rate_per_100k))
                    .or_insert(row.rate_per_100k);
            }
            CrimeSeries::Combined(
                by_year
                    .into_iter()
                    .map(|(year, value)| SeriesPoint { year, value })
                    .collect(),
            )
        }
        SeriesMode::PerType => {
            let mut by_code: BTreeMap<CrimeTypeCode, BTreeMap<i32, CrimeRate>> = BTreeMap::new();
            for row in matching {
                by_code
                    .entry(row.crime_type_code)
                    .or_default()
                    .entry(row.year)
                    .and_modify(|value| *value = value.saturating_add(row.rate_per_100k))
                    .or_insert(row.rate_per_100k);
            }
            CrimeSeries::PerType(
                by_code
                    .into_iter()
                    .map(|(crime_type_code, years)| TypeSeries {
                        crime_type_code,
                        points: years
                            .into_iter()
                            .map(|(year, value)| SeriesPoint { year, value })
                            .collect(),
                    })
                    .collect(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(code: &str, year: i32, ordinal: u16, rate: CrimeRate) -> AggregatedRow {
        AggregatedRow {
            municipal_code: MunicipalCode::new(code),
            year,
            crime_type_code: CrimeTypeCode::new(ordinal).unwrap(),
            total_crime: 10,
            population: 100_000,
            rate_per_100k: rate,
            total_crime_all_types: None,
        }
    }

    fn codes(ordinals: &[u16]) -> BTreeSet<CrimeTypeCode> {
        ordinals
            .iter()
            .map(|&n| CrimeTypeCode::new(n).unwrap())
            .collect()
    }

    #[test]
    fn single_code_series_is_ascending_by_year() {
        let table = vec![
            row("14005", 2020, 1, CrimeRate::Per100k(12.0)),
            row("14005", 2018, 1, CrimeRate::Per100k(10.0)),
            row("14005", 2019, 1, CrimeRate::Per100k(11.0)),
            row("14005", 2019, 2, CrimeRate::Per100k(99.0)),
            row("20010", 2019, 1, CrimeRate::Per100k(50.0)),
        ];
        let series = crime_series(
            &table,
            &MunicipalCode::new("14005"),
            &codes(&[1]),
            SeriesMode::Combined,
        );
        let CrimeSeries::Combined(points) = series else {
            panic!("expected combined series");
        };
        assert_eq!(
            points.iter().map(|p| p.year).collect::<Vec<_>>(),
            vec![2018, 2019, 2020]
        );
        assert_eq!(points[1].value, CrimeRate::Per100k(11.0));
    }

    #[test]
    fn unknown_municipality_returns_empty_not_error() {
        let table = vec![row("14005", 2019, 1, CrimeRate::Per100k(10.0))];
        let series = crime_series(
            &table,
            &MunicipalCode::new("99999"),
            &codes(&[1]),
            SeriesMode::Combined,
        );
        assert!(series.is_empty());
    }

    #[test]
    fn combined_mode_sums_values_per_year() {
        let table = vec![
            row("14005", 2019, 1, CrimeRate::Per100k(10.0)),
            row("14005", 2019, 2, CrimeRate::Per100k(5.5)),
            row("14005", 2020, 1, CrimeRate::Per100k(7.0)),
        ];
        let series = crime_series(
            &table,
            &MunicipalCode::new("14005"),
            &codes(&[1, 2]),
            SeriesMode::Combined,
        );
        let CrimeSeries::Combined(points) = series else {
            panic!("expected combined series");
        };
        assert_eq!(points[0], SeriesPoint {
            year: 2019,
            value: CrimeRate::Per100k(15.5)
        });
        assert_eq!(points[1].value, CrimeRate::Per100k(7.0));
    }

    #[test]
    fn combined_mode_propagates_undefined() {
        let table = vec![
            row("14005", 2019, 1, CrimeRate::Per100k(10.0)),
            row("14005", 2019, 2, CrimeRate::Undefined),
        ];
        let series = crime_series(
            &table,
            &MunicipalCode::new("14005"),
            &codes(&[1, 2]),
            SeriesMode::Combined,
        );
        let CrimeSeries::Combined(points) = series else {
            panic!("expected combined series");
        };
        assert!(points[0].value.is_undefined());
    }

    #[test]
    fn per_type_mode_keeps_series_distinct() {
        let table = vec![
            row("14005", 2019, 2, CrimeRate::Per100k(5.0)),
            row("14005", 2018, 2, CrimeRate::Per100k(4.0)),
            row("14005", 2019, 1, CrimeRate::Per100k(10.0)),
        ];
        let series = crime_series(
            &table,
            &MunicipalCode::new("14005"),
            &codes(&[1, 2]),
            SeriesMode::PerType,
        );
        let CrimeSeries::PerType(per_type) = series else {
            panic!("expected per-type series");
        };
        assert_eq!(per_type.len(), 2);
        assert_eq!(per_type[0].crime_type_code, CrimeTypeCode::new(1).unwrap());
        assert_eq!(per_type[0].points.len(), 1);
        assert_eq!(
            per_type[1].points.iter().map(|p| p.year).collect::<Vec<_>>(),
            vec![2018, 2019]
        );
    }

    #[test]
    fn codes_outside_the_requested_set_are_excluded() {
        let table = vec![
            row("14005", 2019, 1, CrimeRate::Per100k(10.0)),
            row("14005", 2019, 3, CrimeRate::Per100k(99.0)),
        ];
        let series = crime_series(
            &table,
            &MunicipalCode::new("14005"),
            &codes(&[1]),
            SeriesMode::PerType,
        );
        let CrimeSeries::PerType(per_type) = series else {
            panic!("expected per-type series");
        };
        assert_eq!(per_type.len(), 1);
        assert_eq!(per_type[0].crime_type_code, CrimeTypeCode::new(1).unwrap());
    }

    #[test]
    fn absent_years_are_not_zero_filled() {
        let table = vec![
            row("14005", 2017, 1, CrimeRate::Per100k(1.0)),
            row("14005", 2020, 1, CrimeRate::Per100k(2.0)),
        ];
        let series = crime_series(
            &table,
            &MunicipalCode::new("14005"),
            &codes(&[1]),
            SeriesMode::Combined,
        );
        let CrimeSeries::Combined(points) = series else {
            panic!("expected combined series");
        };
        assert_eq!(
            points.iter().map(|p| p.year).collect::<Vec<_>>(),
            vec![2017, 2020]
        );
    }
}
