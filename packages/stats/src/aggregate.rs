//! Incident aggregation and crime-type code assignment.
//!
//! The raw incident table carries free-text crime category labels and may
//! repeat `(municipality, year, crime type)` keys across rows. Aggregation
//! sums those duplicates, substitutes compact [`CrimeTypeCode`]s for the
//! labels, and attaches the per-100k rate.

use std::collections::{BTreeMap, BTreeSet};

use crime_lens_stats_models::{
    AggregatedRow, CrimeRate, CrimeTypeCode, IncidentRecord, MunicipalCode,
};

/// Immutable bidirectional mapping between free-text crime category labels
/// and their compact codes.
///
/// Codes are assigned by sorting the distinct labels ascending and
/// numbering them from 1, so the same label set always produces the same
/// mapping. Built once after load, never recomputed per query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrimeCodeMap {
    by_label: BTreeMap<String, CrimeTypeCode>,
    /// Labels indexed by `ordinal - 1`.
    labels: Vec<String>,
}

impl CrimeCodeMap {
    /// Builds the mapping from the distinct crime type labels in a raw
    /// incident table.
    #[must_use]
    pub fn from_records(records: &[IncidentRecord]) -> Self {
        Self::from_labels(records.iter().map(|r| r.crime_type.as_str()))
    }

    /// Builds the mapping from an arbitrary label iterator. Duplicates are
    /// collapsed; ordering of the input does not matter.
    #[must_use]
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let distinct: BTreeSet<&str> = labels.into_iter().collect();

        let mut by_label = BTreeMap::new();
        let mut ordered = Vec::with_capacity(distinct.len());

        for (idx, label) in distinct.into_iter().enumerate() {
            let Ok(ordinal) = u16::try_from(idx + 1) else {
                log::warn!("crime type code space exhausted; ignoring label '{label}'");
                break;
            };
            let Ok(code) = CrimeTypeCode::new(ordinal) else {
                break;
            };
            by_label.insert(label.to_owned(), code);
            ordered.push(label.to_owned());
        }

        Self {
            by_label,
            labels: ordered,
        }
    }

    /// Returns the code assigned to a label, if the label was present at
    /// build time.
    #[must_use]
    pub fn code_for(&self, label: &str) -> Option<CrimeTypeCode> {
        self.by_label.get(label).copied()
    }

    /// Returns the label a code was assigned to.
    #[must_use]
    pub fn label_for(&self, code: CrimeTypeCode) -> Option<&str> {
        self.labels
            .get(usize::from(code.ordinal()) - 1)
            .map(String::as_str)
    }

    /// Number of distinct labels in the mapping.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the mapping is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterates `(code, label)` pairs in ascending code order.
    pub fn iter(&self) -> impl Iterator<Item = (CrimeTypeCode, &str)> {
        self.labels
            .iter()
            .map(|label| (self.by_label[label], label.as_str()))
    }
}

/// Derives the per-(municipality, year, crime type) summary table.
///
/// Duplicate source keys are summed, never overwritten. `population` is
/// assumed constant within a group; when source rows disagree the first
/// observed value wins and the disagreement is logged — a documented
/// limitation, not a silent average.
///
/// Rows whose label is absent from `code_map` are dropped with a warning;
/// this cannot happen when the map was built from the same records.
///
/// Output is ordered by `(municipal_code, year, crime_type_code)`, so
/// aggregating the same input twice yields identical output.
#[must_use]
pub fn aggregate(records: &[IncidentRecord], code_map: &CrimeCodeMap) -> Vec<AggregatedRow> {
    struct Group {
        total_crime: u64,
        population: u64,
    }

    let mut groups: BTreeMap<(MunicipalCode, i32, String), Group> = BTreeMap::new();

    for record in records {
        let key = (
            record.municipal_code.clone(),
            record.year,
            record.crime_type.clone(),
        );
        match groups.get_mut(&key) {
            Some(group) => {
                group.total_crime += record.total_crime;
                if group.population != record.population {
                    log::warn!(
                        "population mismatch for {} {} '{}': keeping first observed {} over {}",
                        record.municipal_code,
                        record.year,
                        record.crime_type,
                        group.population,
                        record.population,
                    );
                }
            }
            None => {
                groups.insert(
                    key,
                    Group {
                        total_crime: record.total_crime,
                        population: record.population,
                    },
                );
            }
        }
    }

    let mut rows = Vec::with_capacity(groups.len());

    for ((municipal_code, year, crime_type), group) in groups {
        let Some(crime_type_code) = code_map.code_for(&crime_type) else {
            log::warn!("no code assigned for crime type '{crime_type}'; dropping group");
            continue;
        };
        rows.push(AggregatedRow {
            municipal_code,
            year,
            crime_type_code,
            total_crime: group.total_crime,
            population: group.population,
            rate_per_100k: CrimeRate::compute(group.total_crime, group.population),
            total_crime_all_types: None,
        });
    }

    log::info!(
        "aggregated {} incident rows into {} summary rows ({} crime types)",
        records.len(),
        rows.len(),
        code_map.len(),
    );

    rows
}

/// Fills `total_crime_all_types` on every row with the incident count
/// summed across all crime types for that row's `(municipality, year)`.
///
/// Optional second pass for consumers that need the unfiltered total next
/// to the per-type figures.
pub fn attach_cross_type_totals(rows: &mut [AggregatedRow]) {
    let mut totals: BTreeMap<(MunicipalCode, i32), u64> = BTreeMap::new();

    for row in rows.iter() {
        *totals
            .entry((row.municipal_code.clone(), row.year))
            .or_insert(0) += row.total_crime;
    }

    for row in rows.iter_mut() {
        row.total_crime_all_types = totals
            .get(&(row.municipal_code.clone(), row.year))
            .copied();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        code: &str,
        year: i32,
        crime_type: &str,
        total_crime: u64,
        population: u64,
    ) -> IncidentRecord {
        IncidentRecord {
            municipal_code: MunicipalCode::new(code),
            municipal_name: format!("Municipality {code}"),
            geo_id: format!("geo-{code}"),
            year,
            crime_type: crime_type.to_owned(),
            total_crime,
            population,
        }
    }

    #[test]
    fn code_assignment_is_sorted_and_dense() {
        let map = CrimeCodeMap::from_labels(["Robo", "Homicidio", "Fraude", "Robo"]);
        assert_eq!(map.len(), 3);
        assert_eq!(map.code_for("Fraude"), Some(CrimeTypeCode::new(1).unwrap()));
        assert_eq!(
            map.code_for("Homicidio"),
            Some(CrimeTypeCode::new(2).unwrap())
        );
        assert_eq!(map.code_for("Robo"), Some(CrimeTypeCode::new(3).unwrap()));
        assert_eq!(map.code_for("Secuestro"), None);
    }

    #[test]
    fn code_map_is_bidirectional() {
        let map = CrimeCodeMap::from_labels(["b", "a", "c"]);
        for (code, label) in map.iter() {
            assert_eq!(map.code_for(label), Some(code));
            assert_eq!(map.label_for(code), Some(label));
        }
        assert_eq!(map.label_for(CrimeTypeCode::new(9).unwrap()), None);
    }

    #[test]
    fn code_assignment_is_deterministic_across_builds() {
        let forwards = CrimeCodeMap::from_labels(["x", "y", "z"]);
        let backwards = CrimeCodeMap::from_labels(["z", "y", "x"]);
        assert_eq!(forwards, backwards);
    }

    #[test]
    fn duplicate_keys_are_summed_not_overwritten() {
        let records = vec![
            record("14005", 2019, "Robo", 40, 100_000),
            record("14005", 2019, "Robo", 60, 100_000),
            record("14005", 2019, "Homicidio", 5, 100_000),
        ];
        let map = CrimeCodeMap::from_records(&records);
        let rows = aggregate(&records, &map);

        assert_eq!(rows.len(), 2);
        let robo = rows
            .iter()
            .find(|r| map.label_for(r.crime_type_code) == Some("Robo"))
            .unwrap();
        assert_eq!(robo.total_crime, 100);
        assert_eq!(robo.rate_per_100k, CrimeRate::Per100k(100.0));
    }

    #[test]
    fn aggregation_conserves_totals_per_municipality_year() {
        let records = vec![
            record("14005", 2019, "Robo", 40, 100_000),
            record("14005", 2019, "Robo", 60, 100_000),
            record("14005", 2019, "Homicidio", 5, 100_000),
            record("14005", 2020, "Robo", 30, 101_000),
            record("20010", 2019, "Robo", 7, 50_000),
        ];
        let map = CrimeCodeMap::from_records(&records);
        let rows = aggregate(&records, &map);

        let mut input_totals: BTreeMap<(&str, i32), u64> = BTreeMap::new();
        for r in &records {
            *input_totals
                .entry((r.municipal_code.as_str(), r.year))
                .or_insert(0) += r.total_crime;
        }
        let mut output_totals: BTreeMap<(&str, i32), u64> = BTreeMap::new();
        for r in &rows {
            *output_totals
                .entry((r.municipal_code.as_str(), r.year))
                .or_insert(0) += r.total_crime;
        }
        assert_eq!(input_totals, output_totals);
    }

    #[test]
    fn output_covers_exactly_the_input_key_set() {
        let records = vec![
            record("14005", 2018, "Robo", 1, 10),
            record("14005", 2019, "Robo", 2, 10),
            record("20010", 2018, "Fraude", 3, 10),
        ];
        let map = CrimeCodeMap::from_records(&records);
        let rows = aggregate(&records, &map);
        assert_eq!(rows.len(), 3);
        assert!(rows.len() <= records.len());
    }

    #[test]
    fn zero_population_yields_undefined_rate() {
        let records = vec![record("14005", 2019, "Robo", 10, 0)];
        let map = CrimeCodeMap::from_records(&records);
        let rows = aggregate(&records, &map);
        assert!(rows[0].rate_per_100k.is_undefined());
    }

    #[test]
    fn aggregation_is_idempotent() {
        let records = vec![
            record("14005", 2019, "Robo", 40, 100_000),
            record("14005", 2019, "Robo", 60, 100_000),
            record("20010", 2018, "Fraude", 3, 25_000),
        ];
        let map = CrimeCodeMap::from_records(&records);
        assert_eq!(aggregate(&records, &map), aggregate(&records, &map));
    }

    #[test]
    fn population_mismatch_keeps_first_observed() {
        let records = vec![
            record("14005", 2019, "Robo", 40, 100_000),
            record("14005", 2019, "Robo", 60, 999_999),
        ];
        let map = CrimeCodeMap::from_records(&records);
        let rows = aggregate(&records, &map);
        assert_eq!(rows[0].population, 100_000);
    }

    #[test]
    fn cross_type_totals_cover_all_types() {
        let records = vec![
            record("14005", 2019, "Robo", 40, 100_000),
            record("14005", 2019, "Homicidio", 10, 100_000),
            record("14005", 2020, "Robo", 7, 101_000),
        ];
        let map = CrimeCodeMap::from_records(&records);
        let mut rows = aggregate(&records, &map);
        attach_cross_type_totals(&mut rows);

        for row in &rows {
            let expected = if row.year == 2019 { 50 } else { 7 };
            assert_eq!(row.total_crime_all_types, Some(expected));
        }
    }
}
