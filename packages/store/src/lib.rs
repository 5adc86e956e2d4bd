#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reference dataset loading.
//!
//! Reads the incident CSV and the boundary GeoJSON once at process start
//! into a [`CrimeSnapshot`]. The snapshot is immutable after load; query
//! handlers share it read-only (typically behind an `Arc`), so unlimited
//! concurrent readers need no coordination.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crime_lens_stats_models::{IncidentRecord, MunicipalCode, MunicipalityMeta};
use geojson::{FeatureCollection, GeoJson};

/// Errors that can occur while loading the reference datasets.
///
/// Both variants are fatal at startup: the process cannot serve queries
/// without valid reference data.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A source file is missing, unreadable, or malformed.
    #[error("source unreadable: {path}: {reason}")]
    SourceUnreadable {
        /// Path of the defective source file.
        path: PathBuf,
        /// What made it unreadable.
        reason: String,
    },

    /// A source file parsed but lacks a required column or structure.
    #[error("schema mismatch in {path}: missing required column '{column}'")]
    SchemaMismatch {
        /// Path of the offending source file.
        path: PathBuf,
        /// The absent column or structural element.
        column: String,
    },
}

impl StoreError {
    fn unreadable(path: &Path, reason: impl std::fmt::Display) -> Self {
        Self::SourceUnreadable {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// The immutable in-memory snapshot of both reference datasets.
///
/// Constructed once at startup via [`CrimeSnapshot::load`] and treated as
/// read-only afterward. The boundary features are passed through unmodified
/// for rendering; each feature carries a `geo-id`-equivalent property that
/// joins against [`IncidentRecord::geo_id`].
#[derive(Debug, Clone)]
pub struct CrimeSnapshot {
    /// Raw incident rows in source order.
    pub records: Vec<IncidentRecord>,
    /// One row per municipality with its latest-year population, ordered
    /// by municipal code.
    pub municipalities: Vec<MunicipalityMeta>,
    /// Boundary polygons, consumed opaquely.
    pub boundaries: FeatureCollection,
}

impl CrimeSnapshot {
    /// Loads both reference datasets from disk.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SourceUnreadable`] when either file is
    /// missing or malformed, [`StoreError::SchemaMismatch`] when required
    /// columns are absent.
    pub fn load(incident_path: &Path, boundary_path: &Path) -> Result<Self, StoreError> {
        let incident_bytes = std::fs::read(incident_path)
            .map_err(|e| StoreError::unreadable(incident_path, e))?;
        let boundary_bytes = std::fs::read(boundary_path)
            .map_err(|e| StoreError::unreadable(boundary_path, e))?;

        let records = parse_incidents(&incident_bytes, incident_path)?;
        let boundaries = parse_boundaries(&boundary_bytes, boundary_path)?;
        let municipalities = derive_municipalities(&records);

        log::info!(
            "loaded {} incident rows, {} municipalities, {} boundary features",
            records.len(),
            municipalities.len(),
            boundaries.features.len(),
        );

        Ok(Self {
            records,
            municipalities,
            boundaries,
        })
    }
}

/// Decodes source bytes as UTF-8, falling back to Latin-1.
///
/// The incident dataset carries Latin-accented municipality and crime type
/// names and ships in either encoding depending on how it was exported.
/// Latin-1 decoding cannot fail: every byte maps to the code point of the
/// same value.
#[must_use]
pub fn decode_text(bytes: &[u8]) -> String {
    std::str::from_utf8(bytes).map_or_else(
        |_| bytes.iter().map(|&b| char::from(b)).collect(),
        str::to_owned,
    )
}

/// Parses the incident CSV into raw rows.
///
/// Header names are matched after trimming; any defective data row is
/// fatal, since a partially loaded reference table would silently skew
/// every rate computed from it.
///
/// # Errors
///
/// Returns [`StoreError::SchemaMismatch`] when a required column is
/// missing, [`StoreError::SourceUnreadable`] when a row fails to parse.
pub fn parse_incidents(bytes: &[u8], origin: &Path) -> Result<Vec<IncidentRecord>, StoreError> {
    let text = decode_text(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| StoreError::unreadable(origin, e))?
        .iter()
        .map(str::to_owned)
        .collect();

    let column_index = |column: &str| -> Result<usize, StoreError> {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| StoreError::SchemaMismatch {
                path: origin.to_path_buf(),
                column: column.to_owned(),
            })
    };

    let code_idx = column_index("municipal_code")?;
    let name_idx = column_index("municipal_name")?;
    let geo_idx = column_index("geo-id")?;
    let year_idx = column_index("year")?;
    let crime_idx = column_index("crime_type")?;
    let total_idx = column_index("total_crime")?;
    let population_idx = column_index("population")?;

    fn parsed<T: FromStr>(raw: &str, column: &str, line: u64, origin: &Path) -> Result<T, StoreError>
    where
        T::Err: std::fmt::Display,
    {
        raw.parse().map_err(|e| {
            StoreError::unreadable(
                origin,
                format!("line {line}: invalid '{column}' value '{raw}': {e}"),
            )
        })
    }

    let mut records = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| StoreError::unreadable(origin, e))?;
        let line = record.position().map_or(0, csv::Position::line);

        let field = |idx: usize, column: &str| -> Result<&str, StoreError> {
            record.get(idx).ok_or_else(|| {
                StoreError::unreadable(origin, format!("line {line}: missing '{column}' field"))
            })
        };

        records.push(IncidentRecord {
            municipal_code: MunicipalCode::new(field(code_idx, "municipal_code")?),
            municipal_name: field(name_idx, "municipal_name")?.to_owned(),
            geo_id: field(geo_idx, "geo-id")?.to_owned(),
            year: parsed(field(year_idx, "year")?, "year", line, origin)?,
            crime_type: field(crime_idx, "crime_type")?.to_owned(),
            total_crime: parsed(field(total_idx, "total_crime")?, "total_crime", line, origin)?,
            population: parsed(field(population_idx, "population")?, "population", line, origin)?,
        });
    }

    Ok(records)
}

/// Parses the boundary GeoJSON into a feature collection.
///
/// The geometries are not transformed; they are kept verbatim for the
/// rendering layer to join on `geo-id`.
///
/// # Errors
///
/// Returns [`StoreError::SourceUnreadable`] when the document is not
/// valid GeoJSON, [`StoreError::SchemaMismatch`] when it is GeoJSON but
/// not a feature collection.
pub fn parse_boundaries(bytes: &[u8], origin: &Path) -> Result<FeatureCollection, StoreError> {
    let text = decode_text(bytes);
    let geojson = GeoJson::from_str(&text).map_err(|e| StoreError::unreadable(origin, e))?;

    match geojson {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        GeoJson::Feature(_) | GeoJson::Geometry(_) => Err(StoreError::SchemaMismatch {
            path: origin.to_path_buf(),
            column: "features".to_owned(),
        }),
    }
}

/// Derives the per-municipality reference rows: for each municipal code,
/// the name, geo id, and population of its latest observed year.
///
/// Ordered by municipal code; computed once at load, never per query.
#[must_use]
pub fn derive_municipalities(records: &[IncidentRecord]) -> Vec<MunicipalityMeta> {
    let mut latest: BTreeMap<&MunicipalCode, &IncidentRecord> = BTreeMap::new();

    for record in records {
        let newer = latest
            .get(&record.municipal_code)
            .is_none_or(|existing| record.year > existing.year);
        if newer {
            latest.insert(&record.municipal_code, record);
        }
    }

    latest
        .into_values()
        .map(|record| MunicipalityMeta {
            municipal_code: record.municipal_code.clone(),
            municipal_name: record.municipal_name.clone(),
            geo_id: record.geo_id.clone(),
            population: record.population,
            year: record.year,
        })
        .collect()
}
