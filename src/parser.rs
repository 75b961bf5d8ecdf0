//! CSV parser for city trip files.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::LoadError;
use crate::trip::{Column, Dataset, Schema, TripRecord};

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

/// A single row as it appears in the file. The unnamed index column and any
/// other unknown column are ignored.
#[derive(Debug, Deserialize)]
struct RawTrip {
    #[serde(rename = "Start Time")]
    start_time: String,
    #[serde(rename = "End Time")]
    end_time: String,
    #[serde(rename = "Trip Duration")]
    trip_duration: f64,
    #[serde(rename = "Start Station")]
    start_station: String,
    #[serde(rename = "End Station")]
    end_station: String,
    #[serde(rename = "User Type", default)]
    user_type: Option<String>,
    #[serde(rename = "Gender", default)]
    gender: Option<String>,
    #[serde(rename = "Birth Year", default)]
    birth_year: Option<f64>,
}

/// Reads a city file into a [`Dataset`].
///
/// # Errors
///
/// Fails if the file cannot be opened, a row does not decode, or a timestamp
/// cannot be parsed. No partial dataset is returned.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_city(path: &Path) -> Result<Dataset, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset = parse_trips(file)?;
    info!(rows = dataset.len(), schema = ?dataset.schema(), "Loaded city file");
    Ok(dataset)
}

/// Parses CSV trip rows from any reader.
pub fn parse_trips<R: Read>(reader: R) -> Result<Dataset, LoadError> {
    let mut rdr = csv::Reader::from_reader(reader);

    let headers = rdr.headers()?.clone();
    let has = |column: Column| headers.iter().any(|h| h.trim() == column.name());
    let schema = Schema {
        gender: has(Column::Gender),
        birth_year: has(Column::BirthYear),
    };
    debug!(?schema, "Detected optional columns");

    let mut records = Vec::new();
    for (idx, result) in rdr.deserialize().enumerate() {
        let raw: RawTrip = result?;
        // header is line 1
        let row = idx + 2;
        let start = parse_timestamp(&raw.start_time, row)?;
        let end = parse_timestamp(&raw.end_time, row)?;

        let record = TripRecord::new(
            start,
            end,
            raw.start_station,
            raw.end_station,
            raw.trip_duration,
            non_blank(raw.user_type),
        )
        .with_gender(non_blank(raw.gender))
        .with_birth_year(raw.birth_year.filter(|y| y.is_finite()).map(|y| y as i32));
        records.push(record);
    }

    Ok(Dataset::new(schema, records))
}

fn parse_timestamp(value: &str, row: usize) -> Result<NaiveDateTime, LoadError> {
    let trimmed = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| LoadError::Timestamp {
            row,
            value: value.to_string(),
        })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
