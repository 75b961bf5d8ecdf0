//! Trip records and the datasets built from them.
//!
//! A [`Dataset`] is an ordered, immutable sequence of [`TripRecord`]s that
//! share a [`Schema`]. Columns are addressed through [`Column`] and read as
//! dynamically typed [`Value`]s so the statistics calculator can work over
//! any of them.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::error::StatsError;

/// A column of the trip table, including the derived time columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Column {
    StartTime,
    EndTime,
    TripDuration,
    StartStation,
    EndStation,
    UserType,
    Gender,
    BirthYear,
    Month,
    Weekday,
    StartHour,
    EndHour,
}

impl Column {
    /// Header name as it appears in the city files and in reports.
    pub fn name(&self) -> &'static str {
        match self {
            Column::StartTime => "Start Time",
            Column::EndTime => "End Time",
            Column::TripDuration => "Trip Duration",
            Column::StartStation => "Start Station",
            Column::EndStation => "End Station",
            Column::UserType => "User Type",
            Column::Gender => "Gender",
            Column::BirthYear => "Birth Year",
            Column::Month => "Month",
            Column::Weekday => "Weekday",
            Column::StartHour => "Start Hour",
            Column::EndHour => "End Hour",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single cell value.
///
/// Floats compare and hash by their IEEE total order so values can be used
/// as grouping keys.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Time(NaiveDateTime),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Int(_) => 0,
            Value::Float(_) => 1,
            Value::Text(_) => 2,
            Value::Time(_) => 3,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Time(a), Value::Time(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
            Value::Time(t) => t.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
            Value::Time(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

/// Dataset-level presence of the optional columns, fixed at load time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub gender: bool,
    pub birth_year: bool,
}

impl Schema {
    pub fn full() -> Self {
        Schema {
            gender: true,
            birth_year: true,
        }
    }

    pub fn has(&self, column: Column) -> bool {
        match column {
            Column::Gender => self.gender,
            Column::BirthYear => self.birth_year,
            _ => true,
        }
    }
}

/// One bike-share ride. Derived time fields are computed in [`TripRecord::new`]
/// and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TripRecord {
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    start_station: String,
    end_station: String,
    trip_duration: f64,
    user_type: Option<String>,
    gender: Option<String>,
    birth_year: Option<i32>,

    month: u32,
    weekday: u32,
    start_hour: u32,
    end_hour: u32,
}

impl TripRecord {
    pub fn new(
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        start_station: impl Into<String>,
        end_station: impl Into<String>,
        trip_duration: f64,
        user_type: Option<String>,
    ) -> Self {
        TripRecord {
            start_time,
            end_time,
            start_station: start_station.into(),
            end_station: end_station.into(),
            trip_duration,
            user_type,
            gender: None,
            birth_year: None,
            month: start_time.month(),
            weekday: start_time.weekday().num_days_from_monday(),
            start_hour: start_time.hour(),
            end_hour: end_time.hour(),
        }
    }

    /// Attach the rider's gender (blank cells stay `None`).
    pub fn with_gender(mut self, gender: Option<String>) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_birth_year(mut self, birth_year: Option<i32>) -> Self {
        self.birth_year = birth_year;
        self
    }

    pub fn start_time(&self) -> NaiveDateTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveDateTime {
        self.end_time
    }

    pub fn start_station(&self) -> &str {
        &self.start_station
    }

    pub fn end_station(&self) -> &str {
        &self.end_station
    }

    pub fn trip_duration(&self) -> f64 {
        self.trip_duration
    }

    pub fn user_type(&self) -> Option<&str> {
        self.user_type.as_deref()
    }

    pub fn gender(&self) -> Option<&str> {
        self.gender.as_deref()
    }

    pub fn birth_year(&self) -> Option<i32> {
        self.birth_year
    }

    /// Month of the start time, 1 = January.
    pub fn month(&self) -> u32 {
        self.month
    }

    /// Weekday of the start time, 0 = Monday.
    pub fn weekday(&self) -> u32 {
        self.weekday
    }

    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u32 {
        self.end_hour
    }

    /// Reads a cell. `None` means a null cell.
    pub fn value(&self, column: Column) -> Option<Value> {
        match column {
            Column::StartTime => Some(Value::Time(self.start_time)),
            Column::EndTime => Some(Value::Time(self.end_time)),
            Column::TripDuration => Some(Value::Float(self.trip_duration)),
            Column::StartStation => Some(Value::Text(self.start_station.clone())),
            Column::EndStation => Some(Value::Text(self.end_station.clone())),
            Column::UserType => self.user_type.clone().map(Value::Text),
            Column::Gender => self.gender.clone().map(Value::Text),
            Column::BirthYear => self.birth_year.map(|y| Value::Int(y as i64)),
            Column::Month => Some(Value::Int(self.month as i64)),
            Column::Weekday => Some(Value::Int(self.weekday as i64)),
            Column::StartHour => Some(Value::Int(self.start_hour as i64)),
            Column::EndHour => Some(Value::Int(self.end_hour as i64)),
        }
    }
}

/// An ordered, immutable sequence of trips sharing one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    schema: Schema,
    records: Vec<TripRecord>,
}

impl Dataset {
    /// Builds a dataset. Optional columns absent from `schema` are cleared on
    /// every record so presence is a dataset-wide property.
    pub fn new(schema: Schema, records: Vec<TripRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|mut r| {
                if !schema.gender {
                    r.gender = None;
                }
                if !schema.birth_year {
                    r.birth_year = None;
                }
                r
            })
            .collect();
        Dataset { schema, records }
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub fn records(&self) -> &[TripRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns a new dataset holding the rows that satisfy `keep`, in order.
    pub fn retain<F>(&self, mut keep: F) -> Dataset
    where
        F: FnMut(&TripRecord) -> bool,
    {
        Dataset {
            schema: self.schema,
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Iterates `(row index, value)` for the non-null cells of `column`.
    pub fn values(
        &self,
        column: Column,
    ) -> Result<impl Iterator<Item = (usize, Value)> + '_, StatsError> {
        if !self.schema.has(column) {
            return Err(StatsError::UnknownColumn(column.name().to_string()));
        }
        Ok(self
            .records
            .iter()
            .enumerate()
            .filter_map(move |(i, r)| r.value(column).map(|v| (i, v))))
    }
}
