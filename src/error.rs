//! Error types shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::trip::Column;

/// Failures raised by the statistics calculator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    /// The dataset has no rows (or the column holds no non-null value).
    #[error("column \"{0}\" has no values to aggregate")]
    EmptyColumn(Column),

    /// The column is not part of the dataset's schema.
    #[error("column \"{0}\" is not available in this dataset")]
    UnknownColumn(String),

    /// A numeric reduction was requested on a text or timestamp column.
    #[error("column \"{0}\" is not numeric")]
    NonNumericColumn(Column),

    /// `max_in_group` was asked to narrow on a column it does not group by.
    #[error("column \"{0}\" is not one of the grouping columns")]
    ColumnNotGrouped(Column),

    #[error("row {index} is out of range for a dataset of {len} rows")]
    RowOutOfRange { index: usize, len: usize },
}

/// Failures while resolving a configuration from flags or a catalog file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown city \"{name}\" (known cities: {known})")]
    UnknownCity { name: String, known: String },

    #[error("unknown month \"{0}\"")]
    UnknownMonth(String),

    #[error("month \"{name}\" is not offered (offered months: {offered})")]
    MonthNotOffered { name: String, offered: String },

    #[error("unknown weekday \"{0}\"")]
    UnknownWeekday(String),

    #[error("filter \"{filter}\" requires --{flag}")]
    MissingFlag {
        filter: &'static str,
        flag: &'static str,
    },

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("failed to read catalog {path}: {source}")]
    CatalogIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    CatalogFormat(#[from] serde_json::Error),
}

/// Failures while reading a city file into a dataset.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: cannot parse \"{value}\" as a timestamp")]
    Timestamp { row: usize, value: String },
}
