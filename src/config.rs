//! City catalog and run configuration.
//!
//! The catalog lists the known cities and the months offered for filtering.
//! It is built in, or loaded from a JSON file:
//! ```json
//! {
//!   "cities": [
//!     { "name": "Chicago", "file": "chicago.csv" },
//!     { "name": "Washington", "file": "washington.csv" }
//!   ],
//!   "months": [1, 2, 3, 4, 5, 6]
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{Month, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::filter::{FilterKind, FilterSpec, month_from_number, weekday_from_index};

/// A city and the CSV file holding its trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub file: String,
}

impl City {
    pub fn new(name: &str, file: &str) -> Self {
        City {
            name: name.to_string(),
            file: file.to_string(),
        }
    }

    /// Path of the city file under `data_dir`.
    pub fn path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.file)
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    cities: Vec<City>,
    #[serde(default = "default_month_numbers")]
    months: Vec<u32>,
}

fn default_month_numbers() -> Vec<u32> {
    (1..=6).collect()
}

/// Known cities plus the month and weekday choices offered to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    cities: Vec<City>,
    months: Vec<Month>,
    weekdays: Vec<Weekday>,
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog {
            cities: vec![
                City::new("Chicago", "chicago.csv"),
                City::new("New York City", "new_york_city.csv"),
                City::new("Washington", "washington.csv"),
            ],
            months: default_month_numbers()
                .into_iter()
                .filter_map(month_from_number)
                .collect(),
            weekdays: all_weekdays(),
        }
    }
}

fn all_weekdays() -> Vec<Weekday> {
    (0..7).filter_map(weekday_from_index).collect()
}

impl Catalog {
    /// Builds a catalog, checking there is at least one city, city names
    /// are unique and months are within 1..=12.
    pub fn new(cities: Vec<City>, month_numbers: &[u32]) -> Result<Self, ConfigError> {
        if cities.is_empty() {
            return Err(ConfigError::InvalidCatalog("no cities listed".into()));
        }
        let mut seen = HashSet::new();
        for city in &cities {
            if !seen.insert(city.name.to_lowercase()) {
                return Err(ConfigError::InvalidCatalog(format!(
                    "city \"{}\" listed twice",
                    city.name
                )));
            }
        }
        if month_numbers.is_empty() {
            return Err(ConfigError::InvalidCatalog("no months offered".into()));
        }
        let mut months = Vec::with_capacity(month_numbers.len());
        for n in month_numbers {
            let month = month_from_number(*n).ok_or_else(|| {
                ConfigError::InvalidCatalog(format!("month {n} is outside 1..=12"))
            })?;
            if !months.contains(&month) {
                months.push(month);
            }
        }
        Ok(Catalog {
            cities,
            months,
            weekdays: all_weekdays(),
        })
    }

    /// Loads the catalog from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::CatalogIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile = serde_json::from_str(content)?;
        Self::new(file.cities, &file.months)
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn months(&self) -> &[Month] {
        &self.months
    }

    pub fn weekdays(&self) -> &[Weekday] {
        &self.weekdays
    }

    pub fn default_city(&self) -> &City {
        &self.cities[0]
    }

    /// Case-insensitive lookup by city name.
    pub fn city(&self, name: &str) -> Result<&City, ConfigError> {
        self.cities
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| ConfigError::UnknownCity {
                name: name.to_string(),
                known: self.city_names().join(", "),
            })
    }

    pub fn city_names(&self) -> Vec<&str> {
        self.cities.iter().map(|c| c.name.as_str()).collect()
    }

    /// Parses a month name ("March", "mar") and checks it is offered.
    pub fn month(&self, name: &str) -> Result<Month, ConfigError> {
        let month: Month = name
            .trim()
            .parse()
            .map_err(|_| ConfigError::UnknownMonth(name.to_string()))?;
        if !self.months.contains(&month) {
            return Err(ConfigError::MonthNotOffered {
                name: month.name().to_string(),
                offered: self
                    .months
                    .iter()
                    .map(|m| m.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        Ok(month)
    }

    pub fn weekday(&self, name: &str) -> Result<Weekday, ConfigError> {
        name.trim()
            .parse()
            .map_err(|_| ConfigError::UnknownWeekday(name.to_string()))
    }
}

/// Everything one analysis run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub city: City,
    pub filter: FilterSpec,
    pub interactive: bool,
}

impl Configuration {
    /// Default configuration: first city, no filter.
    pub fn new(catalog: &Catalog, interactive: bool) -> Self {
        Configuration {
            city: catalog.default_city().clone(),
            filter: FilterSpec::None,
            interactive,
        }
    }

    /// Resolves a non-interactive configuration from command-line values.
    ///
    /// A filter that needs a month or weekday fails if the flag is absent;
    /// a flag the filter does not use is validated but otherwise ignored.
    pub fn from_args(
        catalog: &Catalog,
        city: Option<&str>,
        kind: FilterKind,
        month: Option<&str>,
        weekday: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let city = match city {
            Some(name) => catalog.city(name)?.clone(),
            None => catalog.default_city().clone(),
        };
        let month = month.map(|m| catalog.month(m)).transpose()?;
        let weekday = weekday.map(|d| catalog.weekday(d)).transpose()?;

        let require_month = || {
            month.ok_or(ConfigError::MissingFlag {
                filter: kind.label(),
                flag: "month",
            })
        };
        let require_weekday = || {
            weekday.ok_or(ConfigError::MissingFlag {
                filter: kind.label(),
                flag: "weekday",
            })
        };

        let filter = match kind {
            FilterKind::None => FilterSpec::None,
            FilterKind::Month => FilterSpec::Month(require_month()?),
            FilterKind::Day => FilterSpec::Weekday(require_weekday()?),
            FilterKind::Both => FilterSpec::Both(require_month()?, require_weekday()?),
        };

        Ok(Configuration {
            city,
            filter,
            interactive: false,
        })
    }

    pub fn describe(&self) -> String {
        format!("{} with filter {}", self.city.name, self.filter)
    }
}

/// Every non-interactive configuration the `test` sweep runs for one city:
/// no filter, each month, each weekday, then each month and weekday pair.
pub fn sweep(catalog: &Catalog, city: &City) -> Vec<Configuration> {
    let mut filters = vec![FilterSpec::None];
    filters.extend(catalog.months().iter().map(|m| FilterSpec::Month(*m)));
    filters.extend(catalog.weekdays().iter().map(|d| FilterSpec::Weekday(*d)));
    for m in catalog.months() {
        filters.extend(catalog.weekdays().iter().map(|d| FilterSpec::Both(*m, *d)));
    }
    filters
        .into_iter()
        .map(|filter| Configuration {
            city: city.clone(),
            filter,
            interactive: false,
        })
        .collect()
}
