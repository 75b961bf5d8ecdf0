//! Data types produced by the analysis pipeline.

use serde::Serialize;

use crate::analyzers::timing::Timed;
use crate::trip::TripRecord;

/// A station pair and how often it was ridden.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripPair {
    pub start_station: String,
    pub end_station: String,
    pub count: usize,
}

/// A category label with its share of rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share<T> {
    pub label: String,
    pub value: T,
}

/// One computed statistic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "statistic", rename_all = "snake_case")]
pub enum Statistic {
    PopularMonth { month: String },
    PopularWeekday { weekday: String },
    PopularStartHour { hour: i64 },
    PopularEndHour { hour: i64 },
    PopularStartStation { station: String },
    PopularEndStation { station: String },
    PopularTrip(TripPair),
    UnpopularTrip(TripPair),
    TotalDuration { seconds: f64 },
    MeanDuration { seconds: f64 },
    ShortestTrip { trip: TripRecord },
    LongestTrip { trip: TripRecord },
    UserTypeCounts { counts: Vec<Share<usize>> },
    UserTypeRatio { ratios: Vec<Share<f64>> },
    GenderCounts { counts: Vec<Share<usize>> },
    GenderRatio { ratios: Vec<Share<f64>> },
    /// `station` is `None` when no rider of that gender remains.
    GenderTopStation {
        gender: String,
        station: Option<String>,
        count: usize,
    },
    GenderTopHour {
        gender: String,
        hour: Option<i64>,
        count: usize,
    },
    /// `None` when no remaining rider has a birth year.
    YoungestBirthYear { year: Option<i64> },
    OldestBirthYear { year: Option<i64> },
    CommonBirthYear { year: Option<i64> },
}

/// Full output of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub city: String,
    pub file: String,
    pub filter: String,
    pub rows: usize,
    pub load_secs: f64,
    pub statistics: Vec<Timed<Statistic>>,
}

impl Report {
    /// Whether any gender section was produced.
    pub fn has_gender_sections(&self) -> bool {
        self.statistics.iter().any(|s| {
            matches!(
                s.value,
                Statistic::GenderCounts { .. }
                    | Statistic::GenderRatio { .. }
                    | Statistic::GenderTopStation { .. }
                    | Statistic::GenderTopHour { .. }
            )
        })
    }

    pub fn has_birth_year_sections(&self) -> bool {
        self.statistics.iter().any(|s| {
            matches!(
                s.value,
                Statistic::YoungestBirthYear { .. }
                    | Statistic::OldestBirthYear { .. }
                    | Statistic::CommonBirthYear { .. }
            )
        })
    }
}
