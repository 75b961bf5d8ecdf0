//! Time-based narrowing of a dataset by month and/or weekday.

use std::fmt;

use chrono::{Month, Weekday};
use serde::Serialize;
use tracing::debug;

use crate::trip::Dataset;

/// The active filter. Month and weekday are typed, so an out-of-domain
/// value cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSpec {
    None,
    Month(Month),
    Weekday(Weekday),
    Both(Month, Weekday),
}

impl FilterSpec {
    pub fn kind(&self) -> FilterKind {
        match self {
            FilterSpec::None => FilterKind::None,
            FilterSpec::Month(_) => FilterKind::Month,
            FilterSpec::Weekday(_) => FilterKind::Day,
            FilterSpec::Both(_, _) => FilterKind::Both,
        }
    }

    pub fn month(&self) -> Option<Month> {
        match self {
            FilterSpec::Month(m) | FilterSpec::Both(m, _) => Some(*m),
            _ => None,
        }
    }

    pub fn weekday(&self) -> Option<Weekday> {
        match self {
            FilterSpec::Weekday(d) | FilterSpec::Both(_, d) => Some(*d),
            _ => None,
        }
    }

    /// Whether the month is still free to vary under this filter.
    pub fn month_varies(&self) -> bool {
        self.month().is_none()
    }

    pub fn weekday_varies(&self) -> bool {
        self.weekday().is_none()
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterSpec::None => f.write_str("None"),
            FilterSpec::Month(m) => write!(f, "Month ({})", m.name()),
            FilterSpec::Weekday(d) => write!(f, "Day ({})", weekday_name(*d)),
            FilterSpec::Both(m, d) => {
                write!(f, "Both ({}, {})", m.name(), weekday_name(*d))
            }
        }
    }
}

/// Filter type without its values, as chosen from a menu or a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
pub enum FilterKind {
    #[default]
    None,
    Month,
    Day,
    Both,
}

impl FilterKind {
    pub const ALL: [FilterKind; 4] = [
        FilterKind::None,
        FilterKind::Month,
        FilterKind::Day,
        FilterKind::Both,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FilterKind::None => "None",
            FilterKind::Month => "Month",
            FilterKind::Day => "Day",
            FilterKind::Both => "Both",
        }
    }

    /// Combines the kind with candidate values; the unused value is ignored.
    pub fn with_values(&self, month: Month, weekday: Weekday) -> FilterSpec {
        match self {
            FilterKind::None => FilterSpec::None,
            FilterKind::Month => FilterSpec::Month(month),
            FilterKind::Day => FilterSpec::Weekday(weekday),
            FilterKind::Both => FilterSpec::Both(month, weekday),
        }
    }
}

/// Applies `filter` and returns a new dataset; row order is preserved and
/// the input is left untouched. With `Both`, month is applied first.
pub fn apply(dataset: &Dataset, filter: &FilterSpec) -> Dataset {
    let filtered = match filter {
        FilterSpec::None => dataset.clone(),
        FilterSpec::Month(m) => by_month(dataset, *m),
        FilterSpec::Weekday(d) => by_weekday(dataset, *d),
        FilterSpec::Both(m, d) => by_weekday(&by_month(dataset, *m), *d),
    };
    debug!(
        %filter,
        rows_in = dataset.len(),
        rows_out = filtered.len(),
        "Filter applied"
    );
    filtered
}

fn by_month(dataset: &Dataset, month: Month) -> Dataset {
    let m = month.number_from_month();
    dataset.retain(|r| r.month() == m)
}

fn by_weekday(dataset: &Dataset, weekday: Weekday) -> Dataset {
    let d = weekday.num_days_from_monday();
    dataset.retain(|r| r.weekday() == d)
}

/// Month from its number, 1 = January.
pub fn month_from_number(n: u32) -> Option<Month> {
    let n = u8::try_from(n).ok()?;
    Month::try_from(n).ok()
}

/// Weekday from its index, 0 = Monday.
pub fn weekday_from_index(i: u32) -> Option<Weekday> {
    match i {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trip::{Schema, TripRecord};
    use chrono::{NaiveDate, NaiveDateTime};

    #[test]
    fn test_none_is_identity() {
        let ds = sample();
        assert_eq!(apply(&ds, &FilterSpec::None), ds);
    }

    #[test]
    fn test_month_keeps_only_that_month() {
        let ds = sample();
        let march = apply(&ds, &FilterSpec::Month(Month::March));
        assert_eq!(march.len(), 3);
        assert!(march.records().iter().all(|r| r.month() == 3));
    }

    #[test]
    fn test_weekday_keeps_only_that_day() {
        let ds = sample();
        let wed = apply(&ds, &FilterSpec::Weekday(Weekday::Wed));
        assert_eq!(wed.len(), 2);
        assert!(wed.records().iter().all(|r| r.weekday() == 2));
    }

    #[test]
    fn test_both_is_intersection() {
        // one row matches both, two match only the month
        let ds = sample();
        let both = apply(&ds, &FilterSpec::Both(Month::March, Weekday::Wed));
        assert_eq!(both.len(), 1);
        assert_eq!(both.records()[0].start_station(), "wed-march");
    }

    #[test]
    fn test_filter_preserves_order_and_input() {
        let ds = sample();
        let before = ds.clone();
        let march = apply(&ds, &FilterSpec::Month(Month::March));
        let stations: Vec<_> = march.records().iter().map(|r| r.start_station()).collect();
        assert_eq!(stations, vec!["wed-march", "thu-march", "fri-march"]);
        assert_eq!(ds, before);
    }

    #[test]
    fn test_month_and_weekday_lookup() {
        assert_eq!(month_from_number(1), Some(Month::January));
        assert_eq!(month_from_number(12), Some(Month::December));
        assert_eq!(month_from_number(0), None);
        assert_eq!(month_from_number(13), None);
        assert_eq!(weekday_from_index(0), Some(Weekday::Mon));
        assert_eq!(weekday_from_index(6), Some(Weekday::Sun));
        assert_eq!(weekday_from_index(7), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(FilterSpec::None.to_string(), "None");
        assert_eq!(
            FilterSpec::Both(Month::June, Weekday::Sun).to_string(),
            "Both (June, Sunday)"
        );
    }

    fn sample() -> Dataset {
        // 2017-03-15 Wed, 2017-03-16 Thu, 2017-03-17 Fri, 2017-04-12 Wed
        let trips = vec![
            trip("wed-march", 2017, 3, 15),
            trip("thu-march", 2017, 3, 16),
            trip("fri-march", 2017, 3, 17),
            trip("wed-april", 2017, 4, 12),
        ];
        Dataset::new(Schema::default(), trips)
    }

    fn trip(station: &str, y: i32, m: u32, d: u32) -> TripRecord {
        let start: NaiveDateTime = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        TripRecord::new(start, start, station, "end", 300.0, Some("Subscriber".into()))
    }
}
