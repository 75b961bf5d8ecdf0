use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::analyzers::timing::{Timed, timed, timed_result};
use crate::analyzers::types::{Report, Share, Statistic, TripPair};
use crate::config::Configuration;
use crate::error::StatsError;
use crate::filter::{self, FilterSpec, month_from_number, weekday_from_index, weekday_name};
use crate::parser::load_city;
use crate::stats::{self, GroupCount};
use crate::trip::{Column, Dataset, Value};

/// Gender values broken out in the per-gender sections.
const GENDERS: [&str; 2] = ["Male", "Female"];

const STATION_PAIR: [Column; 2] = [Column::StartStation, Column::EndStation];

/// Loads the configured city from `data_dir`, filters it and computes the
/// report. Load failures and statistics failures end the run.
#[tracing::instrument(skip_all, fields(city = %config.city.name, filter = %config.filter))]
pub fn analyze(config: &Configuration, data_dir: &Path) -> Result<Report> {
    let path = config.city.path(data_dir);
    let (dataset, load_secs) = timed(|| load_city(&path));
    let dataset = dataset.with_context(|| format!("loading {}", path.display()))?;

    let mut report = analyze_dataset(&dataset, config)?;
    report.load_secs = load_secs;
    Ok(report)
}

/// Filters an already loaded dataset and computes the report for it.
pub fn analyze_dataset(dataset: &Dataset, config: &Configuration) -> Result<Report> {
    let filtered = filter::apply(dataset, &config.filter);
    let statistics = compute_statistics(&filtered, &config.filter)
        .with_context(|| format!("analyzing {}", config.describe()))?;

    info!(
        rows = filtered.len(),
        statistics = statistics.len(),
        "Analysis complete"
    );

    Ok(Report {
        city: config.city.name.clone(),
        file: config.city.file.clone(),
        filter: config.filter.to_string(),
        rows: filtered.len(),
        load_secs: 0.0,
        statistics,
    })
}

/// Computes every statistic that applies to `dataset` under `filter`, in
/// report order. Optional sections are skipped when their column is absent.
pub fn compute_statistics(
    dataset: &Dataset,
    filter: &FilterSpec,
) -> Result<Vec<Timed<Statistic>>, StatsError> {
    let mut out = Vec::new();

    // popular times of travel
    if filter.month_varies() {
        out.push(measure(|| {
            let month = stats::mode(dataset, Column::Month)?;
            Ok(Statistic::PopularMonth {
                month: month_label(&month),
            })
        })?);
    }
    if filter.weekday_varies() {
        out.push(measure(|| {
            let weekday = stats::mode(dataset, Column::Weekday)?;
            Ok(Statistic::PopularWeekday {
                weekday: weekday_label(&weekday),
            })
        })?);
    }
    out.push(measure(|| {
        Ok(Statistic::PopularStartHour {
            hour: int_of(stats::mode(dataset, Column::StartHour)?),
        })
    })?);
    out.push(measure(|| {
        Ok(Statistic::PopularEndHour {
            hour: int_of(stats::mode(dataset, Column::EndHour)?),
        })
    })?);

    // stations and trips
    out.push(measure(|| {
        Ok(Statistic::PopularStartStation {
            station: stats::mode(dataset, Column::StartStation)?.to_string(),
        })
    })?);
    out.push(measure(|| {
        Ok(Statistic::PopularEndStation {
            station: stats::mode(dataset, Column::EndStation)?.to_string(),
        })
    })?);
    out.push(measure(|| {
        let top = stats::top_n_by_group(dataset, &STATION_PAIR, 1)?;
        Ok(Statistic::PopularTrip(first_pair(top)?))
    })?);
    out.push(measure(|| {
        let bottom = stats::bottom_n_by_group(dataset, &STATION_PAIR, 1)?;
        Ok(Statistic::UnpopularTrip(first_pair(bottom)?))
    })?);

    // trip duration
    out.push(measure(|| {
        Ok(Statistic::TotalDuration {
            seconds: stats::sum(dataset, Column::TripDuration)?,
        })
    })?);
    out.push(measure(|| {
        Ok(Statistic::MeanDuration {
            seconds: stats::mean(dataset, Column::TripDuration)?,
        })
    })?);
    out.push(measure(|| {
        let idx = stats::argmin(dataset, Column::TripDuration)?;
        Ok(Statistic::ShortestTrip {
            trip: stats::row_at(dataset, idx)?.clone(),
        })
    })?);
    out.push(measure(|| {
        let idx = stats::argmax(dataset, Column::TripDuration)?;
        Ok(Statistic::LongestTrip {
            trip: stats::row_at(dataset, idx)?.clone(),
        })
    })?);

    // users
    out.push(measure(|| {
        Ok(Statistic::UserTypeCounts {
            counts: shares(stats::value_counts(dataset, Column::UserType)?),
        })
    })?);
    out.push(measure(|| {
        Ok(Statistic::UserTypeRatio {
            ratios: shares(stats::ratio(dataset, Column::UserType)?),
        })
    })?);

    let schema = dataset.schema();
    if schema.gender {
        debug!("Gender column present");
        out.push(measure(|| {
            Ok(Statistic::GenderCounts {
                counts: shares(stats::value_counts(dataset, Column::Gender)?),
            })
        })?);
        out.push(measure(|| {
            Ok(Statistic::GenderRatio {
                ratios: shares(stats::ratio(dataset, Column::Gender)?),
            })
        })?);
        for gender in GENDERS {
            out.push(measure(|| {
                let best = gender_max(dataset, Column::StartStation, gender)?;
                Ok(Statistic::GenderTopStation {
                    gender: gender.to_string(),
                    station: best.as_ref().map(|(v, _)| v.to_string()),
                    count: best.map_or(0, |(_, c)| c),
                })
            })?);
        }
        for gender in GENDERS {
            out.push(measure(|| {
                let best = gender_max(dataset, Column::StartHour, gender)?;
                Ok(Statistic::GenderTopHour {
                    gender: gender.to_string(),
                    hour: best.as_ref().and_then(|(v, _)| v.as_i64()),
                    count: best.map_or(0, |(_, c)| c),
                })
            })?);
        }
    }

    if schema.birth_year {
        debug!("Birth year column present");
        out.push(measure(|| {
            Ok(Statistic::YoungestBirthYear {
                year: birth_year(dataset, stats::max)?,
            })
        })?);
        out.push(measure(|| {
            Ok(Statistic::OldestBirthYear {
                year: birth_year(dataset, stats::min)?,
            })
        })?);
        out.push(measure(|| {
            Ok(Statistic::CommonBirthYear {
                year: birth_year(dataset, stats::mode)?,
            })
        })?);
    }

    Ok(out)
}

fn measure<F>(calculation: F) -> Result<Timed<Statistic>, StatsError>
where
    F: FnOnce() -> Result<Statistic, StatsError>,
{
    timed_result(calculation)
}

/// Most frequent value of `column` among riders of `gender`, with its count.
fn gender_max(
    dataset: &Dataset,
    column: Column,
    gender: &str,
) -> Result<Option<(Value, usize)>, StatsError> {
    let group = stats::max_in_group(
        dataset,
        &[Column::Gender, column],
        Column::Gender,
        &Value::from(gender),
    )?;
    Ok(group.and_then(|g| g.get(column).cloned().map(|v| (v, g.count))))
}

fn first_pair(groups: Vec<GroupCount>) -> Result<TripPair, StatsError> {
    let group = groups
        .into_iter()
        .next()
        .ok_or(StatsError::EmptyColumn(Column::StartStation))?;
    let station = |c: Column| group.get(c).map(|v| v.to_string()).unwrap_or_default();
    Ok(TripPair {
        start_station: station(Column::StartStation),
        end_station: station(Column::EndStation),
        count: group.count,
    })
}

fn shares<T>(values: Vec<(Value, T)>) -> Vec<Share<T>> {
    values
        .into_iter()
        .map(|(label, value)| Share {
            label: label.to_string(),
            value,
        })
        .collect()
}

/// Reduces the birth years, or `None` if every remaining cell is blank.
fn birth_year(
    dataset: &Dataset,
    reduce: fn(&Dataset, Column) -> Result<Value, StatsError>,
) -> Result<Option<i64>, StatsError> {
    if !dataset.is_empty() && dataset.values(Column::BirthYear)?.next().is_none() {
        return Ok(None);
    }
    Ok(Some(int_of(reduce(dataset, Column::BirthYear)?)))
}

fn int_of(value: Value) -> i64 {
    value.as_i64().unwrap_or_default()
}

fn month_label(value: &Value) -> String {
    value
        .as_i64()
        .and_then(|n| u32::try_from(n).ok())
        .and_then(month_from_number)
        .map(|m| m.name().to_string())
        .unwrap_or_else(|| value.to_string())
}

fn weekday_label(value: &Value) -> String {
    value
        .as_i64()
        .and_then(|n| u32::try_from(n).ok())
        .and_then(weekday_from_index)
        .map(|d| weekday_name(d).to_string())
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::City;
    use crate::trip::{Schema, TripRecord};
    use chrono::{Month, NaiveDate, NaiveDateTime, Weekday};

    fn names(stats: &[Timed<Statistic>]) -> Vec<&'static str> {
        stats
            .iter()
            .map(|s| match &s.value {
                Statistic::PopularMonth { .. } => "month",
                Statistic::PopularWeekday { .. } => "weekday",
                Statistic::PopularStartHour { .. } => "start_hour",
                Statistic::PopularEndHour { .. } => "end_hour",
                Statistic::PopularStartStation { .. } => "start_station",
                Statistic::PopularEndStation { .. } => "end_station",
                Statistic::PopularTrip(_) => "popular_trip",
                Statistic::UnpopularTrip(_) => "unpopular_trip",
                Statistic::TotalDuration { .. } => "total",
                Statistic::MeanDuration { .. } => "mean",
                Statistic::ShortestTrip { .. } => "shortest",
                Statistic::LongestTrip { .. } => "longest",
                Statistic::UserTypeCounts { .. } => "user_counts",
                Statistic::UserTypeRatio { .. } => "user_ratio",
                Statistic::GenderCounts { .. } => "gender_counts",
                Statistic::GenderRatio { .. } => "gender_ratio",
                Statistic::GenderTopStation { .. } => "gender_station",
                Statistic::GenderTopHour { .. } => "gender_hour",
                Statistic::YoungestBirthYear { .. } => "youngest",
                Statistic::OldestBirthYear { .. } => "oldest",
                Statistic::CommonBirthYear { .. } => "common_year",
            })
            .collect()
    }

    #[test]
    fn test_no_filter_computes_month_and_weekday() {
        let stats = compute_statistics(&sample(Schema::default()), &FilterSpec::None).unwrap();
        let n = names(&stats);
        assert_eq!(&n[..2], &["month", "weekday"]);
        assert_eq!(n.len(), 14);
    }

    #[test]
    fn test_month_filter_skips_popular_month() {
        let stats =
            compute_statistics(&sample(Schema::default()), &FilterSpec::Month(Month::March))
                .unwrap();
        let n = names(&stats);
        assert!(!n.contains(&"month"));
        assert!(n.contains(&"weekday"));
    }

    #[test]
    fn test_day_filter_skips_popular_weekday() {
        let stats =
            compute_statistics(&sample(Schema::default()), &FilterSpec::Weekday(Weekday::Wed))
                .unwrap();
        let n = names(&stats);
        assert!(n.contains(&"month"));
        assert!(!n.contains(&"weekday"));
    }

    #[test]
    fn test_both_filter_skips_month_and_weekday() {
        let filter = FilterSpec::Both(Month::March, Weekday::Wed);
        let stats = compute_statistics(&sample(Schema::default()), &filter).unwrap();
        let n = names(&stats);
        assert_eq!(n[0], "start_hour");
    }

    #[test]
    fn test_optional_sections_follow_schema() {
        let stats = compute_statistics(&sample(Schema::full()), &FilterSpec::None).unwrap();
        let n = names(&stats);
        assert_eq!(n.iter().filter(|s| **s == "gender_station").count(), 2);
        assert_eq!(n.iter().filter(|s| **s == "gender_hour").count(), 2);
        assert!(n.contains(&"youngest"));
        assert_eq!(n.len(), 14 + 6 + 3);
    }

    #[test]
    fn test_values_of_core_statistics() {
        let stats = compute_statistics(&sample(Schema::full()), &FilterSpec::None).unwrap();
        let find = |name: &str| {
            let idx = names(&stats).iter().position(|n| *n == name).unwrap();
            stats[idx].value.clone()
        };

        assert_eq!(
            find("month"),
            Statistic::PopularMonth {
                month: "March".into()
            }
        );
        assert_eq!(
            find("popular_trip"),
            Statistic::PopularTrip(TripPair {
                start_station: "A".into(),
                end_station: "B".into(),
                count: 2,
            })
        );
        assert_eq!(find("total"), Statistic::TotalDuration { seconds: 700.0 });
        match find("longest") {
            Statistic::LongestTrip { trip } => assert_eq!(trip.trip_duration(), 400.0),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            find("youngest"),
            Statistic::YoungestBirthYear { year: Some(1990) }
        );
        match find("gender_station") {
            Statistic::GenderTopStation { station, count, .. } => {
                assert_eq!(station.as_deref(), Some("A"));
                assert_eq!(count, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_gender_without_matching_riders() {
        let stats = compute_statistics(&sample(Schema::full()), &FilterSpec::None).unwrap();
        let female = stats.iter().find_map(|s| match &s.value {
            Statistic::GenderTopHour { gender, hour, count } if gender == "Female" => {
                Some((*hour, *count))
            }
            _ => None,
        });
        assert_eq!(female, Some((None, 0)));
    }

    #[test]
    fn test_blank_birth_years_do_not_fail_the_run() {
        let dataset = Dataset::new(
            Schema::full(),
            vec![
                trip((2017, 3, 15), "A", "B", 100.0),
                trip((2017, 3, 16), "A", "C", 300.0),
            ],
        );
        let stats = compute_statistics(&dataset, &FilterSpec::None).unwrap();
        let years: Vec<_> = stats
            .iter()
            .filter_map(|s| match s.value {
                Statistic::YoungestBirthYear { year }
                | Statistic::OldestBirthYear { year }
                | Statistic::CommonBirthYear { year } => Some(year),
                _ => None,
            })
            .collect();
        assert_eq!(years, vec![None, None, None]);
    }

    #[test]
    fn test_empty_after_filter_is_an_error() {
        let config = Configuration {
            city: City::new("Test", "test.csv"),
            filter: FilterSpec::Month(Month::December),
            interactive: false,
        };
        let err = analyze_dataset(&sample(Schema::default()), &config).unwrap_err();
        let stats_err = err.downcast_ref::<StatsError>().unwrap();
        assert!(matches!(stats_err, StatsError::EmptyColumn(_)));
    }

    fn sample(schema: Schema) -> Dataset {
        // 2017-03-15 Wed, 2017-04-13 Thu
        Dataset::new(
            schema,
            vec![
                trip((2017, 3, 15), "A", "B", 100.0)
                    .with_gender(Some("Male".into()))
                    .with_birth_year(Some(1980)),
                trip((2017, 3, 15), "A", "B", 200.0)
                    .with_gender(Some("Male".into()))
                    .with_birth_year(Some(1990)),
                trip((2017, 4, 13), "C", "D", 400.0).with_birth_year(Some(1980)),
            ],
        )
    }

    fn trip(date: (i32, u32, u32), from: &str, to: &str, duration: f64) -> TripRecord {
        let start: NaiveDateTime = NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        TripRecord::new(start, start, from, to, duration, Some("Subscriber".into()))
    }
}
