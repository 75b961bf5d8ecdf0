//! Output formatting for analysis reports.
//!
//! Supports line-oriented text (each statistic prefixed with its duration)
//! and JSON serialization.

use std::io::{self, Write};

use anyhow::Result;
use tracing::debug;

use crate::analyzers::timing::Timed;
use crate::analyzers::types::{Report, Share, Statistic};
use crate::trip::TripRecord;

/// Writes a report as text, one sentence per statistic.
pub fn write_report<W: Write>(out: &mut W, report: &Report) -> io::Result<()> {
    debug!(statistics = report.statistics.len(), "Rendering report");
    writeln!(
        out,
        "\n({:.4}s) Loaded file {} ({} rows, filter: {}).",
        report.load_secs, report.file, report.rows, report.filter
    )?;
    for stat in &report.statistics {
        write_statistic(out, stat)?;
    }
    Ok(())
}

fn write_statistic<W: Write>(out: &mut W, stat: &Timed<Statistic>) -> io::Result<()> {
    let t = stat.elapsed_secs;
    match &stat.value {
        Statistic::PopularMonth { month } => {
            writeln!(out, "({t:.4}s) The most popular month for traveling is \"{month}\".")
        }
        Statistic::PopularWeekday { weekday } => {
            writeln!(out, "({t:.4}s) The most popular weekday for traveling is \"{weekday}\".")
        }
        Statistic::PopularStartHour { hour } => {
            writeln!(out, "({t:.4}s) The most popular hour for traveling is \"{hour}\".")
        }
        Statistic::PopularEndHour { hour } => {
            writeln!(out, "({t:.4}s) The most popular return hour is \"{hour}\".")
        }
        Statistic::PopularStartStation { station } => {
            writeln!(out, "({t:.4}s) The most popular start station is \"{station}\".")
        }
        Statistic::PopularEndStation { station } => {
            writeln!(out, "({t:.4}s) The most popular end station is \"{station}\".")
        }
        Statistic::PopularTrip(pair) => writeln!(
            out,
            "({t:.4}s) The most popular trip from start to end is from \"{}\" to \"{}\", which was taken {} times.",
            pair.start_station, pair.end_station, pair.count
        ),
        Statistic::UnpopularTrip(pair) => writeln!(
            out,
            "({t:.4}s) One of the most unpopular trips from start to end is from \"{}\" to \"{}\", which was only taken {} times.",
            pair.start_station, pair.end_station, pair.count
        ),
        Statistic::TotalDuration { seconds } => writeln!(
            out,
            "({t:.4}s) The total travel time is {}.",
            format_duration(*seconds)
        ),
        Statistic::MeanDuration { seconds } => writeln!(
            out,
            "({t:.4}s) The average travel time is {}.",
            format_duration(*seconds)
        ),
        Statistic::ShortestTrip { trip } => {
            writeln!(
                out,
                "({t:.4}s) The shortest trip is {}. Trip details are:",
                format_duration(trip.trip_duration())
            )?;
            write_record(out, trip)
        }
        Statistic::LongestTrip { trip } => {
            writeln!(
                out,
                "({t:.4}s) The longest trip is {}. Trip details are:",
                format_duration(trip.trip_duration())
            )?;
            write_record(out, trip)
        }
        Statistic::UserTypeCounts { counts } => {
            writeln!(out, "({t:.4}s) The different users are:")?;
            write_counts(out, counts)
        }
        Statistic::UserTypeRatio { ratios } => {
            writeln!(out, "({t:.4}s) This is a ratio of:")?;
            write_ratios(out, ratios)
        }
        Statistic::GenderCounts { counts } => {
            writeln!(out, "({t:.4}s) Differences of gender is:")?;
            write_counts(out, counts)
        }
        Statistic::GenderRatio { ratios } => {
            writeln!(out, "({t:.4}s) The gender ratio is:")?;
            write_ratios(out, ratios)
        }
        Statistic::GenderTopStation {
            gender,
            station,
            count,
        } => match station {
            Some(station) => writeln!(
                out,
                "({t:.4}s) {} most often start from \"{station}\" ({count} Times).",
                riders(gender)
            ),
            None => writeln!(out, "({t:.4}s) There are no {} riders.", gender.to_lowercase()),
        },
        Statistic::GenderTopHour {
            gender,
            hour,
            count,
        } => match hour {
            Some(hour) => writeln!(
                out,
                "({t:.4}s) {} most often start at \"{hour}\" o'clock ({count} Times).",
                riders(gender)
            ),
            None => writeln!(out, "({t:.4}s) There are no {} riders.", gender.to_lowercase()),
        },
        Statistic::YoungestBirthYear { year: Some(year) } => {
            writeln!(out, "({t:.4}s) The youngest rider was born in {year}.")
        }
        Statistic::OldestBirthYear { year: Some(year) } => {
            writeln!(out, "({t:.4}s) The oldest rider was born in {year}.")
        }
        Statistic::CommonBirthYear { year: Some(year) } => {
            writeln!(out, "({t:.4}s) The most common year of birth is {year}.")
        }
        Statistic::YoungestBirthYear { year: None }
        | Statistic::OldestBirthYear { year: None }
        | Statistic::CommonBirthYear { year: None } => {
            writeln!(out, "({t:.4}s) No birth years were recorded.")
        }
    }
}

fn riders(gender: &str) -> &str {
    match gender {
        "Male" => "Men",
        "Female" => "Women",
        other => other,
    }
}

fn write_counts<W: Write>(out: &mut W, counts: &[Share<usize>]) -> io::Result<()> {
    for share in counts {
        writeln!(out, "{}\t{}", share.label, share.value)?;
    }
    Ok(())
}

fn write_ratios<W: Write>(out: &mut W, ratios: &[Share<f64>]) -> io::Result<()> {
    for share in ratios {
        writeln!(out, "{}\t{:.2} %", share.label, share.value)?;
    }
    Ok(())
}

/// Writes every field of a trip, one `name<TAB>value` line each.
pub fn write_record<W: Write>(out: &mut W, trip: &TripRecord) -> io::Result<()> {
    let time = |t: chrono::NaiveDateTime| t.format("%Y-%m-%d %H:%M:%S").to_string();
    writeln!(out, "Start Time\t{}", time(trip.start_time()))?;
    writeln!(out, "End Time\t{}", time(trip.end_time()))?;
    writeln!(out, "Trip Duration\t{}", trip.trip_duration())?;
    writeln!(out, "Start Station\t{}", trip.start_station())?;
    writeln!(out, "End Station\t{}", trip.end_station())?;
    writeln!(out, "User Type\t{}", trip.user_type().unwrap_or("-"))?;
    if let Some(gender) = trip.gender() {
        writeln!(out, "Gender\t{gender}")?;
    }
    if let Some(year) = trip.birth_year() {
        writeln!(out, "Birth Year\t{year}")?;
    }
    writeln!(out, "Month\t{}", trip.month())?;
    writeln!(out, "Weekday\t{}", trip.weekday())?;
    writeln!(out, "Start Hour\t{}", trip.start_hour())?;
    writeln!(out, "End Hour\t{}", trip.end_hour())
}

/// Serializes a report as pretty-printed JSON.
pub fn write_json<W: Write>(out: &mut W, report: &Report) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

/// Renders seconds as `D days HH:MM:SS`, keeping any fractional seconds.
pub fn format_duration(seconds: f64) -> String {
    let negative = seconds < 0.0;
    let total = seconds.abs();
    let whole = total.trunc() as u64;
    let frac = total - total.trunc();

    let days = whole / 86_400;
    let hours = (whole % 86_400) / 3_600;
    let minutes = (whole % 3_600) / 60;
    let secs = whole % 60;

    let mut text = format!(
        "{}{days} days {hours:02}:{minutes:02}:{secs:02}",
        if negative { "-" } else { "" }
    );
    let micros = (frac * 1_000_000.0).round() as u64;
    if micros > 0 && micros < 1_000_000 {
        text.push_str(&format!(".{micros:06}"));
    }
    text
}
