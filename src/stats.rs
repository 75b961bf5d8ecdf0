//! Aggregations over a single column (or a tuple of columns) of a dataset.
//!
//! Every function here is read-only and deterministic. Ties are broken by
//! first encounter in row order: the value, row or group seen first wins.
//! Null cells are skipped; group keys containing a null are dropped.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::StatsError;
use crate::trip::{Column, Dataset, TripRecord, Value};

/// A group key (one value per grouping column) and the number of rows in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCount {
    pub columns: Vec<Column>,
    pub key: Vec<Value>,
    pub count: usize,
}

impl GroupCount {
    /// The key value for `column`, if it is one of the grouping columns.
    pub fn get(&self, column: Column) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| *c == column)
            .map(|i| &self.key[i])
    }
}

/// Checks the column is in the schema and the dataset has rows.
fn ensure_column(dataset: &Dataset, column: Column) -> Result<(), StatsError> {
    if !dataset.schema().has(column) {
        return Err(StatsError::UnknownColumn(column.name().to_string()));
    }
    if dataset.is_empty() {
        return Err(StatsError::EmptyColumn(column));
    }
    Ok(())
}

fn numeric_values(dataset: &Dataset, column: Column) -> Result<Vec<f64>, StatsError> {
    ensure_column(dataset, column)?;
    dataset
        .values(column)?
        .map(|(_, v)| v.as_f64().ok_or(StatsError::NonNumericColumn(column)))
        .collect()
}

/// Most frequent value of `column`.
pub fn mode(dataset: &Dataset, column: Column) -> Result<Value, StatsError> {
    value_counts(dataset, column)?
        .into_iter()
        .next()
        .map(|(v, _)| v)
        .ok_or(StatsError::EmptyColumn(column))
}

pub fn sum(dataset: &Dataset, column: Column) -> Result<f64, StatsError> {
    Ok(numeric_values(dataset, column)?.iter().sum())
}

pub fn mean(dataset: &Dataset, column: Column) -> Result<f64, StatsError> {
    let values = numeric_values(dataset, column)?;
    if values.is_empty() {
        return Err(StatsError::EmptyColumn(column));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn min(dataset: &Dataset, column: Column) -> Result<Value, StatsError> {
    let idx = argmin(dataset, column)?;
    row_value(dataset, idx, column)
}

pub fn max(dataset: &Dataset, column: Column) -> Result<Value, StatsError> {
    let idx = argmax(dataset, column)?;
    row_value(dataset, idx, column)
}

fn row_value(dataset: &Dataset, index: usize, column: Column) -> Result<Value, StatsError> {
    row_at(dataset, index)?
        .value(column)
        .ok_or(StatsError::EmptyColumn(column))
}

/// Row index of the smallest value; the first one wins on ties.
pub fn argmin(dataset: &Dataset, column: Column) -> Result<usize, StatsError> {
    extreme_index(dataset, column, |candidate, best| candidate < best)
}

/// Row index of the largest value; the first one wins on ties.
pub fn argmax(dataset: &Dataset, column: Column) -> Result<usize, StatsError> {
    extreme_index(dataset, column, |candidate, best| candidate > best)
}

fn extreme_index<F>(dataset: &Dataset, column: Column, better: F) -> Result<usize, StatsError>
where
    F: Fn(&Value, &Value) -> bool,
{
    ensure_column(dataset, column)?;
    let mut best: Option<(usize, Value)> = None;
    for (idx, value) in dataset.values(column)? {
        let replace = match &best {
            None => true,
            Some((_, current)) => better(&value, current),
        };
        if replace {
            best = Some((idx, value));
        }
    }
    best.map(|(idx, _)| idx).ok_or(StatsError::EmptyColumn(column))
}

/// Full record at a row index.
pub fn row_at(dataset: &Dataset, index: usize) -> Result<&TripRecord, StatsError> {
    dataset
        .records()
        .get(index)
        .ok_or(StatsError::RowOutOfRange {
            index,
            len: dataset.len(),
        })
}

/// Occurrences of each distinct value, most frequent first.
pub fn value_counts(dataset: &Dataset, column: Column) -> Result<Vec<(Value, usize)>, StatsError> {
    ensure_column(dataset, column)?;
    let mut counts: Vec<(Value, usize)> = Vec::new();
    let mut slots: HashMap<Value, usize> = HashMap::new();

    for (_, value) in dataset.values(column)? {
        match slots.get(&value) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                slots.insert(value.clone(), counts.len());
                counts.push((value, 1));
            }
        }
    }

    // stable: equal counts keep first-encounter order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(counts)
}

/// Like [`value_counts`] but as percentages of the non-null cells. A column
/// with no non-null cell gives an empty list.
pub fn ratio(dataset: &Dataset, column: Column) -> Result<Vec<(Value, f64)>, StatsError> {
    let counts = value_counts(dataset, column)?;
    let total: usize = counts.iter().map(|(_, c)| c).sum();
    Ok(counts
        .into_iter()
        .map(|(v, c)| (v, pct(c, total)))
        .collect())
}

pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Counts rows per distinct tuple of `columns`, in first-encounter order.
fn group_counts(dataset: &Dataset, columns: &[Column]) -> Result<Vec<GroupCount>, StatsError> {
    for column in columns {
        ensure_column(dataset, *column)?;
    }

    let mut groups: Vec<GroupCount> = Vec::new();
    let mut slots: HashMap<Vec<Value>, usize> = HashMap::new();

    for record in dataset.records() {
        let key: Option<Vec<Value>> = columns.iter().map(|c| record.value(*c)).collect();
        let Some(key) = key else {
            continue;
        };
        match slots.get(&key) {
            Some(&slot) => groups[slot].count += 1,
            None => {
                slots.insert(key.clone(), groups.len());
                groups.push(GroupCount {
                    columns: columns.to_vec(),
                    key,
                    count: 1,
                });
            }
        }
    }

    Ok(groups)
}

/// The `n` largest groups by row count.
pub fn top_n_by_group(
    dataset: &Dataset,
    columns: &[Column],
    n: usize,
) -> Result<Vec<GroupCount>, StatsError> {
    let mut groups = group_counts(dataset, columns)?;
    groups.sort_by(|a, b| b.count.cmp(&a.count));
    groups.truncate(n);
    Ok(groups)
}

/// The `n` smallest groups by row count.
pub fn bottom_n_by_group(
    dataset: &Dataset,
    columns: &[Column],
    n: usize,
) -> Result<Vec<GroupCount>, StatsError> {
    let mut groups = group_counts(dataset, columns)?;
    groups.sort_by(|a, b| a.count.cmp(&b.count));
    groups.truncate(n);
    Ok(groups)
}

/// Largest group among those whose `filter_column` equals `filter_value`.
///
/// `filter_column` must be one of `columns`. Returns `None` when no group
/// carries that value (for example no female riders after filtering).
pub fn max_in_group(
    dataset: &Dataset,
    columns: &[Column],
    filter_column: Column,
    filter_value: &Value,
) -> Result<Option<GroupCount>, StatsError> {
    let position = columns
        .iter()
        .position(|c| *c == filter_column)
        .ok_or(StatsError::ColumnNotGrouped(filter_column))?;

    let best = group_counts(dataset, columns)?
        .into_iter()
        .filter(|g| g.key[position] == *filter_value)
        .fold(None::<GroupCount>, |best, g| match best {
            Some(b) if b.count >= g.count => Some(b),
            _ => Some(g),
        });
    Ok(best)
}
