use std::collections::{BTreeMap, HashSet};
use tracing::info;

use super::table::{is_missing, Table};
use crate::config::DataSplitConfig;
use crate::error::{DataVersionError, Result};

/// Row and cell counts from one cleanse
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanseReport {
    pub rows_in: usize,
    pub duplicates_removed: usize,
    pub unlabeled_removed: usize,
    pub cells_imputed: usize,
    pub rows_out: usize,
}

/// Read the raw CSV, clean it and write the cleansed CSV
pub fn cleanse_file(config: &DataSplitConfig) -> Result<CleanseReport> {
    let mut table = Table::read_csv(&config.raw_data_save_path)?;
    let report = cleanse(&mut table, config)?;
    table.write_csv(&config.cleansed_data_save_path)?;

    info!(
        path = %config.cleansed_data_save_path.display(),
        rows = report.rows_out,
        duplicates = report.duplicates_removed,
        unlabeled = report.unlabeled_removed,
        imputed = report.cells_imputed,
        "data cleansed"
    );
    Ok(report)
}

/// Clean a table in place.
///
/// Steps run in order: drop exact duplicate rows keeping the first, drop rows
/// without a label, lowercase and trim categorical values, fill numeric gaps
/// with the column median, fill categorical gaps with the most frequent value.
pub fn cleanse(table: &mut Table, config: &DataSplitConfig) -> Result<CleanseReport> {
    let label_idx = table.column_index(&config.label_col)?;
    let categorical = column_indices(table, &config.categorical_cols)?;
    let numeric = column_indices(table, &config.numeric_cols)?;

    let mut report = CleanseReport {
        rows_in: table.len(),
        ..CleanseReport::default()
    };

    let mut seen = HashSet::new();
    table.rows.retain(|row| seen.insert(row.clone()));
    report.duplicates_removed = report.rows_in - table.len();

    let before = table.len();
    table.rows.retain(|row| !is_missing(&row[label_idx]));
    report.unlabeled_removed = before - table.len();

    for &idx in &categorical {
        for row in &mut table.rows {
            if !is_missing(&row[idx]) {
                row[idx] = row[idx].trim().to_lowercase();
            }
        }
    }

    for &idx in &numeric {
        let median = column_median(table, idx)?;
        report.cells_imputed += fill_missing(table, idx, &median.to_string());
    }

    for &idx in &categorical {
        let mode = column_mode(table, idx)?;
        report.cells_imputed += fill_missing(table, idx, &mode);
    }

    report.rows_out = table.len();
    Ok(report)
}

fn column_indices(table: &Table, names: &[String]) -> Result<Vec<usize>> {
    names.iter().map(|name| table.column_index(name)).collect()
}

fn fill_missing(table: &mut Table, idx: usize, value: &str) -> usize {
    let mut filled = 0;
    for row in &mut table.rows {
        if is_missing(&row[idx]) {
            row[idx] = value.to_string();
            filled += 1;
        }
    }
    filled
}

/// Median of the observed values in a numeric column
fn column_median(table: &Table, idx: usize) -> Result<f64> {
    let name = &table.columns[idx];
    let mut values = Vec::new();
    for row in &table.rows {
        if is_missing(&row[idx]) {
            continue;
        }
        let cell = row[idx].trim();
        let value: f64 = cell.parse().map_err(|_| {
            DataVersionError::data(format!(
                "Column '{}' is numeric but contains '{}'",
                name, cell
            ))
        })?;
        values.push(value);
    }

    if values.is_empty() {
        return Err(DataVersionError::data(format!(
            "Column '{}' has no observed values to impute from",
            name
        )));
    }

    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Ok(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Most frequent observed value; ties go to the smallest value
fn column_mode(table: &Table, idx: usize) -> Result<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in &table.rows {
        if !is_missing(&row[idx]) {
            *counts.entry(row[idx].as_str()).or_default() += 1;
        }
    }

    // BTreeMap iterates in ascending key order, so the first maximum wins ties
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }

    best.map(|(value, _)| value.to_string()).ok_or_else(|| {
        DataVersionError::data(format!(
            "Column '{}' has no observed values to impute from",
            table.columns[idx]
        ))
    })
}
