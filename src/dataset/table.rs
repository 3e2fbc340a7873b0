use std::fs;
use std::path::Path;

use crate::error::{DataVersionError, Result};

/// Cell values read as missing, the same set pandas' `read_csv` uses.
///
/// Matched exactly: `" NA "` is an ordinary value.
const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Whether a raw cell value counts as missing
pub fn is_missing(value: &str) -> bool {
    MISSING_MARKERS.contains(&value)
}

/// An in-memory CSV table of string cells
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Table { columns, rows }
    }

    /// Read a CSV file with a header row
    ///
    /// Every record must have as many fields as the header.
    pub fn read_csv(path: &Path) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| {
                DataVersionError::data(format!("Cannot open {}: {}", path.display(), e))
            })?;

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if columns.is_empty() {
            return Err(DataVersionError::data(format!(
                "{} has no header row",
                path.display()
            )));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }

        Ok(Table { columns, rows })
    }

    /// Write the table as CSV with a header row, creating parent directories
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Index of a column by name
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DataVersionError::data(format!("Column '{}' not found", name)))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Move a column to the last position
    pub fn move_column_to_end(&mut self, name: &str) -> Result<()> {
        let idx = self.column_index(name)?;
        let column = self.columns.remove(idx);
        self.columns.push(column);
        for row in &mut self.rows {
            let cell = row.remove(idx);
            row.push(cell);
        }
        Ok(())
    }

    /// A table with the same columns and the rows at `indices`, in that order
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}
