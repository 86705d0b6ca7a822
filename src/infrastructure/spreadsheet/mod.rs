//! Template merge engine: load a test case sheet (or start from the canonical
//! header), append freshly generated rows, and persist the combined table.

mod cell;
mod delimited;
mod xlsx;

pub use cell::Cell;

use crate::domain::error::{AppError, Result};
use crate::domain::test_case::{FormattedRecord, CANONICAL_COLUMNS};
use crate::infrastructure::storage::atomic_write_bytes;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Xlsx,
    Csv,
}

impl SheetFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("xlsx") | Some("xlsm") => Ok(SheetFormat::Xlsx),
            Some("csv") => Ok(SheetFormat::Csv),
            _ => Err(AppError::ValidationError(format!(
                "Unsupported spreadsheet format for {} (expected .xlsx or .csv)",
                path.display()
            ))),
        }
    }
}

/// Header plus typed cells; every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl TemplateTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        // Cells beyond the header get placeholder column names.
        let widest = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut columns = columns;
        for index in columns.len()..widest {
            columns.push(format!("Unnamed: {}", index));
        }
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(columns.len(), Cell::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Empty table with the 15 canonical columns.
    pub fn canonical() -> Self {
        Self::new(
            CANONICAL_COLUMNS.iter().map(|name| name.to_string()).collect(),
            Vec::new(),
        )
    }

    pub fn load(path: &Path) -> Result<Self> {
        match SheetFormat::from_path(path)? {
            SheetFormat::Xlsx => xlsx::read(path),
            SheetFormat::Csv => delimited::read(path),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let index = self.column_index(column)?;
        self.rows.get(row).map(|cells| &cells[index])
    }

    /// Text of a cell; `None` for typed (numeric, boolean, date) values.
    pub fn text(&self, row: usize, column: &str) -> Option<&str> {
        self.cell(row, column).and_then(Cell::as_text)
    }

    /// Appends one row per record after all existing rows.
    ///
    /// Canonical columns the table lacks are added to the end of the header and
    /// existing rows get empty cells for them.
    pub fn append_records(&mut self, records: &[FormattedRecord]) {
        for name in CANONICAL_COLUMNS {
            if self.column_index(name).is_none() {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(Cell::Empty);
                }
            }
        }

        let positions: Vec<usize> = CANONICAL_COLUMNS
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect();

        for record in records {
            let mut row = vec![Cell::Empty; self.columns.len()];
            for (position, value) in positions.iter().zip(record.values()) {
                row[*position] = Cell::from(value);
            }
            self.rows.push(row);
        }
    }

    pub fn to_bytes(&self, format: SheetFormat) -> Result<Vec<u8>> {
        match format {
            SheetFormat::Xlsx => xlsx::to_bytes(self),
            SheetFormat::Csv => delimited::to_bytes(self),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes(SheetFormat::from_path(path)?)?;
        atomic_write_bytes(path, &bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub template_loaded: bool,
    pub existing_rows: usize,
    pub appended_rows: usize,
    pub columns: usize,
}

/// Merges `records` into the template and writes the result to `output_path`.
/// Failures are logged and reported as `false`.
pub fn merge(template_path: &Path, output_path: &Path, records: &[FormattedRecord]) -> bool {
    merge_logged(template_path, output_path, records).is_some()
}

/// Like [`try_merge`], logging the result; failures come back as `None`.
pub fn merge_logged(
    template_path: &Path,
    output_path: &Path,
    records: &[FormattedRecord],
) -> Option<MergeReport> {
    match try_merge(template_path, output_path, records) {
        Ok(report) => {
            info!(
                output = %output_path.display(),
                existing_rows = report.existing_rows,
                appended_rows = report.appended_rows,
                "Saved test cases"
            );
            Some(report)
        }
        Err(err) => {
            error!(
                template = %template_path.display(),
                output = %output_path.display(),
                error = %err,
                "Failed to merge test cases into template"
            );
            None
        }
    }
}

pub fn try_merge(
    template_path: &Path,
    output_path: &Path,
    records: &[FormattedRecord],
) -> Result<MergeReport> {
    if records.is_empty() {
        return Err(AppError::ValidationError(
            "No test cases generated".to_string(),
        ));
    }
    let output_format = SheetFormat::from_path(output_path)?;

    let template_loaded = template_path.exists();
    let mut table = if template_loaded {
        let table = TemplateTable::load(template_path)?;
        info!(template = %template_path.display(), rows = table.len(), "Loaded template");
        table
    } else {
        info!(template = %template_path.display(), "Template not found, using canonical columns");
        TemplateTable::canonical()
    };

    let existing_rows = table.len();
    table.append_records(records);
    let bytes = table.to_bytes(output_format)?;
    atomic_write_bytes(output_path, &bytes)?;

    Ok(MergeReport {
        template_loaded,
        existing_rows,
        appended_rows: records.len(),
        columns: table.columns().len(),
    })
}
