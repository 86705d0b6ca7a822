use super::cell::Cell;
use super::TemplateTable;
use crate::domain::error::{AppError, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::path::Path;

pub(super) fn read(path: &Path) -> Result<TemplateTable> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| {
            AppError::IoError(format!("Failed to open CSV file {}: {}", path.display(), e))
        })?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
        .iter()
        .map(|header| header.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            AppError::ParseError(format!("Failed to parse CSV row {}: {}", index + 1, e))
        })?;
        rows.push(record.iter().map(Cell::from).collect());
    }

    Ok(TemplateTable::new(columns, rows))
}

pub(super) fn to_bytes(table: &TemplateTable) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(table.columns())
        .map_err(|e| AppError::Internal(format!("Failed to write CSV header: {}", e)))?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(Cell::to_string))
            .map_err(|e| AppError::Internal(format!("Failed to write CSV row: {}", e)))?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to flush CSV output: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_read_pads_short_rows_and_keeps_multiline_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.csv");
        fs::write(
            &path,
            "Test Key,Title,Test Steps\nA-TC-001,Login\nA-TC-002,Logout,\"1. Click\n2. Confirm\"\n",
        )
        .unwrap();

        let table = read(&path).unwrap();
        assert_eq!(table.columns(), ["Test Key", "Title", "Test Steps"]);
        assert_eq!(table.rows()[0], ["A-TC-001", "Login", ""]);
        assert_eq!(table.rows()[1][2], "1. Click\n2. Confirm");
    }

    #[test]
    fn test_bytes_quote_embedded_separators() {
        let table = TemplateTable::new(
            vec!["Title".to_string(), "Tags".to_string()],
            vec![vec![Cell::from("Say \"hi\""), Cell::from("smoke, regression")]],
        );
        let text = String::from_utf8(to_bytes(&table).unwrap()).unwrap();
        assert_eq!(text, "Title,Tags\n\"Say \"\"hi\"\"\",\"smoke, regression\"\n");
    }

    #[test]
    fn test_typed_cells_are_written_as_display_text() {
        let table = TemplateTable::new(
            vec!["Due".to_string(), "Points".to_string(), "Done".to_string()],
            vec![vec![Cell::DateTime(45296.0), Cell::Number(3.0), Cell::Bool(false)]],
        );
        let text = String::from_utf8(to_bytes(&table).unwrap()).unwrap();
        assert_eq!(text, "Due,Points,Done\n2024-01-05,3,false\n");
    }
}
