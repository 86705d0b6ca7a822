use super::cell::{excel_serial, Cell};
use super::TemplateTable;
use crate::domain::error::{AppError, Result};
use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::Path;

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const DURATION_FORMAT: &str = "[h]:mm:ss";

fn write_err(e: XlsxError) -> AppError {
    AppError::Internal(format!("Failed to build Excel workbook: {}", e))
}

/// Reads the first worksheet; the first row is the header.
pub(super) fn read(path: &Path) -> Result<TemplateTable> {
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(|e| {
        AppError::ParseError(format!(
            "Failed to open Excel file {}: {}",
            path.display(),
            e
        ))
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| {
            AppError::ParseError(format!("No worksheet found in {}", path.display()))
        })?
        .map_err(|e| {
            AppError::ParseError(format!(
                "Failed to read Excel range {}: {}",
                path.display(),
                e
            ))
        })?;

    let mut rows = range.rows();
    let columns: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .enumerate()
            .map(|(index, cell)| {
                let name = to_cell(cell).to_string();
                if name.trim().is_empty() {
                    format!("Unnamed: {}", index)
                } else {
                    name
                }
            })
            .collect(),
        None => Vec::new(),
    };

    let body = rows.map(|row| row.iter().map(to_cell).collect()).collect();

    Ok(TemplateTable::new(columns, body))
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(text) => Cell::from(text.as_str()),
        Data::Float(value) => Cell::Number(*value),
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Bool(flag) => Cell::Bool(*flag),
        Data::DateTime(value) if value.is_duration() => Cell::Duration(value.as_f64()),
        // Re-based through chrono so 1904-system workbooks land on the same date.
        Data::DateTime(value) => Cell::DateTime(
            value
                .as_datetime()
                .map(excel_serial)
                .unwrap_or_else(|| value.as_f64()),
        ),
        other => Cell::Text(other.to_string()),
    }
}

pub(super) fn to_bytes(table: &TemplateTable) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format(DATE_FORMAT);
    let datetime_format = Format::new().set_num_format(DATETIME_FORMAT);
    let duration_format = Format::new().set_num_format(DURATION_FORMAT);
    let worksheet = workbook.add_worksheet();

    for (col, name) in table.columns().iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, name.as_str(), &header_format)
            .map_err(write_err)?;
    }

    for (row_index, row) in table.rows().iter().enumerate() {
        let row_number = (row_index + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            let written = match cell {
                Cell::Empty => continue,
                Cell::Text(text) => worksheet.write_string(row_number, col, text.as_str()),
                Cell::Number(value) => worksheet.write_number(row_number, col, *value),
                Cell::Bool(flag) => worksheet.write_boolean(row_number, col, *flag),
                Cell::DateTime(serial) if serial.fract() == 0.0 => {
                    worksheet.write_number_with_format(row_number, col, *serial, &date_format)
                }
                Cell::DateTime(serial) => {
                    worksheet.write_number_with_format(row_number, col, *serial, &datetime_format)
                }
                Cell::Duration(days) => {
                    worksheet.write_number_with_format(row_number, col, *days, &duration_format)
                }
            };
            written.map_err(write_err)?;
        }
    }

    workbook.save_to_buffer().map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_written_workbook_reads_back_cell_for_cell() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.xlsx");
        let table = TemplateTable::new(
            vec![
                "Test Key".to_string(),
                "Title".to_string(),
                "Notes".to_string(),
                "Due".to_string(),
                "Effort".to_string(),
            ],
            vec![
                vec![
                    Cell::from("OLD-TC-001"),
                    Cell::from("Existing case"),
                    Cell::Empty,
                    Cell::DateTime(45296.0),
                    Cell::Duration(0.0625),
                ],
                vec![
                    Cell::from("OLD-TC-002"),
                    Cell::Empty,
                    Cell::from("keep me"),
                    Cell::DateTime(45296.5),
                    Cell::Number(3.0),
                ],
            ],
        );
        fs::write(&path, to_bytes(&table).unwrap()).unwrap();

        let loaded = read(&path).unwrap();
        assert_eq!(loaded.columns(), table.columns());
        assert_eq!(loaded.rows(), table.rows());
    }

    #[test]
    fn test_to_cell_keeps_value_types() {
        assert_eq!(to_cell(&Data::Float(2.0)), Cell::Number(2.0));
        assert_eq!(to_cell(&Data::Int(7)), Cell::Number(7.0));
        assert_eq!(to_cell(&Data::Bool(false)), Cell::Bool(false));
        assert_eq!(to_cell(&Data::String(String::new())), Cell::Empty);
        assert_eq!(to_cell(&Data::Empty), Cell::Empty);
        assert_eq!(to_cell(&Data::Float(2.0)).to_string(), "2");
    }

    #[test]
    fn test_unreadable_workbook_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        fs::write(&path, b"not a zip archive").unwrap();
        assert!(matches!(read(&path), Err(AppError::ParseError(_))));
    }
}
