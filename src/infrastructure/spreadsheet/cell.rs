use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use std::fmt;

const MS_PER_DAY: f64 = 86_400_000.0;

/// A template cell with its spreadsheet type.
///
/// Dates and durations keep the Excel serial number (1900 date system) so they
/// are written back as the same value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(f64),
    Duration(f64),
}

impl Cell {
    /// Text content; `Some("")` for empty cells, `None` for typed values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Empty => Some(""),
            Cell::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

fn excel_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .unwrap_or_default()
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default()
}

/// Serial number of `value` in the 1900 date system.
pub fn excel_serial(value: NaiveDateTime) -> f64 {
    (value - excel_epoch()).num_milliseconds() as f64 / MS_PER_DAY
}

fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    let millis = (serial * MS_PER_DAY).round() as i64;
    excel_epoch().checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(text) => f.write_str(text),
            Cell::Number(value) => f.write_str(&format_number(*value)),
            Cell::Bool(flag) => write!(f, "{}", flag),
            Cell::DateTime(serial) => match serial_to_datetime(*serial) {
                Some(value) if serial.fract() == 0.0 => write!(f, "{}", value.format("%Y-%m-%d")),
                Some(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
                None => f.write_str(&format_number(*serial)),
            },
            Cell::Duration(days) => {
                let total = (days * 86_400.0).round() as i64;
                write!(f, "{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
            }
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }
}

impl PartialEq<str> for Cell {
    fn eq(&self, other: &str) -> bool {
        self.as_text() == Some(other)
    }
}

impl PartialEq<&str> for Cell {
    fn eq(&self, other: &&str) -> bool {
        self.as_text() == Some(*other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_comparison_treats_empty_as_blank_string() {
        assert_eq!(Cell::from(""), Cell::Empty);
        assert_eq!(Cell::Empty, "");
        assert_eq!(Cell::from("Login"), "Login");
        assert_ne!(Cell::Number(2.0), "2");
    }

    #[test]
    fn test_display_renders_typed_values() {
        assert_eq!(Cell::Number(2.0).to_string(), "2");
        assert_eq!(Cell::Number(2.5).to_string(), "2.5");
        assert_eq!(Cell::Bool(true).to_string(), "true");
        assert_eq!(Cell::DateTime(45296.0).to_string(), "2024-01-05");
        assert_eq!(Cell::DateTime(45296.5).to_string(), "2024-01-05 12:00:00");
        assert_eq!(Cell::Duration(1.5).to_string(), "36:00:00");
    }

    #[test]
    fn test_excel_serial_of_known_date() {
        let value = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(excel_serial(value), 45296.0);
    }
}
