use crate::helpers::xml::unescape_ooxml;
use calamine::Data;
use chrono::NaiveDateTime;
use std::fmt::Display;
use std::hash::Hash;
use std::hash::Hasher;

/// Largest magnitude printed without a fractional part.
const MAX_DISPLAY_INTEGER: f64 = 1e15;

/// A single cell value of a parsed sheet.
///
/// `Empty` doubles as the missing-value marker for columns a source table lacks.
/// Equality is total: `Empty == Empty`, `-0.0 == 0.0`, and every NaN equals every NaN,
/// so rows of values can be hashed for exact-duplicate detection.
#[derive(Clone, Debug, Default)]
pub enum CellValue {
    #[default]
    Empty,
    /// Boolean values (true/false)
    Bool(bool),
    /// Integer and floating point values
    Number(f64),
    /// Strings, ISO strings and error codes
    Text(String),
    /// Date-formatted serial numbers
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Returns true for the empty / missing value.
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Converts a cell read from an xlsx package, decoding `_xHHHH_` escapes in strings.
    pub(crate) fn from_ooxml(data: &Data) -> Self {
        match data {
            Data::String(value) => CellValue::Text(unescape_ooxml(value).into_owned()),
            other => CellValue::from(other),
        }
    }

    /// Bit pattern used for number equality and hashing.
    fn number_bits(value: f64) -> u64 {
        if value.is_nan() {
            f64::NAN.to_bits()
        } else if value == 0.0 {
            0.0f64.to_bits()
        } else {
            value.to_bits()
        }
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Empty, CellValue::Empty) => true,
            (CellValue::Bool(a), CellValue::Bool(b)) => a == b,
            (CellValue::Number(a), CellValue::Number(b)) => Self::number_bits(*a) == Self::number_bits(*b),
            (CellValue::Text(a), CellValue::Text(b)) => a == b,
            (CellValue::DateTime(a), CellValue::DateTime(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CellValue {}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            CellValue::Empty => 0u8.hash(state),
            CellValue::Bool(value) => {
                1u8.hash(state);
                value.hash(state);
            }
            CellValue::Number(value) => {
                2u8.hash(state);
                Self::number_bits(*value).hash(state);
            }
            CellValue::Text(value) => {
                3u8.hash(state);
                value.hash(state);
            }
            CellValue::DateTime(value) => {
                4u8.hash(state);
                value.hash(state);
            }
        }
    }
}

impl From<&Data> for CellValue {
    /// Converts a calamine cell into a merge value.
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::Bool(value) => CellValue::Bool(*value),
            Data::Int(value) => CellValue::Number(*value as f64),
            Data::Float(value) => CellValue::Number(*value),
            Data::String(value) => CellValue::Text(value.to_owned()),
            Data::DateTime(value) => {
                if value.is_datetime() {
                    value
                        .as_datetime()
                        .map(CellValue::DateTime)
                        .unwrap_or(CellValue::Number(value.as_f64()))
                } else {
                    // Durations keep their serial value
                    CellValue::Number(value.as_f64())
                }
            }
            Data::DateTimeIso(value) => CellValue::Text(value.to_owned()),
            Data::DurationIso(value) => CellValue::Text(value.to_owned()),
            Data::Error(error) => CellValue::Text(error.to_string()),
        }
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(value) => write!(f, "{}", value),
            CellValue::Number(value) if value.fract() == 0.0 && value.abs() < MAX_DISPLAY_INTEGER => {
                write!(f, "{}", *value as i64)
            }
            CellValue::Number(value) => write!(f, "{}", value),
            CellValue::Text(value) => write!(f, "{}", value),
            CellValue::DateTime(value) => write!(f, "{}", value),
        }
    }
}

/// Days between the 1900 date system epoch (1899-12-30) and the Unix epoch.
const UNIX_EPOCH_SERIAL: f64 = 25_569.0;

/// Converts a date-time to an Excel serial number in the 1900 date system.
/// Only dates from 1900-03-01 onwards map exactly; earlier dates are shifted by the Lotus 1-2-3 leap year bug.
pub(crate) fn to_excel_serial(value: &NaiveDateTime) -> f64 {
    let micros = value.and_utc().timestamp_micros();
    micros as f64 / 86_400_000_000f64 + UNIX_EPOCH_SERIAL
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    #[test]
    fn numbers_compare_by_value() {
        assert_eq!(CellValue::Number(0.0), CellValue::Number(-0.0));
        assert_eq!(CellValue::Number(f64::NAN), CellValue::Number(-f64::NAN));
        assert_ne!(CellValue::Number(1.0), CellValue::Number(1.5));
        assert_ne!(CellValue::Number(1.0), CellValue::Text("1".to_owned()));
    }

    #[test]
    fn equal_values_hash_equally() {
        let mut set = HashSet::new();
        set.insert(CellValue::Number(f64::NAN));
        set.insert(CellValue::Number(f64::NAN));
        set.insert(CellValue::Empty);
        set.insert(CellValue::Empty);
        set.insert(CellValue::Number(-0.0));
        set.insert(CellValue::Number(0.0));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn integers_read_as_numbers() {
        assert_eq!(CellValue::from(&Data::Int(7)), CellValue::Number(7.0));
        assert_eq!(CellValue::from(&Data::Float(7.0)), CellValue::from(&Data::Int(7)));
    }

    #[test]
    fn xlsx_strings_are_unescaped() {
        let escaped = Data::String("bell_x0007_".to_owned());
        assert_eq!(CellValue::from_ooxml(&escaped), CellValue::Text("bell\u{7}".to_owned()));
        assert_eq!(CellValue::from(&escaped), CellValue::Text("bell_x0007_".to_owned()));
        assert_eq!(CellValue::from_ooxml(&Data::Int(3)), CellValue::Number(3.0));
    }

    #[test]
    fn display_values() {
        assert_eq!(CellValue::Empty.to_string(), "");
        assert_eq!(CellValue::Number(42.0).to_string(), "42");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Bool(true).to_string(), "true");
        let datetime = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|date| date.and_hms_opt(13, 30, 0))
            .unwrap();
        assert_eq!(CellValue::DateTime(datetime).to_string(), "2024-03-01 13:30:00");
    }

    #[test]
    fn excel_serial_numbers() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(to_excel_serial(&date), 45292.0);
        let noon = NaiveDate::from_ymd_opt(1900, 3, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(to_excel_serial(&noon), 61.5);
    }
}
