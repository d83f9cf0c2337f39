//! Typed cell values.
//!
//! Every cell carries a [`CellValue`], a closed set of variants decided at
//! the point the caller assigns the value. The encoder dispatches
//! exhaustively on the variant, so a value either has a markup encoding or
//! cannot be constructed in the first place.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Days between the Unix epoch (1970-01-01) and the Excel date epoch
/// (1900-01-01 with the fictional leap day).
const EXCEL_EPOCH_OFFSET_DAYS: f64 = 25569.0;

const SECONDS_PER_DAY: f64 = 86400.0;

/// A value assigned to a worksheet cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// Absent value; encoded as an empty string cell.
    Empty,
    /// Text, written verbatim (XML-escaped) as a string cell.
    Text(String),
    /// Boolean, written as the text `true` / `false`.
    Bool(bool),
    /// Integer, written as a numeric cell.
    Int(i64),
    /// Floating-point number, written as a numeric cell. Non-finite values
    /// are rejected at encoding time.
    Float(f64),
    /// Timestamp, written as an Excel serial date with the date style.
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Whether this is the absent-value marker.
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

/// Convert a timestamp to the Excel serial date representation: days since
/// the Excel epoch, fractional part carrying the time of day.
///
/// The calendar fields are taken as-is (a `NaiveDateTime` has no offset to
/// discard), matching how spreadsheet applications show wall-clock times.
pub fn excel_serial(timestamp: &NaiveDateTime) -> f64 {
    timestamp.and_utc().timestamp() as f64 / SECONDS_PER_DAY + EXCEL_EPOCH_OFFSET_DAYS
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Int(i64::from(value))
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<u32> for CellValue {
    fn from(value: u32) -> Self {
        CellValue::Int(i64::from(value))
    }
}

impl From<f32> for CellValue {
    fn from(value: f32) -> Self {
        CellValue::Float(f64::from(value))
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for CellValue {
    fn from(value: DateTime<Tz>) -> Self {
        // The calendar fields are kept and the offset discarded, so the
        // caller's wall-clock time is what lands in the sheet.
        CellValue::DateTime(value.naive_local())
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => CellValue::Empty,
        }
    }
}

impl TryFrom<&serde_json::Value> for CellValue {
    type Error = Error;

    /// Convert a JSON scalar to a cell value. Arrays and objects have no
    /// cell encoding and are rejected.
    fn try_from(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Null => Ok(CellValue::Empty),
            serde_json::Value::Bool(b) => Ok(CellValue::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(CellValue::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(CellValue::Float(f))
                } else {
                    Err(Error::UnsupportedValue(format!(
                        "JSON number {} does not fit a cell",
                        n
                    )))
                }
            }
            serde_json::Value::String(s) => Ok(CellValue::Text(s.clone())),
            serde_json::Value::Array(_) => Err(Error::UnsupportedValue(
                "JSON array is not supported in a cell".to_string(),
            )),
            serde_json::Value::Object(_) => Err(Error::UnsupportedValue(
                "JSON object is not supported in a cell".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn naive(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(CellValue::from("abc"), CellValue::Text("abc".to_string()));
        assert_eq!(CellValue::from(true), CellValue::Bool(true));
        assert_eq!(CellValue::from(7i32), CellValue::Int(7));
        assert_eq!(CellValue::from(7u32), CellValue::Int(7));
        assert_eq!(CellValue::from(1.5f64), CellValue::Float(1.5));
    }

    #[test]
    fn test_option_conversions() {
        assert_eq!(CellValue::from(None::<i64>), CellValue::Empty);
        assert_eq!(CellValue::from(Some("x")), CellValue::Text("x".to_string()));
        assert!(CellValue::from(None::<String>).is_empty());
    }

    #[test]
    fn test_serial_of_unix_epoch() {
        let serial = excel_serial(&naive(1970, 1, 1, 0, 0, 0));
        assert!((serial - 25569.0).abs() < 1e-9);
    }

    #[test]
    fn test_serial_matches_unix_seconds() {
        // 2020-05-17T00:00:00Z is 1_589_673_600 seconds into the Unix era.
        let serial = excel_serial(&naive(2020, 5, 17, 0, 0, 0));
        assert!((serial - (1_589_673_600.0 / 86400.0 + 25569.0)).abs() < 1e-9);
        assert!((serial - 43968.0).abs() < 1e-9);
    }

    #[test]
    fn test_offset_is_discarded() {
        // The same wall-clock time in different zones encodes identically.
        let plus = DateTime::parse_from_rfc3339("2020-05-17T09:30:00+05:30").unwrap();
        let minus = DateTime::parse_from_rfc3339("2020-05-17T09:30:00-08:00").unwrap();

        let plus_value = CellValue::from(plus);
        let minus_value = CellValue::from(minus);
        assert_eq!(plus_value, minus_value);
        assert_eq!(plus_value, CellValue::DateTime(naive(2020, 5, 17, 9, 30, 0)));
    }

    #[test]
    fn test_json_scalars() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"s": "x", "i": 3, "f": 1.25, "b": false, "n": null}"#)
                .unwrap();
        assert_eq!(
            CellValue::try_from(&json["s"]).unwrap(),
            CellValue::Text("x".to_string())
        );
        assert_eq!(CellValue::try_from(&json["i"]).unwrap(), CellValue::Int(3));
        assert_eq!(
            CellValue::try_from(&json["f"]).unwrap(),
            CellValue::Float(1.25)
        );
        assert_eq!(
            CellValue::try_from(&json["b"]).unwrap(),
            CellValue::Bool(false)
        );
        assert_eq!(CellValue::try_from(&json["n"]).unwrap(), CellValue::Empty);
    }

    #[test]
    fn test_json_containers_are_rejected() {
        let json: serde_json::Value = serde_json::from_str(r#"{"a": [1], "o": {}}"#).unwrap();
        assert!(matches!(
            CellValue::try_from(&json["a"]),
            Err(Error::UnsupportedValue(_))
        ));
        assert!(matches!(
            CellValue::try_from(&json["o"]),
            Err(Error::UnsupportedValue(_))
        ));
    }
}
