use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::TableError;

/// Logical type attached to a column.
///
/// The type governs how text is parsed on `set`, how values compare for
/// sorting and `column_limits`, and how values render in dumps.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Untyped: values are stored exactly as given.
    #[default]
    Unknown,
    String,
    Long,
    Int,
    Double,
    Boolean,
    Time,
    Blob,
}

impl ColumnType {
    /// Canonical name, as written in dumps.
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Unknown => "unknown",
            ColumnType::String => "string",
            ColumnType::Long => "long",
            ColumnType::Int => "int",
            ColumnType::Double => "double",
            ColumnType::Boolean => "boolean",
            ColumnType::Time => "time",
            ColumnType::Blob => "blob",
        }
    }

    /// Returns true for types whose values compare numerically.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ColumnType::Long | ColumnType::Int | ColumnType::Double | ColumnType::Boolean
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColumnType {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(ColumnType::Unknown),
            "string" => Ok(ColumnType::String),
            "long" => Ok(ColumnType::Long),
            "int" | "integer" => Ok(ColumnType::Int),
            "double" => Ok(ColumnType::Double),
            "boolean" | "bool" => Ok(ColumnType::Boolean),
            "time" => Ok(ColumnType::Time),
            "blob" => Ok(ColumnType::Blob),
            other => Err(TableError::UnknownColumnType(other.to_string())),
        }
    }
}

/// Error raised when a value cannot be represented in a column's type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot represent {text:?} as {target}")]
pub struct ConvertError {
    /// Display form of the offending value.
    pub text: String,
    /// The type conversion was attempting to reach.
    pub target: ColumnType,
}

impl ConvertError {
    fn new(text: impl Into<String>, target: ColumnType) -> Self {
        Self {
            text: text.into(),
            target,
        }
    }
}

/// A single cell payload.
///
/// The enum uses an explicit `{type, value}` tagged layout so embeddings can
/// move values over JSON unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    String(String),
    Long(i64),
    Int(i32),
    Double(f64),
    Boolean(bool),
    Time(NaiveDateTime),
    Blob(Vec<u8>),
}

impl Value {
    /// The natural column type of this value.
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::String(_) => ColumnType::String,
            Value::Long(_) => ColumnType::Long,
            Value::Int(_) => ColumnType::Int,
            Value::Double(_) => ColumnType::Double,
            Value::Boolean(_) => ColumnType::Boolean,
            Value::Time(_) => ColumnType::Time,
            Value::Blob(_) => ColumnType::Blob,
        }
    }

    /// Parse text into a value of the given type.
    ///
    /// `Unknown` and `String` columns keep the text verbatim; blobs are
    /// base64; times accept RFC 3339-style timestamps with an optional
    /// fractional second.
    pub fn parse(text: &str, ty: ColumnType) -> Result<Value, ConvertError> {
        match ty {
            ColumnType::Unknown | ColumnType::String => Ok(Value::String(text.to_string())),
            ColumnType::Long => text
                .trim()
                .parse::<i64>()
                .map(Value::Long)
                .map_err(|_| ConvertError::new(text, ty)),
            ColumnType::Int => text
                .trim()
                .parse::<i32>()
                .map(Value::Int)
                .map_err(|_| ConvertError::new(text, ty)),
            ColumnType::Double => text
                .trim()
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|_| ConvertError::new(text, ty)),
            ColumnType::Boolean => parse_boolean(text).map(Value::Boolean),
            ColumnType::Time => parse_time(text).map(Value::Time),
            ColumnType::Blob => base64::engine::general_purpose::STANDARD
                .decode(text.trim())
                .map(Value::Blob)
                .map_err(|_| ConvertError::new(text, ty)),
        }
    }

    /// Convert this value to the given column type.
    ///
    /// Numeric conversions are checked: a `Double` only becomes a `Long` or
    /// `Int` when it is integral and in range, never by truncation.
    pub fn convert_to(&self, ty: ColumnType) -> Result<Value, ConvertError> {
        if self.column_type() == ty || ty == ColumnType::Unknown {
            return Ok(self.clone());
        }
        match (self, ty) {
            (Value::String(s), _) => Value::parse(s, ty),
            (_, ColumnType::String) => Ok(Value::String(self.to_text())),
            (Value::Long(v), ColumnType::Int) => i32::try_from(*v)
                .map(Value::Int)
                .map_err(|_| ConvertError::new(v.to_string(), ty)),
            (Value::Long(v), ColumnType::Double) => Ok(Value::Double(*v as f64)),
            (Value::Long(v), ColumnType::Boolean) => Ok(Value::Boolean(*v != 0)),
            (Value::Int(v), ColumnType::Long) => Ok(Value::Long(i64::from(*v))),
            (Value::Int(v), ColumnType::Double) => Ok(Value::Double(f64::from(*v))),
            (Value::Int(v), ColumnType::Boolean) => Ok(Value::Boolean(*v != 0)),
            (Value::Double(v), ColumnType::Long) => double_to_i64(*v)
                .map(Value::Long)
                .ok_or_else(|| ConvertError::new(v.to_string(), ty)),
            (Value::Double(v), ColumnType::Int) => double_to_i64(*v)
                .and_then(|n| i32::try_from(n).ok())
                .map(Value::Int)
                .ok_or_else(|| ConvertError::new(v.to_string(), ty)),
            (Value::Double(v), ColumnType::Boolean) => Ok(Value::Boolean(*v != 0.0)),
            (Value::Boolean(v), ColumnType::Long) => Ok(Value::Long(i64::from(*v))),
            (Value::Boolean(v), ColumnType::Int) => Ok(Value::Int(i32::from(*v))),
            (Value::Boolean(v), ColumnType::Double) => Ok(Value::Double(f64::from(u8::from(*v)))),
            _ => Err(ConvertError::new(self.to_text(), ty)),
        }
    }

    /// Render the value as dump/display text.
    ///
    /// Booleans render as `1`/`0`, blobs as base64, times as
    /// `YYYY-MM-DDTHH:MM:SS[.fff]`.
    pub fn to_text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Long(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Boolean(v) => if *v { "1" } else { "0" }.to_string(),
            Value::Time(t) => t.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            Value::Blob(b) => base64::engine::general_purpose::STANDARD.encode(b),
        }
    }

    /// Compare two values, using numeric order when both sides are numeric
    /// and falling back to text order for mixed types.
    pub fn compare(&self, other: &Value) -> Ordering {
        use Value::*;
        match (self, other) {
            (Long(a), Long(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Long(a), Int(b)) => a.cmp(&i64::from(*b)),
            (Int(a), Long(b)) => i64::from(*a).cmp(b),
            (Double(a), Double(b)) => a.total_cmp(b),
            (Double(a), Long(b)) => a.total_cmp(&(*b as f64)),
            (Long(a), Double(b)) => (*a as f64).total_cmp(b),
            (Double(a), Int(b)) => a.total_cmp(&f64::from(*b)),
            (Int(a), Double(b)) => f64::from(*a).total_cmp(b),
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Time(a), Time(b)) => a.cmp(b),
            (Blob(a), Blob(b)) => a.cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => self.to_text().cmp(&other.to_text()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            Value::Int(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Long(v) => Some(*v as f64),
            Value::Int(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::Time(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

fn double_to_i64(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

fn parse_boolean(text: &str) -> Result<bool, ConvertError> {
    let t = text.trim();
    if t.eq_ignore_ascii_case("true")
        || t.eq_ignore_ascii_case("yes")
        || t.eq_ignore_ascii_case("on")
        || t == "1"
    {
        Ok(true)
    } else if t.eq_ignore_ascii_case("false")
        || t.eq_ignore_ascii_case("no")
        || t.eq_ignore_ascii_case("off")
        || t == "0"
    {
        Ok(false)
    } else {
        Err(ConvertError::new(text, ColumnType::Boolean))
    }
}

fn parse_time(text: &str) -> Result<NaiveDateTime, ConvertError> {
    let t = text.trim();
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(t, format) {
            return Ok(parsed);
        }
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight);
        }
    }
    Err(ConvertError::new(text, ColumnType::Time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_respects_column_type() {
        assert_eq!(
            Value::parse("42", ColumnType::Long).unwrap(),
            Value::Long(42)
        );
        assert_eq!(
            Value::parse(" 42 ", ColumnType::Int).unwrap(),
            Value::Int(42)
        );
        assert_eq!(
            Value::parse("42", ColumnType::Unknown).unwrap(),
            Value::String("42".to_string())
        );
        assert_eq!(
            Value::parse("yes", ColumnType::Boolean).unwrap(),
            Value::Boolean(true)
        );
        assert!(Value::parse("4x", ColumnType::Long).is_err());
    }

    #[test]
    fn double_conversion_never_truncates() {
        assert_eq!(
            Value::Double(3.0).convert_to(ColumnType::Long).unwrap(),
            Value::Long(3)
        );
        let err = Value::Double(3.5).convert_to(ColumnType::Long).unwrap_err();
        assert_eq!(err.target, ColumnType::Long);
    }

    #[test]
    fn blob_text_round_trips() {
        let blob = Value::Blob(vec![0, 1, 2, 0xff]);
        let text = blob.to_text();
        assert_eq!(Value::parse(&text, ColumnType::Blob).unwrap(), blob);
    }

    #[test]
    fn time_text_round_trips() {
        let t = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(12, 30, 45, 250)
            .unwrap();
        let value = Value::Time(t);
        assert_eq!(Value::parse(&value.to_text(), ColumnType::Time).unwrap(), value);
        assert_eq!(
            Value::parse("2024-03-01", ColumnType::Time).unwrap(),
            Value::Time(t.date().and_hms_opt(0, 0, 0).unwrap())
        );
    }

    #[test]
    fn serde_layout_is_tagged() {
        let json = serde_json::to_string(&Value::Long(7)).unwrap();
        assert_eq!(json, r#"{"type":"long","value":7}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::Long(7));
    }

    #[test]
    fn mixed_numeric_comparison() {
        assert_eq!(Value::Long(2).compare(&Value::Double(2.5)), Ordering::Less);
        assert_eq!(Value::Int(3).compare(&Value::Long(3)), Ordering::Equal);
        assert_eq!(
            Value::String("b".into()).compare(&Value::String("a".into())),
            Ordering::Greater
        );
    }
}
