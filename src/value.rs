use std::fmt;

use base64::Engine;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Result, StreamError};

/// A single column value produced by a row cursor.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
}

impl Value {
    /// Text form written into the delimited output.
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert a JSON cell into a value, parsing strings according to an
    /// optional SQL type hint.
    pub fn from_json(value: &serde_json::Value, type_hint: Option<&str>) -> Result<Self> {
        let hint = type_hint.map(str::to_lowercase);
        match value {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    match hint.as_deref() {
                        Some("float" | "real" | "decimal") => Ok(Value::Float(i as f64)),
                        Some("bit") => Ok(Value::Bool(i != 0)),
                        _ => Ok(Value::Int(i)),
                    }
                } else if let Some(f) = n.as_f64() {
                    Ok(Value::Float(f))
                } else {
                    Err(StreamError::Config(format!("Unsupported number: {n}")))
                }
            }
            serde_json::Value::String(s) => match hint.as_deref() {
                Some("uniqueidentifier") => s
                    .parse()
                    .map(Value::Uuid)
                    .map_err(|e| StreamError::Config(format!("Invalid UUID: {e}"))),
                Some("date") => s
                    .parse()
                    .map(Value::Date)
                    .map_err(|e| StreamError::Config(format!("Invalid date: {e}"))),
                Some("time") => s
                    .parse()
                    .map(Value::Time)
                    .map_err(|e| StreamError::Config(format!("Invalid time: {e}"))),
                Some("datetime" | "datetime2") => parse_datetime(s).map(Value::DateTime),
                Some("datetimeoffset") => DateTime::parse_from_rfc3339(s)
                    .map(Value::DateTimeOffset)
                    .map_err(|e| StreamError::Config(format!("Invalid datetimeoffset: {e}"))),
                Some("varbinary" | "binary") => base64::engine::general_purpose::STANDARD
                    .decode(s)
                    .map(Value::Bytes)
                    .map_err(|e| StreamError::Config(format!("Invalid base64: {e}"))),
                _ => Ok(Value::Text(s.clone())),
            },
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                Ok(Value::Text(value.to_string()))
            }
        }
    }
}

fn parse_datetime(s: &str) -> Result<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    Err(StreamError::Config(format!("Invalid datetime: {s}")))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => f.write_str(if *b { "True" } else { "False" }),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
            Value::Bytes(bytes) => {
                f.write_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            Value::Uuid(u) => write!(f, "{u}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::Time(t) => write!(f, "{t}"),
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::DateTimeOffset(dt) => f.write_str(&dt.to_rfc3339()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Text(c.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<uuid::Uuid> for Value {
    fn from(u: uuid::Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_conversion() {
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(Value::from(true).to_text(), "True");
        assert_eq!(Value::from(false).to_text(), "False");
        assert_eq!(Value::from(42).to_text(), "42");
        assert_eq!(Value::from(-7i64).to_text(), "-7");
        assert_eq!(Value::from(1.5).to_text(), "1.5");
        assert_eq!(Value::from('a').to_text(), "a");
        assert_eq!(Value::from(vec![1u8, 2, 3]).to_text(), "AQID");
        assert_eq!(Value::from(None::<i32>).to_text(), "");
    }

    #[test]
    fn temporal_text() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(Value::from(d).to_text(), "2024-03-09");
        let dt = d.and_hms_opt(14, 5, 0).unwrap();
        assert_eq!(Value::from(dt).to_text(), "2024-03-09 14:05:00");
    }

    #[test]
    fn json_untyped() {
        assert_eq!(Value::from_json(&serde_json::json!(null), None).unwrap(), Value::Null);
        assert_eq!(Value::from_json(&serde_json::json!(5), None).unwrap(), Value::Int(5));
        assert_eq!(
            Value::from_json(&serde_json::json!(2.25), None).unwrap(),
            Value::Float(2.25)
        );
        assert_eq!(
            Value::from_json(&serde_json::json!("hi"), None).unwrap(),
            Value::Text("hi".into())
        );
        assert_eq!(
            Value::from_json(&serde_json::json!([1, 2]), None).unwrap(),
            Value::Text("[1,2]".into())
        );
    }

    #[test]
    fn json_typed() {
        let v = Value::from_json(
            &serde_json::json!("6f1c3b52-8d0e-4a4b-9d0c-2f6b7a1e9c10"),
            Some("uniqueidentifier"),
        )
        .unwrap();
        assert!(matches!(v, Value::Uuid(_)));
        assert_eq!(v.to_text(), "6f1c3b52-8d0e-4a4b-9d0c-2f6b7a1e9c10");

        let v = Value::from_json(&serde_json::json!("2024-01-02T03:04:05"), Some("DATETIME2"))
            .unwrap();
        assert_eq!(v.to_text(), "2024-01-02 03:04:05");

        let v = Value::from_json(&serde_json::json!(1), Some("bit")).unwrap();
        assert_eq!(v, Value::Bool(true));

        let v = Value::from_json(&serde_json::json!("AQID"), Some("varbinary")).unwrap();
        assert_eq!(v, Value::Bytes(vec![1, 2, 3]));
    }

    #[test]
    fn json_typed_rejects_garbage() {
        assert!(Value::from_json(&serde_json::json!("nope"), Some("date")).is_err());
        assert!(Value::from_json(&serde_json::json!("nope"), Some("uniqueidentifier")).is_err());
        assert!(Value::from_json(&serde_json::json!("nope"), Some("datetime")).is_err());
    }
}
