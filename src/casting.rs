//! Conversion between XML character data and typed primitive values.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Timelike, Utc};

use crate::error::{BindingError, BindingResult};
use crate::schema::{DecimalFormat, Primitive};

/// A primitive field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
}

impl Value {
    pub fn primitive(&self) -> Primitive {
        match self {
            Value::Text(_) => Primitive::Text,
            Value::Integer(_) => Primitive::Integer,
            Value::Double(_) => Primitive::Double,
            Value::Boolean(_) => Primitive::Boolean,
            Value::DateTime(_) => Primitive::DateTime,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view; integers widen to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::DateTime(v) => Some(v),
            _ => None,
        }
    }

    /// True for text values that are empty, which validation treats as missing
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Text(s) if s.is_empty())
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

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

/// Cast character data to a value of the given kind.
///
/// Text passes through unchanged, empty included. For every other kind an
/// empty string means the field is absent and yields `Ok(None)`.
pub fn cast_from_text(kind: Primitive, text: &str, context: &str) -> BindingResult<Option<Value>> {
    if kind == Primitive::Text {
        return Ok(Some(Value::Text(text.to_string())));
    }
    if text.is_empty() {
        return Ok(None);
    }

    let value = match kind {
        Primitive::Text => Some(Value::Text(text.to_string())),
        Primitive::Integer => text.parse::<i64>().ok().map(Value::Integer),
        Primitive::Double => text.parse::<f64>().ok().map(Value::Double),
        Primitive::Boolean => match text.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(Value::Boolean(true)),
            "false" | "0" => Some(Value::Boolean(false)),
            _ => None,
        },
        Primitive::DateTime => parse_datetime(text).map(Value::DateTime),
    };

    value.map(Some).ok_or_else(|| BindingError::InvalidFormat {
        kind: kind.name(),
        value: text.to_string(),
        path: context.to_string(),
    })
}

/// Parse an ISO-8601 timestamp into UTC.
///
/// Accepts an explicit offset (`+HH:MM` or `+HHMM`), a `Z` suffix, or no
/// offset at all, which is taken as UTC. Fractional seconds are optional.
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    let naive = text.strip_suffix('Z').unwrap_or(text);
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}

/// Render a value as XML character data
pub fn render(value: &Value, format: DecimalFormat) -> String {
    match value {
        Value::Text(s) => s.trim().to_string(),
        Value::Integer(v) => v.to_string(),
        Value::Double(v) => render_decimal(*v, format),
        Value::Boolean(v) => v.to_string(),
        Value::DateTime(dt) => render_datetime(dt),
    }
}

pub fn render_decimal(value: f64, format: DecimalFormat) -> String {
    match format {
        DecimalFormat::General => format!("{:?}", value),
        DecimalFormat::Fixed1 => format!("{:.1}", value),
        DecimalFormat::Fixed6 => format!("{:.6}", value),
    }
}

/// ISO-8601 with an explicit `+00:00` offset
/// RFC 3339 with an offset; fractional seconds, when present, always carry
/// six digits
pub fn render_datetime(dt: &DateTime<Utc>) -> String {
    let seconds = if dt.nanosecond() == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Micros
    };
    dt.to_rfc3339_opts(seconds, false)
}
