use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Semantic types an entity field can declare.
///
/// Each semantic type maps onto one `SQLite` storage type; the engine
/// serializes values on the way in and decodes them on the way out so that
/// application code only ever sees the declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// 64-bit integer, stored as INTEGER
    Integer,
    /// 64-bit float, stored as REAL
    Real,
    /// UTF-8 text, stored as TEXT
    Text,
    /// Boolean, stored as INTEGER 0/1
    Boolean,
    /// Naive timestamp, stored as ISO-8601 TEXT
    Timestamp,
    /// Fixed-point decimal, stored as REAL (f64 precision on disk)
    Decimal,
}

impl FieldType {
    /// The `SQLite` column type this semantic type is stored as.
    #[must_use]
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldType::Integer | FieldType::Boolean => "INTEGER",
            FieldType::Real | FieldType::Decimal => "REAL",
            FieldType::Text | FieldType::Timestamp => "TEXT",
        }
    }
}

/// Runtime value held by a record field or bound to a query parameter.
///
/// ```rust
/// use entity_lite::prelude::*;
///
/// let params = vec![
///     FieldValue::Int(1),
///     FieldValue::Text("alice".into()),
///     FieldValue::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Real(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// Decimal value
    Decimal(Decimal),
    /// Binary data surfaced by the driver; not declarable as a field type
    Blob(Vec<u8>),
    /// NULL value
    Null,
}

impl FieldValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let FieldValue::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let FieldValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let FieldValue::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let FieldValue::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            return parse_timestamp_text(s);
        }
        None
    }

    #[must_use]
    pub fn as_real(&self) -> Option<f64> {
        if let FieldValue::Real(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            FieldValue::Decimal(value) => Some(*value),
            FieldValue::Real(f) => Decimal::from_f64_retain(*f),
            FieldValue::Int(i) => Some(Decimal::from(*i)),
            FieldValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let FieldValue::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Short tag for error messages.
    pub(crate) fn variant_name(&self) -> &'static str {
        match self {
            FieldValue::Int(_) => "Int",
            FieldValue::Real(_) => "Real",
            FieldValue::Text(_) => "Text",
            FieldValue::Bool(_) => "Bool",
            FieldValue::Timestamp(_) => "Timestamp",
            FieldValue::Decimal(_) => "Decimal",
            FieldValue::Blob(_) => "Blob",
            FieldValue::Null => "Null",
        }
    }

    /// Check an assigned value against a declared semantic type, applying
    /// integer widening where it is lossless. Nullability is the caller's
    /// concern; `Null` passes unchanged.
    pub(crate) fn coerce_for(self, declared: FieldType) -> Result<FieldValue, String> {
        match (declared, self) {
            (_, FieldValue::Null) => Ok(FieldValue::Null),
            (FieldType::Integer, v @ FieldValue::Int(_)) => Ok(v),
            (FieldType::Real, v @ FieldValue::Real(_)) => Ok(v),
            #[allow(clippy::cast_precision_loss)]
            (FieldType::Real, FieldValue::Int(i)) => Ok(FieldValue::Real(i as f64)),
            (FieldType::Text, v @ FieldValue::Text(_)) => Ok(v),
            (FieldType::Boolean, v @ FieldValue::Bool(_)) => Ok(v),
            (FieldType::Timestamp, v @ FieldValue::Timestamp(_)) => Ok(v),
            (FieldType::Decimal, v @ FieldValue::Decimal(_)) => Ok(v),
            (FieldType::Decimal, FieldValue::Int(i)) => Ok(FieldValue::Decimal(Decimal::from(i))),
            (declared, other) => Err(format!(
                "expected {declared:?}, got {}",
                other.variant_name()
            )),
        }
    }

    /// Decode a raw stored value into the declared semantic type. The raw
    /// value comes straight off the driver, so it is only ever Int, Real,
    /// Text, Blob, or Null.
    pub(crate) fn decode_stored(declared: FieldType, raw: &FieldValue) -> Result<FieldValue, String> {
        match (declared, raw) {
            (_, FieldValue::Null) => Ok(FieldValue::Null),
            (FieldType::Integer, FieldValue::Int(i)) => Ok(FieldValue::Int(*i)),
            (FieldType::Real, FieldValue::Real(f)) => Ok(FieldValue::Real(*f)),
            #[allow(clippy::cast_precision_loss)]
            (FieldType::Real, FieldValue::Int(i)) => Ok(FieldValue::Real(*i as f64)),
            (FieldType::Text, FieldValue::Text(s)) => Ok(FieldValue::Text(s.clone())),
            (FieldType::Boolean, FieldValue::Int(0)) => Ok(FieldValue::Bool(false)),
            (FieldType::Boolean, FieldValue::Int(1)) => Ok(FieldValue::Bool(true)),
            (FieldType::Boolean, FieldValue::Bool(b)) => Ok(FieldValue::Bool(*b)),
            (FieldType::Timestamp, FieldValue::Timestamp(dt)) => Ok(FieldValue::Timestamp(*dt)),
            (FieldType::Timestamp, FieldValue::Text(s)) => parse_timestamp_text(s)
                .map(FieldValue::Timestamp)
                .ok_or_else(|| format!("stored text {s:?} is not an ISO-8601 timestamp")),
            (FieldType::Decimal, FieldValue::Decimal(d)) => Ok(FieldValue::Decimal(*d)),
            (FieldType::Decimal, FieldValue::Real(f)) => Decimal::from_f64_retain(*f)
                .map(FieldValue::Decimal)
                .ok_or_else(|| format!("stored value {f} is not representable as a decimal")),
            (FieldType::Decimal, FieldValue::Int(i)) => Ok(FieldValue::Decimal(Decimal::from(*i))),
            (FieldType::Decimal, FieldValue::Text(s)) => s
                .parse()
                .map(FieldValue::Decimal)
                .map_err(|_| format!("stored text {s:?} is not a decimal")),
            (declared, raw) => Err(format!(
                "stored {} value cannot be decoded as {declared:?}",
                raw.variant_name()
            )),
        }
    }

    /// Render this value as a SQL literal for DDL DEFAULT clauses. Text is
    /// single-quoted with embedded quotes doubled; everything else renders
    /// as a plain literal.
    #[must_use]
    pub(crate) fn sql_literal(&self) -> String {
        match self {
            FieldValue::Int(i) => i.to_string(),
            FieldValue::Real(f) => f.to_string(),
            FieldValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            FieldValue::Bool(b) => i64::from(*b).to_string(),
            FieldValue::Timestamp(dt) => format!("'{}'", format_timestamp(*dt)),
            FieldValue::Decimal(d) => d.to_string(),
            FieldValue::Blob(bytes) => {
                let mut hex = String::with_capacity(bytes.len() * 2 + 3);
                hex.push_str("X'");
                for b in bytes {
                    hex.push_str(&format!("{b:02X}"));
                }
                hex.push('\'');
                hex
            }
            FieldValue::Null => "NULL".to_string(),
        }
    }

}

/// Convert a decimal to its `f64` REAL representation.
/// f64 covers the full `Decimal` range; only precision can be lost.
#[must_use]
pub(crate) fn decimal_to_real(d: Decimal) -> f64 {
    d.to_f64().unwrap_or_default()
}

/// Canonical ISO-8601 rendering used for TEXT storage of timestamps.
/// The fractional part is omitted when zero, matching what `SQLite`
/// round-trips through `isoformat`-style text.
#[must_use]
pub(crate) fn format_timestamp(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// Parse stored timestamp text. Accepts the canonical `T`-separated form
/// first, then the space-separated form some tools write.
#[must_use]
pub(crate) fn parse_timestamp_text(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = s.parse::<NaiveDateTime>() {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt);
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok()
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Real(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Decimal(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        FieldValue::Blob(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => FieldValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn timestamp_text_roundtrip() {
        let dt = ts(2024, 3, 9, 14, 30, 5);
        let text = format_timestamp(dt);
        assert_eq!(text, "2024-03-09T14:30:05");
        assert_eq!(parse_timestamp_text(&text), Some(dt));
    }

    #[test]
    fn timestamp_parse_accepts_space_separator() {
        let dt = ts(2024, 3, 9, 14, 30, 5);
        assert_eq!(parse_timestamp_text("2024-03-09 14:30:05"), Some(dt));
        assert_eq!(
            parse_timestamp_text("2024-03-09 14:30:05.250"),
            dt.with_nanosecond(250_000_000)
        );
    }

    #[test]
    fn coerce_widens_int_to_real_and_decimal() {
        let widened = FieldValue::Int(3).coerce_for(FieldType::Real).unwrap();
        assert_eq!(widened, FieldValue::Real(3.0));
        let widened = FieldValue::Int(3).coerce_for(FieldType::Decimal).unwrap();
        assert_eq!(widened, FieldValue::Decimal(Decimal::from(3)));
    }

    #[test]
    fn coerce_rejects_mismatched_types() {
        let err = FieldValue::Text("x".into())
            .coerce_for(FieldType::Integer)
            .unwrap_err();
        assert!(err.contains("expected Integer"));
    }

    #[test]
    fn decode_boolean_from_stored_integer() {
        assert_eq!(
            FieldValue::decode_stored(FieldType::Boolean, &FieldValue::Int(1)),
            Ok(FieldValue::Bool(true))
        );
        assert_eq!(
            FieldValue::decode_stored(FieldType::Boolean, &FieldValue::Int(0)),
            Ok(FieldValue::Bool(false))
        );
        assert!(FieldValue::decode_stored(FieldType::Boolean, &FieldValue::Int(7)).is_err());
    }

    #[test]
    fn decode_rejects_non_timestamp_text() {
        let err =
            FieldValue::decode_stored(FieldType::Timestamp, &FieldValue::Text("not-a-date".into()))
                .unwrap_err();
        assert!(err.contains("not an ISO-8601 timestamp"));
    }

    #[test]
    fn sql_literal_escapes_quotes() {
        assert_eq!(
            FieldValue::Text("it's".into()).sql_literal(),
            "'it''s'"
        );
        assert_eq!(FieldValue::Bool(true).sql_literal(), "1");
        assert_eq!(FieldValue::Null.sql_literal(), "NULL");
    }
}
