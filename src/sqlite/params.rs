use crate::value::{FieldValue, decimal_to_real, format_timestamp};

/// Convert a single [`FieldValue`] to a rusqlite value, applying the
/// storage serialization: booleans become 0/1 integers, timestamps become
/// ISO-8601 text, decimals become REAL.
#[must_use]
pub fn field_value_to_sqlite_value(value: &FieldValue) -> rusqlite::types::Value {
    match value {
        FieldValue::Int(i) => rusqlite::types::Value::Integer(*i),
        FieldValue::Real(f) => rusqlite::types::Value::Real(*f),
        FieldValue::Text(s) => rusqlite::types::Value::Text(s.clone()),
        FieldValue::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
        FieldValue::Timestamp(dt) => rusqlite::types::Value::Text(format_timestamp(*dt)),
        FieldValue::Decimal(d) => rusqlite::types::Value::Real(decimal_to_real(*d)),
        FieldValue::Blob(bytes) => rusqlite::types::Value::Blob(bytes.clone()),
        FieldValue::Null => rusqlite::types::Value::Null,
    }
}

/// Parameters converted for `SQLite` execution.
pub struct Params(Vec<rusqlite::types::Value>);

impl Params {
    /// Convert a slice of field values into `SQLite` values.
    #[must_use]
    pub fn convert(params: &[FieldValue]) -> Self {
        Params(params.iter().map(field_value_to_sqlite_value).collect())
    }

    /// Borrow the underlying values.
    #[must_use]
    pub fn as_values(&self) -> &[rusqlite::types::Value] {
        &self.0
    }

    /// Take ownership of the converted values.
    #[must_use]
    pub fn into_values(self) -> Vec<rusqlite::types::Value> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[test]
    fn bool_binds_as_integer() {
        assert_eq!(
            field_value_to_sqlite_value(&FieldValue::Bool(true)),
            rusqlite::types::Value::Integer(1)
        );
        assert_eq!(
            field_value_to_sqlite_value(&FieldValue::Bool(false)),
            rusqlite::types::Value::Integer(0)
        );
    }

    #[test]
    fn timestamp_binds_as_iso_text() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 30, 5)
            .unwrap();
        assert_eq!(
            field_value_to_sqlite_value(&FieldValue::Timestamp(dt)),
            rusqlite::types::Value::Text("2024-03-09T14:30:05".to_string())
        );
    }

    #[test]
    fn decimal_binds_as_real() {
        let d: Decimal = "19.99".parse().unwrap();
        match field_value_to_sqlite_value(&FieldValue::Decimal(d)) {
            rusqlite::types::Value::Real(f) => assert!((f - 19.99).abs() < 1e-9),
            other => panic!("expected Real, got {other:?}"),
        }
    }
}
