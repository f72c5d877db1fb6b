use rusqlite::types::Value;

use crate::types::RowValues;

/// Convert bound parameters into owned SQLite values.
///
/// SQLite has no native boolean, timestamp, or JSON storage classes, so those
/// bind as integer 0/1 and formatted text respectively.
pub(crate) fn to_sqlite_values(params: &[RowValues]) -> Vec<Value> {
    params.iter().map(to_sqlite_value).collect()
}

fn to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(j) => Value::Text(j.to_string()),
        RowValues::Blob(b) => Value::Blob(b.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_binds_as_integer() {
        assert_eq!(to_sqlite_value(&RowValues::Bool(true)), Value::Integer(1));
        assert_eq!(to_sqlite_value(&RowValues::Bool(false)), Value::Integer(0));
    }

    #[test]
    fn timestamp_binds_as_text() {
        let dt = chrono::NaiveDateTime::parse_from_str("2020-09-09 12:30:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        match to_sqlite_value(&RowValues::Timestamp(dt)) {
            Value::Text(s) => assert!(s.starts_with("2020-09-09 12:30:00")),
            other => panic!("expected text, got {other:?}"),
        }
    }
}
