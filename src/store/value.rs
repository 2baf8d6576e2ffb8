//! store/value — conversion between SQLite column values and JSON row fields.
//!
//! Mapping:
//! - NULL    <-> null
//! - INTEGER <-> number (i64)
//! - REAL    <-> number (f64; non-finite values become null)
//! - TEXT    <-> string
//! - BLOB    <-> {"$blob": "<base64>"}
//!
//! On the way back, booleans become 0/1 and any other array/object is stored as JSON text.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Number, Value};

pub const BLOB_TAG: &str = "$blob";

pub fn sql_to_json(v: SqlValue) -> Value {
    match v {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::Number(i.into()),
        SqlValue::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        SqlValue::Text(s) => Value::String(s),
        SqlValue::Blob(b) => {
            let mut m = Map::new();
            m.insert(BLOB_TAG.to_string(), Value::String(STANDARD.encode(b)));
            Value::Object(m)
        }
    }
}

pub fn json_to_sql(v: &Value) -> SqlValue {
    match v {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Object(m) => match decode_blob(m) {
            Some(bytes) => SqlValue::Blob(bytes),
            None => SqlValue::Text(v.to_string()),
        },
        Value::Array(_) => SqlValue::Text(v.to_string()),
    }
}

fn decode_blob(m: &Map<String, Value>) -> Option<Vec<u8>> {
    if m.len() != 1 {
        return None;
    }
    let s = m.get(BLOB_TAG)?.as_str()?;
    STANDARD.decode(s).ok()
}

/// Render a reference value for messages and placeholder names.
/// Returns None for values that cannot name anything (null, objects, arrays).
pub fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Bool(b) => Some(i64::from(*b).to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blob_is_tagged_and_restored() {
        let j = sql_to_json(SqlValue::Blob(vec![0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(j, json!({"$blob": "3q2+7w=="}));
        assert_eq!(json_to_sql(&j), SqlValue::Blob(vec![0xde, 0xad, 0xbe, 0xef]));
    }

    #[test]
    fn numbers_keep_their_affinity() {
        assert_eq!(json_to_sql(&json!(7)), SqlValue::Integer(7));
        assert_eq!(json_to_sql(&json!(2.5)), SqlValue::Real(2.5));
        assert_eq!(sql_to_json(SqlValue::Real(f64::NAN)), Value::Null);
        assert_eq!(json_to_sql(&json!(true)), SqlValue::Integer(1));
    }

    #[test]
    fn objects_without_tag_are_stored_as_text() {
        let v = json!({"lat": 36.7});
        assert_eq!(json_to_sql(&v), SqlValue::Text(v.to_string()));
    }

    #[test]
    fn scalar_text_rejects_null() {
        assert_eq!(scalar_text(&json!(999)), Some("999".to_string()));
        assert_eq!(scalar_text(&json!(" C-12 ")), Some("C-12".to_string()));
        assert_eq!(scalar_text(&Value::Null), None);
        assert_eq!(scalar_text(&json!("  ")), None);
    }
}
