//! MySQL row to JSON conversion.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use quarry_runtime::Row;
use serde_json::Value;
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Decode, MySql, Row as _, Type, TypeInfo};

/// JSON shape a MySQL column type decodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValueKind {
    Bool,
    Signed,
    Unsigned,
    Float,
    Decimal,
    Date,
    DateTime,
    Timestamp,
    Json,
    Binary,
    Text,
}

pub(crate) fn value_kind(type_name: &str) -> ValueKind {
    match type_name {
        "BOOLEAN" => ValueKind::Bool,
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => ValueKind::Signed,
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => ValueKind::Unsigned,
        "FLOAT" | "DOUBLE" => ValueKind::Float,
        "DECIMAL" => ValueKind::Decimal,
        "DATE" => ValueKind::Date,
        "DATETIME" => ValueKind::DateTime,
        "TIMESTAMP" => ValueKind::Timestamp,
        "JSON" => ValueKind::Json,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
        | "GEOMETRY" => ValueKind::Binary,
        _ => ValueKind::Text,
    }
}

fn get<'r, T>(row: &'r MySqlRow, idx: usize) -> Option<T>
where
    T: Decode<'r, MySql> + Type<MySql>,
{
    row.try_get::<Option<T>, _>(idx).ok().flatten()
}

fn decode_column(row: &MySqlRow, idx: usize, kind: ValueKind) -> Option<Value> {
    match kind {
        ValueKind::Bool => get::<bool>(row, idx).map(Value::from),
        ValueKind::Signed => get::<i64>(row, idx).map(Value::from),
        ValueKind::Unsigned => get::<u64>(row, idx).map(Value::from),
        ValueKind::Float => get::<f64>(row, idx)
            .or_else(|| get::<f32>(row, idx).map(f64::from))
            .map(Value::from),
        // Decimals keep full precision as strings.
        ValueKind::Decimal => get::<BigDecimal>(row, idx).map(|d| Value::String(d.to_string())),
        ValueKind::Date => get::<NaiveDate>(row, idx).map(|d| Value::String(d.to_string())),
        ValueKind::DateTime => {
            get::<NaiveDateTime>(row, idx).map(|d| Value::String(d.to_string()))
        }
        ValueKind::Timestamp => {
            get::<DateTime<Utc>>(row, idx).map(|d| Value::String(d.to_rfc3339()))
        }
        ValueKind::Json => get::<Value>(row, idx),
        ValueKind::Binary => get::<Vec<u8>>(row, idx).map(|bytes| match String::from_utf8(bytes) {
            Ok(text) => Value::String(text),
            Err(e) => Value::String(format!("<binary {} bytes>", e.as_bytes().len())),
        }),
        ValueKind::Text => get::<String>(row, idx).map(Value::String),
    }
}

/// Convert a row to a JSON object whose keys follow `columns`.
pub(crate) fn row_to_json(row: &MySqlRow, columns: &[String]) -> Row {
    let mut obj = Row::new();

    for (idx, col) in row.columns().iter().enumerate() {
        let name = col.name();
        if !columns.is_empty() && !columns.iter().any(|c| c == name) {
            continue;
        }
        let kind = value_kind(col.type_info().name());
        let value = decode_column(row, idx, kind)
            .or_else(|| get::<String>(row, idx).map(Value::String))
            .unwrap_or(Value::Null);
        obj.insert(name.to_string(), value);
    }

    obj
}
