//! Conversion between driver values and JSON.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Number, Value};
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::postgres::types::PgInterval;
use sqlx::sqlite::SqliteRow;
use sqlx::types::Uuid;
use sqlx::types::ipnetwork::IpNetwork;
use sqlx::{Arguments, Column, Database, Encode, Row as _, Type, TypeInfo, ValueRef};

use crate::types::Row;

pub fn column_names<R: sqlx::Row>(row: &R) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

fn float(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

fn decimal(v: BigDecimal) -> Value {
    let text = v.normalized().to_string();
    match text.parse::<Number>() {
        Ok(n) => Value::Number(n),
        Err(_) => Value::String(text),
    }
}

fn blob(v: Vec<u8>) -> Value {
    Value::String(STANDARD.encode(v))
}

fn text<T: ToString>(v: T) -> Value {
    Value::String(v.to_string())
}

/// ISO 8601 duration with months, days and seconds kept apart, since
/// postgres does not normalize between them.
fn interval(v: PgInterval) -> Value {
    let secs = v.microseconds as f64 / 1_000_000.0;
    Value::String(format!("P{}M{}DT{}S", v.months, v.days, secs))
}

pub fn sqlite_row(row: &SqliteRow) -> Row {
    (0..row.len())
        .map(|i| (row.column(i).name().to_string(), sqlite_value(row, i)))
        .collect()
}

fn sqlite_value(row: &SqliteRow, idx: usize) -> Value {
    let ty = match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_ascii_uppercase(),
        Err(_) => return Value::Null,
    };
    let decoded = match ty.as_str() {
        "INTEGER" => row.try_get::<i64, _>(idx).map(Value::from).ok(),
        "REAL" => row.try_get::<f64, _>(idx).map(float).ok(),
        "BOOLEAN" => row.try_get::<bool, _>(idx).map(Value::from).ok(),
        "BLOB" => row.try_get::<Vec<u8>, _>(idx).map(blob).ok(),
        _ => row.try_get::<String, _>(idx).map(Value::from).ok(),
    };
    decoded
        .or_else(|| row.try_get_unchecked::<String, _>(idx).map(Value::from).ok())
        .unwrap_or(Value::Null)
}

pub fn postgres_row(row: &PgRow) -> Row {
    (0..row.len())
        .map(|i| (row.column(i).name().to_string(), postgres_value(row, i)))
        .collect()
}

fn postgres_value(row: &PgRow, idx: usize) -> Value {
    let ty = match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_ascii_uppercase(),
        Err(_) => return Value::Null,
    };
    let decoded = match ty.as_str() {
        "BOOL" => row.try_get::<bool, _>(idx).map(Value::from).ok(),
        "INT2" => row.try_get::<i16, _>(idx).map(Value::from).ok(),
        "INT4" => row.try_get::<i32, _>(idx).map(Value::from).ok(),
        "INT8" => row.try_get::<i64, _>(idx).map(Value::from).ok(),
        "FLOAT4" => row.try_get::<f32, _>(idx).map(|v| float(v as f64)).ok(),
        "FLOAT8" => row.try_get::<f64, _>(idx).map(float).ok(),
        "NUMERIC" => row.try_get::<BigDecimal, _>(idx).map(decimal).ok(),
        "DATE" => row
            .try_get::<NaiveDate, _>(idx)
            .map(|v| Value::String(v.to_string()))
            .ok(),
        "TIME" => row
            .try_get::<NaiveTime, _>(idx)
            .map(|v| Value::String(v.to_string()))
            .ok(),
        "TIMESTAMP" => row
            .try_get::<NaiveDateTime, _>(idx)
            .map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .ok(),
        "TIMESTAMPTZ" => row
            .try_get::<DateTime<Utc>, _>(idx)
            .map(|v| Value::String(v.to_rfc3339()))
            .ok(),
        "JSON" | "JSONB" => row.try_get::<Value, _>(idx).ok(),
        "BYTEA" => row.try_get::<Vec<u8>, _>(idx).map(blob).ok(),
        "UUID" => row.try_get::<Uuid, _>(idx).map(text).ok(),
        "INTERVAL" => row.try_get::<PgInterval, _>(idx).map(interval).ok(),
        "INET" | "CIDR" => row.try_get::<IpNetwork, _>(idx).map(text).ok(),
        "BOOL[]" => row.try_get::<Vec<bool>, _>(idx).map(Value::from).ok(),
        "INT2[]" => row.try_get::<Vec<i16>, _>(idx).map(Value::from).ok(),
        "INT4[]" => row.try_get::<Vec<i32>, _>(idx).map(Value::from).ok(),
        "INT8[]" => row.try_get::<Vec<i64>, _>(idx).map(Value::from).ok(),
        "FLOAT8[]" => row.try_get::<Vec<f64>, _>(idx).map(Value::from).ok(),
        "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => {
            row.try_get::<Vec<String>, _>(idx).map(Value::from).ok()
        }
        "UUID[]" => row
            .try_get::<Vec<Uuid>, _>(idx)
            .map(|v| Value::Array(v.into_iter().map(text).collect()))
            .ok(),
        _ => row.try_get::<String, _>(idx).map(Value::from).ok(),
    };
    decoded
        .or_else(|| row.try_get_unchecked::<String, _>(idx).map(Value::from).ok())
        .unwrap_or_else(|| {
            tracing::debug!(column = idx, pg_type = %ty, "undecodable postgres value");
            Value::Null
        })
}

pub fn mysql_row(row: &MySqlRow) -> Row {
    (0..row.len())
        .map(|i| (row.column(i).name().to_string(), mysql_value(row, i)))
        .collect()
}

fn mysql_value(row: &MySqlRow, idx: usize) -> Value {
    let ty = match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_ascii_uppercase(),
        Err(_) => return Value::Null,
    };
    let decoded = match ty.as_str() {
        "BOOLEAN" => row.try_get::<bool, _>(idx).map(Value::from).ok(),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<i64, _>(idx).map(Value::from).ok()
        }
        t if t.ends_with("UNSIGNED") => row.try_get::<u64, _>(idx).map(Value::from).ok(),
        "FLOAT" | "DOUBLE" => row.try_get::<f64, _>(idx).map(float).ok(),
        "DECIMAL" => row.try_get::<BigDecimal, _>(idx).map(decimal).ok(),
        "DATE" => row
            .try_get::<NaiveDate, _>(idx)
            .map(|v| Value::String(v.to_string()))
            .ok(),
        "TIME" => row
            .try_get::<NaiveTime, _>(idx)
            .map(|v| Value::String(v.to_string()))
            .ok(),
        "DATETIME" => row
            .try_get::<NaiveDateTime, _>(idx)
            .map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .ok(),
        "TIMESTAMP" => row
            .try_get::<DateTime<Utc>, _>(idx)
            .map(|v| Value::String(v.to_rfc3339()))
            .ok(),
        "JSON" => row.try_get::<Value, _>(idx).ok(),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            row.try_get::<Vec<u8>, _>(idx).map(blob).ok()
        }
        _ => row.try_get::<String, _>(idx).map(Value::from).ok(),
    };
    decoded
        .or_else(|| row.try_get_unchecked::<String, _>(idx).map(Value::from).ok())
        .unwrap_or(Value::Null)
}

/// Bind JSON parameters positionally. Arrays and objects are passed as
/// their JSON text.
pub fn bind_params<'q, DB>(params: &[Value]) -> Result<DB::Arguments<'q>, sqlx::error::BoxDynError>
where
    DB: Database,
    Option<bool>: Encode<'q, DB> + Type<DB>,
    Option<i64>: Encode<'q, DB> + Type<DB>,
    Option<f64>: Encode<'q, DB> + Type<DB>,
    Option<String>: Encode<'q, DB> + Type<DB>,
{
    let mut args: DB::Arguments<'q> = Default::default();
    for p in params {
        match p {
            Value::Null => args.add(None::<String>)?,
            Value::Bool(b) => args.add(Some(*b))?,
            Value::Number(n) => match n.as_i64() {
                Some(i) => args.add(Some(i))?,
                None => args.add(n.as_f64())?,
            },
            Value::String(s) => args.add(Some(s.clone()))?,
            other => args.add(Some(other.to_string()))?,
        }
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn decimals_become_numbers_when_representable() {
        let v = decimal(BigDecimal::from_str("12.50").unwrap());
        assert_eq!(v, serde_json::json!(12.5));
    }

    #[test]
    fn non_finite_floats_become_null() {
        assert_eq!(float(f64::NAN), Value::Null);
        assert_eq!(float(1.5), serde_json::json!(1.5));
    }

    #[test]
    fn blobs_are_base64() {
        assert_eq!(blob(vec![0xde, 0xad]), Value::String("3q0=".into()));
    }

    #[test]
    fn intervals_keep_their_parts() {
        let v = interval(PgInterval {
            months: 14,
            days: 3,
            microseconds: 7_201_500_000,
        });
        assert_eq!(v, Value::String("P14M3DT7201.5S".into()));
    }

    /// Runs against a live server only when `SQLNEXUS_TEST_POSTGRES_URL` is set.
    #[tokio::test]
    async fn postgres_extended_types_are_not_dropped() {
        let Ok(url) = std::env::var("SQLNEXUS_TEST_POSTGRES_URL") else {
            return;
        };
        let pool = sqlx::PgPool::connect(&url).await.unwrap();
        let row = sqlx::query(
            "SELECT 'a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11'::uuid AS id, \
             interval '1 day 2 hours' AS span, '10.0.0.1'::inet AS addr, \
             ARRAY['x', 'y'] AS tags, ARRAY[1, 2]::int4[] AS nums",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        let out = postgres_row(&row);
        assert_eq!(out["id"], json!("a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11"));
        assert_eq!(out["span"], json!("P0M1DT7200S"));
        assert_eq!(out["addr"], json!("10.0.0.1/32"));
        assert_eq!(out["tags"], json!(["x", "y"]));
        assert_eq!(out["nums"], json!([1, 2]));
        pool.close().await;
    }
}
