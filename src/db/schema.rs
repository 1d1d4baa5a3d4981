//! Catalog queries used for schema reflection, one set per dialect.

use super::pool::DbPool;
use crate::types::SchemaSnapshot;
use sqlx::FromRow;

/// User tables, skipping SQLite's internal bookkeeping tables.
pub const SQLITE_TABLES: &str = r#"
SELECT name FROM sqlite_master
WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
ORDER BY name
"#;

/// Declared column types in declaration order.
pub const SQLITE_COLUMNS: &str = r#"
SELECT name, type AS data_type FROM pragma_table_info(?)
ORDER BY cid
"#;

pub const POSTGRES_TABLES: &str = r#"
SELECT table_name::text AS name
FROM information_schema.tables
WHERE table_schema = current_schema() AND table_type = 'BASE TABLE'
ORDER BY table_name
"#;

pub const POSTGRES_COLUMNS: &str = r#"
SELECT column_name::text AS name, data_type::text AS data_type
FROM information_schema.columns
WHERE table_schema = current_schema() AND table_name = $1
ORDER BY ordinal_position
"#;

pub const MYSQL_TABLES: &str = r#"
SELECT CAST(table_name AS CHAR) AS name
FROM information_schema.tables
WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE'
ORDER BY table_name
"#;

pub const MYSQL_COLUMNS: &str = r#"
SELECT CAST(column_name AS CHAR) AS name, CAST(column_type AS CHAR) AS data_type
FROM information_schema.columns
WHERE table_schema = DATABASE() AND table_name = ?
ORDER BY ordinal_position
"#;

#[derive(Debug, FromRow)]
struct TableRow {
    name: String,
}

#[derive(Debug, FromRow)]
struct ColumnRow {
    name: String,
    data_type: Option<String>,
}

impl ColumnRow {
    fn describe(&self) -> String {
        let ty = self.data_type.as_deref().unwrap_or("").trim();
        let ty = if ty.is_empty() { "NULL" } else { ty };
        format!("{} ({})", self.name, ty.to_uppercase())
    }
}

/// Read every table and its columns from the live database.
pub async fn reflect(pool: &DbPool) -> Result<SchemaSnapshot, sqlx::Error> {
    let mut snapshot = SchemaSnapshot::new();
    match pool {
        DbPool::Sqlite(p) => {
            let tables: Vec<TableRow> = sqlx::query_as(SQLITE_TABLES).fetch_all(p).await?;
            for t in tables {
                let cols: Vec<ColumnRow> = sqlx::query_as(SQLITE_COLUMNS)
                    .bind(&t.name)
                    .fetch_all(p)
                    .await?;
                snapshot.insert(t.name, cols.iter().map(ColumnRow::describe).collect());
            }
        }
        DbPool::Postgres(p) => {
            let tables: Vec<TableRow> = sqlx::query_as(POSTGRES_TABLES).fetch_all(p).await?;
            for t in tables {
                let cols: Vec<ColumnRow> = sqlx::query_as(POSTGRES_COLUMNS)
                    .bind(&t.name)
                    .fetch_all(p)
                    .await?;
                snapshot.insert(t.name, cols.iter().map(ColumnRow::describe).collect());
            }
        }
        DbPool::MySql(p) => {
            let tables: Vec<TableRow> = sqlx::query_as(MYSQL_TABLES).fetch_all(p).await?;
            for t in tables {
                let cols: Vec<ColumnRow> = sqlx::query_as(MYSQL_COLUMNS)
                    .bind(&t.name)
                    .fetch_all(p)
                    .await?;
                snapshot.insert(t.name, cols.iter().map(ColumnRow::describe).collect());
            }
        }
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_descriptor_uppercases_type() {
        let col = ColumnRow {
            name: "id".into(),
            data_type: Some("integer".into()),
        };
        assert_eq!(col.describe(), "id (INTEGER)");
    }

    #[test]
    fn untyped_sqlite_column_reports_null() {
        let col = ColumnRow {
            name: "anything".into(),
            data_type: Some(String::new()),
        };
        assert_eq!(col.describe(), "anything (NULL)");
    }
}
