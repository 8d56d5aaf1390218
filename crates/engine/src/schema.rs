use duckdb::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::ddl::TableIdentity;
use crate::EngineResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableColumn {
    pub position: i64,
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
}

/// Point lookup in the catalog; never touches the table itself.
///
/// DuckDB resolves identifiers case-insensitively, so the catalog match does too:
/// once `Sales` exists, a load into `sales` appends to it.
pub fn table_exists(conn: &Connection, target: &TableIdentity) -> EngineResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM information_schema.tables \
         WHERE lower(table_schema) = lower(?) AND lower(table_name) = lower(?)",
        params![target.schema, target.table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn table_schema(conn: &Connection, target: &TableIdentity) -> EngineResult<Vec<TableColumn>> {
    let mut stmt = conn.prepare(
        "SELECT ordinal_position, column_name, data_type, is_nullable, column_default \
         FROM information_schema.columns \
         WHERE lower(table_schema) = lower(?) AND lower(table_name) = lower(?) \
         ORDER BY ordinal_position",
    )?;
    let rows = stmt.query_map(params![target.schema, target.table], |row| {
        let nullable: String = row.get(3)?;
        Ok(TableColumn {
            position: row.get(0)?,
            name: row.get(1)?,
            data_type: row.get(2)?,
            nullable: nullable.eq_ignore_ascii_case("YES"),
            default_value: row.get(4)?,
        })
    })?;

    let mut columns = Vec::new();
    for row in rows {
        columns.push(row?);
    }
    Ok(columns)
}

/// Names from `wanted` that `existing` does not have, in `wanted` order.
/// Matching ignores ASCII case, as DuckDB column binding does.
pub fn missing_columns(existing: &[TableColumn], wanted: &[&str]) -> Vec<String> {
    wanted
        .iter()
        .filter(|name| {
            !existing
                .iter()
                .any(|column| column.name.eq_ignore_ascii_case(**name))
        })
        .map(|name| name.to_string())
        .collect()
}
