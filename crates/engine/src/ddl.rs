use std::fmt;

use crate::dataset::ColumnDescriptor;
use crate::identifiers::{quote_identifier, validate_identifier};
use crate::{EngineError, EngineResult};

/// Synthetic primary key prepended to every created table.
pub const ID_COLUMN: &str = "id";

/// Destination `(schema, table)`; both parts are validated plain identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableIdentity {
    pub schema: String,
    pub table: String,
}

impl TableIdentity {
    pub fn new(schema: &str, table: &str) -> EngineResult<Self> {
        validate_identifier("schema name", schema)?;
        validate_identifier("table name", table)?;
        Ok(Self {
            schema: schema.to_string(),
            table: table.to_string(),
        })
    }

    /// Accepts `table` or `schema.table`; a bare table lands in `default_schema`.
    pub fn parse(value: &str, default_schema: &str) -> EngineResult<Self> {
        match value.split_once('.') {
            Some((schema, table)) => Self::new(schema, table),
            None => Self::new(default_schema, value),
        }
    }

    pub fn sequence_name(&self) -> String {
        format!("{}.{}_{}_seq", self.schema, self.table, ID_COLUMN)
    }
}

impl fmt::Display for TableIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Renders the conditional create for `target`.
///
/// DuckDB has no serial type, so the `id` default draws from a sequence named
/// after the table; the sequence is created (if absent) in the same script.
/// Column names are emitted exactly as given, duplicates included.
pub fn generate_create_statement(
    columns: &[ColumnDescriptor],
    target: &TableIdentity,
) -> EngineResult<String> {
    if columns.is_empty() {
        return Err(EngineError::InvalidInput(format!(
            "cannot create {target} without columns"
        )));
    }

    let sequence = target.sequence_name();
    let mut parts = Vec::with_capacity(columns.len() + 1);
    parts.push(format!(
        "{ID_COLUMN} BIGINT DEFAULT nextval('{sequence}') PRIMARY KEY"
    ));
    for column in columns {
        parts.push(format!(
            "{} {}",
            quote_identifier(&column.name),
            column.data_type.sql_type()
        ));
    }

    Ok(format!(
        "CREATE SEQUENCE IF NOT EXISTS {sequence};\n\
         CREATE TABLE IF NOT EXISTS {target} (\n    {definitions}\n);\n",
        definitions = parts.join(",\n    ")
    ))
}
