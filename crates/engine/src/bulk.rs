use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;
use duckdb::Connection;
use tracing::debug;

use crate::dataset::Dataset;
use crate::ddl::TableIdentity;
use crate::identifiers::quote_identifier;
use crate::{EngineError, EngineResult};

/// Writes the header-inclusive CSV stream that `COPY` consumes: sanitized
/// names first, then every row in dataset order, missing cells as empty fields.
pub fn write_copy_stream<W: Write>(dataset: &Dataset, writer: W) -> EngineResult<()> {
    let mut out = WriterBuilder::new().from_writer(writer);
    out.write_record(dataset.column_names())
        .map_err(|err| EngineError::BulkLoadFailure(err.to_string()))?;

    for row in 0..dataset.row_count() {
        let record: Vec<String> = dataset
            .columns()
            .iter()
            .map(|column| column.values.render(row).unwrap_or_default())
            .collect();
        out.write_record(&record)
            .map_err(|err| EngineError::BulkLoadFailure(err.to_string()))?;
    }

    out.flush()
        .map_err(|err| EngineError::BulkLoadFailure(err.to_string()))?;
    Ok(())
}

pub fn copy_statement(target: &TableIdentity, columns: &[&str], source: &Path) -> String {
    let column_list = columns
        .iter()
        .map(|name| quote_identifier(name))
        .collect::<Vec<String>>()
        .join(", ");
    let escaped_path = source.display().to_string().replace('\'', "''");
    format!(
        "COPY {target} ({column_list}) FROM '{escaped_path}' \
         (FORMAT csv, HEADER true, DELIMITER ',', QUOTE '\"', ESCAPE '\"')"
    )
}

/// Streams every row of `dataset` into `target` through DuckDB's `COPY`.
/// Runs on whatever transaction `conn` is in; it does not commit.
pub fn bulk_copy(conn: &Connection, target: &TableIdentity, dataset: &Dataset) -> EngineResult<()> {
    if dataset.row_count() == 0 {
        debug!(table = %target, "no rows to copy");
        return Ok(());
    }

    let mut staging = tempfile::Builder::new()
        .prefix("csvload_copy_")
        .suffix(".csv")
        .tempfile()
        .map_err(|err| EngineError::BulkLoadFailure(format!("staging file: {err}")))?;
    write_copy_stream(dataset, staging.as_file_mut())?;

    let sql = copy_statement(target, &dataset.column_names(), staging.path());
    debug!(table = %target, rows = dataset.row_count(), staging = %staging.path().display(), "copying rows");
    conn.execute_batch(&sql)
        .map_err(|err| EngineError::BulkLoadFailure(err.to_string()))?;
    Ok(())
}
