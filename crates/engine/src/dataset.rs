use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use serde::Serialize;
use tracing::{debug, warn};

use crate::ddl::ID_COLUMN;
use crate::identifiers::{sanitize_identifier, unique_identifiers};
use crate::inference::{infer_type, Column, InferredType};
use crate::{EngineError, EngineResult};

/// CSV contents as read, column-major. Empty and whitespace-only cells are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub columns: Vec<Vec<Option<String>>>,
    pub row_count: usize,
}

impl RawTable {
    pub fn from_path(path: &Path) -> EngineResult<Self> {
        if !path.is_file() {
            return Err(EngineError::InputNotFound(path.display().to_string()));
        }
        let file = File::open(path).map_err(|err| {
            EngineError::InputNotFound(format!("{}: {}", path.display(), err))
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> EngineResult<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() {
            return Err(EngineError::InvalidInput("CSV header row is empty".into()));
        }

        let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        let mut row_count = 0usize;

        for record in reader.records() {
            let record = record?;
            if record.len() > headers.len() {
                let line = record.position().map(|pos| pos.line()).unwrap_or(0);
                return Err(EngineError::InvalidInput(format!(
                    "line {line} has {} fields but the header has {}",
                    record.len(),
                    headers.len()
                )));
            }
            for (index, column) in columns.iter_mut().enumerate() {
                let cell = record
                    .get(index)
                    .filter(|value| !value.trim().is_empty())
                    .map(str::to_string);
                column.push(cell);
            }
            row_count += 1;
        }

        Ok(Self {
            headers,
            columns,
            row_count,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub raw_name: String,
    pub name: String,
    pub data_type: InferredType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetColumn {
    pub descriptor: ColumnDescriptor,
    pub values: Column,
    /// Cells that did not fit the inferred type and were loaded as missing.
    pub coerced: usize,
}

/// A CSV file with sanitized, de-duplicated names and typed columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<DatasetColumn>,
    row_count: usize,
}

impl Dataset {
    pub fn read_csv(path: &Path) -> EngineResult<Self> {
        Self::from_raw(RawTable::from_path(path)?)
    }

    pub fn from_raw(raw: RawTable) -> EngineResult<Self> {
        let RawTable {
            headers,
            columns,
            row_count,
        } = raw;

        let kept: Vec<(String, Vec<Option<String>>)> = headers
            .into_iter()
            .zip(columns)
            .filter(|(header, _)| {
                let artifact = is_index_artifact(header);
                if artifact {
                    debug!(column = %header, "dropping unnamed column");
                }
                !artifact
            })
            .collect();
        if kept.is_empty() {
            return Err(EngineError::InvalidInput(
                "CSV has no usable columns".into(),
            ));
        }

        let sanitized: Vec<String> = kept
            .iter()
            .map(|(header, _)| sanitize_identifier(header))
            .collect();
        let names = unique_identifiers(&sanitized, &[ID_COLUMN]);

        let mut dataset_columns = Vec::with_capacity(kept.len());
        for (((raw_name, cells), base), name) in kept.into_iter().zip(sanitized).zip(names) {
            if base != name {
                warn!(raw = %raw_name, sanitized = %base, renamed = %name, "column name collision");
            }
            let data_type = infer_type(&cells);
            let (values, coerced) = Column::coerce(data_type, cells);
            if coerced > 0 {
                warn!(column = %name, %data_type, coerced, "cells did not match inferred type and will load as NULL");
            }
            debug!(raw = %raw_name, column = %name, %data_type, "inferred column");
            dataset_columns.push(DatasetColumn {
                descriptor: ColumnDescriptor {
                    raw_name,
                    name,
                    data_type,
                },
                values,
                coerced,
            });
        }

        Ok(Self {
            columns: dataset_columns,
            row_count,
        })
    }

    pub fn columns(&self) -> &[DatasetColumn] {
        &self.columns
    }

    pub fn descriptors(&self) -> Vec<ColumnDescriptor> {
        self.columns
            .iter()
            .map(|column| column.descriptor.clone())
            .collect()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|column| column.descriptor.name.as_str())
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn coerced_cells(&self) -> usize {
        self.columns.iter().map(|column| column.coerced).sum()
    }
}

// Spreadsheet and dataframe exports leave blank or "Unnamed: N" headers over index columns.
fn is_index_artifact(header: &str) -> bool {
    let header = header.trim();
    header.is_empty() || header.to_lowercase().starts_with("unnamed")
}
