//! CSV to DuckDB loading: header sanitizing, column type inference, conditional
//! table creation and transactional bulk copy.

mod bulk;
mod config;
mod dataset;
mod db_manager;
mod ddl;
mod executor;
mod identifiers;
mod inference;
mod ingest;
mod schema;
mod types;

pub use bulk::{bulk_copy, copy_statement, write_copy_stream};
pub use config::LoadConfig;
pub use dataset::{ColumnDescriptor, Dataset, DatasetColumn, RawTable};
pub use db_manager::DbManager;
pub use ddl::{generate_create_statement, TableIdentity, ID_COLUMN};
pub use executor::{execute_command, execute_command_with, InferResult};
pub use identifiers::{quote_identifier, sanitize_identifier, unique_identifiers, validate_identifier};
pub use inference::{infer_type, parse_date, Column, InferredType, DATE_SAMPLE_SIZE};
pub use ingest::{LoadPhase, LoadReport, Loader};
pub use schema::{missing_columns, table_exists, table_schema, TableColumn};
pub use types::{EngineError, EngineResult};
