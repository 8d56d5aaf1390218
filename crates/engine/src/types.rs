use std::fmt;

/// Everything that can stop a run. Each load phase maps its database failures
/// to its own variant so callers can tell where the run died.
#[derive(Debug)]
pub enum EngineError {
    InputNotFound(String),
    InvalidInput(String),
    InvalidConfig(String),
    ConnectionUnavailable { attempts: u32, last_error: String },
    SchemaCheckFailure(String),
    SchemaMismatch { table: String, missing: Vec<String> },
    DdlExecutionFailure(String),
    BulkLoadFailure(String),
    Database(String),
    Io(String),
    Serialization(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InputNotFound(path) => write!(f, "input file not found: {}", path),
            EngineError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            EngineError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            EngineError::ConnectionUnavailable {
                attempts,
                last_error,
            } => write!(
                f,
                "database unreachable after {} attempts: {}",
                attempts, last_error
            ),
            EngineError::SchemaCheckFailure(msg) => write!(f, "schema check failed: {}", msg),
            EngineError::SchemaMismatch { table, missing } => write!(
                f,
                "table {} is missing columns: {}",
                table,
                missing.join(", ")
            ),
            EngineError::DdlExecutionFailure(msg) => write!(f, "create table failed: {}", msg),
            EngineError::BulkLoadFailure(msg) => write!(f, "bulk load failed: {}", msg),
            EngineError::Database(msg) => write!(f, "database error: {}", msg),
            EngineError::Io(msg) => write!(f, "IO error: {}", msg),
            EngineError::Serialization(msg) => write!(f, "serialization error: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err.to_string())
    }
}

impl From<csv::Error> for EngineError {
    fn from(err: csv::Error) -> Self {
        EngineError::InvalidInput(err.to_string())
    }
}

impl From<duckdb::Error> for EngineError {
    fn from(err: duckdb::Error) -> Self {
        EngineError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
