use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::ddl::TableIdentity;
use crate::{EngineError, EngineResult};

pub const DEFAULT_DATABASE: &str = "csvload.duckdb";
pub const DEFAULT_SCHEMA: &str = "main";
pub const DEFAULT_TABLE: &str = "nashville_housing";
pub const DEFAULT_SOURCE_PATH: &str = "data/nashville_housing.csv";
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 20;
pub const DEFAULT_CONNECT_DELAY: Duration = Duration::from_secs(3);

pub const ENV_DATABASE: &str = "CSVLOAD_DATABASE";
pub const ENV_SCHEMA: &str = "CSVLOAD_SCHEMA";
pub const ENV_TABLE: &str = "CSVLOAD_TABLE";
pub const ENV_SOURCE_PATH: &str = "CSV_PATH";
pub const ENV_CONNECT_ATTEMPTS: &str = "CSVLOAD_CONNECT_ATTEMPTS";
pub const ENV_CONNECT_DELAY_SECS: &str = "CSVLOAD_CONNECT_DELAY_SECS";

/// Everything one run needs. Built from defaults, then the environment, then
/// explicit overrides from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadConfig {
    /// DuckDB database file.
    pub database: PathBuf,
    pub schema: String,
    pub table: String,
    pub source_path: PathBuf,
    pub connect_attempts: u32,
    pub connect_delay: Duration,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            schema: DEFAULT_SCHEMA.to_string(),
            table: DEFAULT_TABLE.to_string(),
            source_path: PathBuf::from(DEFAULT_SOURCE_PATH),
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            connect_delay: DEFAULT_CONNECT_DELAY,
        }
    }
}

impl LoadConfig {
    pub fn from_env() -> EngineResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`LoadConfig::from_env`] with the variable source injected.
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> EngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(value) = get(ENV_DATABASE) {
            config.database = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_SCHEMA) {
            config.schema = value.trim().to_string();
        }
        if let Some(value) = get(ENV_TABLE) {
            config.table = value.trim().to_string();
        }
        if let Some(value) = get(ENV_SOURCE_PATH) {
            config.source_path = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_CONNECT_ATTEMPTS) {
            config.connect_attempts = parse_number(ENV_CONNECT_ATTEMPTS, &value)?;
        }
        if let Some(value) = get(ENV_CONNECT_DELAY_SECS) {
            config.connect_delay = Duration::from_secs(parse_number(ENV_CONNECT_DELAY_SECS, &value)?);
        }

        Ok(config)
    }

    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = path.into();
        self
    }

    /// Takes `table` or `schema.table`.
    pub fn with_target(mut self, target: &str) -> EngineResult<Self> {
        let identity = TableIdentity::parse(target, &self.schema)?;
        self.schema = identity.schema;
        self.table = identity.table;
        Ok(self)
    }

    pub fn target(&self) -> EngineResult<TableIdentity> {
        TableIdentity::new(&self.schema, &self.table)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> EngineResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| EngineError::InvalidConfig(format!("{key} must be a non-negative integer, got {value:?}")))
}
