use std::path::Path;
use std::thread;
use std::time::Duration;

use duckdb::Connection;
use tracing::{info, warn};

use crate::{EngineError, EngineResult};

pub struct DbManager {
    conn: Connection,
}

impl DbManager {
    pub fn open_file(path: &Path) -> EngineResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Opens `path`, retrying up to `attempts` times with a fixed `delay`
    /// between tries. Each failed try is logged; only the last error survives.
    pub fn connect_with_retry(path: &Path, attempts: u32, delay: Duration) -> EngineResult<Self> {
        let attempts = attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match Self::open_file(path) {
                Ok(manager) => {
                    info!(database = %path.display(), attempt, "database is reachable");
                    return Ok(manager);
                }
                Err(err) => {
                    warn!(
                        database = %path.display(),
                        attempt,
                        attempts,
                        error = %err,
                        "database not ready yet"
                    );
                    last_error = err.to_string();
                    if attempt < attempts {
                        thread::sleep(delay);
                    }
                }
            }
        }

        Err(EngineError::ConnectionUnavailable {
            attempts,
            last_error,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}
