use std::fmt;

use duckdb::Connection;
use serde::Serialize;
use tracing::{error, info};

use crate::bulk::bulk_copy;
use crate::config::LoadConfig;
use crate::dataset::{ColumnDescriptor, Dataset};
use crate::db_manager::DbManager;
use crate::ddl::{generate_create_statement, TableIdentity};
use crate::schema::{missing_columns, table_exists, table_schema};
use crate::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    AwaitingConnection,
    SchemaCheck,
    Creating,
    ReadyToLoad,
    Loading,
    Done,
    Failed,
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadPhase::AwaitingConnection => "awaiting_connection",
            LoadPhase::SchemaCheck => "schema_check",
            LoadPhase::Creating => "creating",
            LoadPhase::ReadyToLoad => "ready_to_load",
            LoadPhase::Loading => "loading",
            LoadPhase::Done => "done",
            LoadPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub status: &'static str,
    pub table: String,
    pub created: bool,
    pub rows_loaded: usize,
    pub coerced_cells: usize,
    pub columns: Vec<ColumnDescriptor>,
    pub phase: LoadPhase,
}

/// Create-or-append of one CSV file into one table.
///
/// Table creation and the row copy share a transaction: either the table (when
/// it had to be created) and every row commit together, or nothing does.
/// Connecting is the only step that is retried.
pub struct Loader {
    config: LoadConfig,
    phase: LoadPhase,
    failed_from: Option<LoadPhase>,
}

impl Loader {
    pub fn new(config: LoadConfig) -> Self {
        Self {
            config,
            phase: LoadPhase::AwaitingConnection,
            failed_from: None,
        }
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    /// Phase the run was in when it failed.
    pub fn failed_from(&self) -> Option<LoadPhase> {
        self.failed_from
    }

    /// Reads the configured CSV, connects, and loads it. The input is read
    /// before any connection attempt so a missing file never touches the database.
    pub fn run(&mut self) -> EngineResult<LoadReport> {
        let result = self.run_inner();
        if result.is_err() {
            self.transition(LoadPhase::Failed);
        }
        result
    }

    fn run_inner(&mut self) -> EngineResult<LoadReport> {
        let target = self.config.target()?;
        info!(source = %self.config.source_path.display(), "reading CSV");
        let dataset = Dataset::read_csv(&self.config.source_path)?;
        info!(
            rows = dataset.row_count(),
            columns = dataset.columns().len(),
            "CSV parsed"
        );

        let mut db = DbManager::connect_with_retry(
            &self.config.database,
            self.config.connect_attempts,
            self.config.connect_delay,
        )?;
        self.load_into(db.connection_mut(), &target, &dataset)
    }

    /// Loads an already-built dataset over a ready connection.
    pub fn load_dataset(&mut self, conn: &mut Connection, dataset: &Dataset) -> EngineResult<LoadReport> {
        let result = self
            .config
            .target()
            .and_then(|target| self.load_into(conn, &target, dataset));
        if result.is_err() {
            self.transition(LoadPhase::Failed);
        }
        result
    }

    fn load_into(
        &mut self,
        conn: &mut Connection,
        target: &TableIdentity,
        dataset: &Dataset,
    ) -> EngineResult<LoadReport> {
        self.transition(LoadPhase::SchemaCheck);
        let exists = table_exists(conn, target)
            .map_err(|err| EngineError::SchemaCheckFailure(err.to_string()))?;

        // Dropping `tx` on any early return rolls back the DDL and the copy together.
        let tx = conn
            .transaction()
            .map_err(|err| EngineError::Database(err.to_string()))?;

        if exists {
            info!(table = %target, "table exists, rows will be appended");
            self.transition(LoadPhase::ReadyToLoad);
            ensure_compatible(&tx, target, dataset)?;
        } else {
            info!(table = %target, "table does not exist, creating");
            self.transition(LoadPhase::Creating);
            let ddl = generate_create_statement(&dataset.descriptors(), target)?;
            execute_create(&tx, target, &ddl)?;
        }

        self.transition(LoadPhase::Loading);
        bulk_copy(&tx, target, dataset)?;
        tx.commit()
            .map_err(|err| EngineError::BulkLoadFailure(format!("commit: {err}")))?;

        self.transition(LoadPhase::Done);
        info!(table = %target, rows = dataset.row_count(), created = !exists, "load committed");
        Ok(LoadReport {
            status: "ok",
            table: target.to_string(),
            created: !exists,
            rows_loaded: dataset.row_count(),
            coerced_cells: dataset.coerced_cells(),
            columns: dataset.descriptors(),
            phase: self.phase,
        })
    }

    fn transition(&mut self, next: LoadPhase) {
        if next == LoadPhase::Failed {
            error!(from = %self.phase, "load failed");
            self.failed_from = Some(self.phase);
        } else {
            info!(from = %self.phase, to = %next, "load phase");
        }
        self.phase = next;
    }
}

/// Every dataset column must already exist on an append target.
fn ensure_compatible(conn: &Connection, target: &TableIdentity, dataset: &Dataset) -> EngineResult<()> {
    let existing = table_schema(conn, target)
        .map_err(|err| EngineError::SchemaCheckFailure(err.to_string()))?;
    let missing = missing_columns(&existing, &dataset.column_names());
    if missing.is_empty() {
        return Ok(());
    }
    Err(EngineError::SchemaMismatch {
        table: target.to_string(),
        missing,
    })
}

fn execute_create(conn: &Connection, target: &TableIdentity, ddl: &str) -> EngineResult<()> {
    info!(table = %target, ddl = %ddl, "executing DDL");
    conn.execute_batch(ddl)
        .map_err(|err| EngineError::DdlExecutionFailure(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RawTable;
    use std::io::Write;
    use std::path::PathBuf;
    use std::time::Duration;

    fn dataset(content: &str) -> Dataset {
        let raw = RawTable::from_reader(content.as_bytes()).expect("read csv");
        Dataset::from_raw(raw).expect("dataset")
    }

    fn config(table: &str) -> LoadConfig {
        LoadConfig {
            table: table.to_string(),
            connect_attempts: 1,
            connect_delay: Duration::ZERO,
            ..LoadConfig::default()
        }
    }

    fn row_count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .expect("count rows")
    }

    fn target(table: &str) -> TableIdentity {
        TableIdentity::new("main", table).expect("target")
    }

    #[test]
    fn first_load_creates_table_with_id_column() {
        let mut db = DbManager::open_in_memory().expect("db");
        let data = dataset("Sale Date,Price,Owner\n2024-01-01,250000,A Corp\n2024-02-01,300000,B LLC\n");

        let mut loader = Loader::new(config("sales"));
        let report = loader.load_dataset(db.connection_mut(), &data).expect("load");

        assert!(report.created);
        assert_eq!(report.rows_loaded, 2);
        assert_eq!(report.phase, LoadPhase::Done);
        assert_eq!(loader.phase(), LoadPhase::Done);

        let columns = table_schema(db.connection(), &target("sales")).expect("schema");
        let names: Vec<&str> = columns.iter().map(|column| column.name.as_str()).collect();
        assert_eq!(names, vec!["id", "sale_date", "price", "owner"]);
        assert_eq!(columns[1].data_type, "DATE");
        assert_eq!(columns[2].data_type, "BIGINT");

        let tables: i64 = db
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'main'",
                [],
                |row| row.get(0),
            )
            .expect("table count");
        assert_eq!(tables, 1);
    }

    #[test]
    fn second_load_appends_without_ddl() {
        let mut db = DbManager::open_in_memory().expect("db");
        let first = dataset("City,Population\nOakland,433031\nFresno,542107\n");
        let second = dataset("City,Population\nSalem,175535\n");

        let first_report = Loader::new(config("cities"))
            .load_dataset(db.connection_mut(), &first)
            .expect("first load");
        let second_report = Loader::new(config("cities"))
            .load_dataset(db.connection_mut(), &second)
            .expect("second load");

        assert!(first_report.created);
        assert!(!second_report.created);
        assert_eq!(row_count(db.connection(), "cities"), 3);

        let ids: Vec<i64> = db
            .connection()
            .prepare("SELECT id FROM cities ORDER BY id")
            .expect("prepare")
            .query_map([], |row| row.get(0))
            .expect("query")
            .collect::<Result<_, _>>()
            .expect("ids");
        assert_eq!(ids.len(), 3);
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));

        let last_city: String = db
            .connection()
            .query_row("SELECT city FROM cities ORDER BY id DESC LIMIT 1", [], |row| row.get(0))
            .expect("last city");
        assert_eq!(last_city, "Salem");
    }

    #[test]
    fn failed_copy_rolls_back_table_creation() {
        let mut db = DbManager::open_in_memory().expect("db");
        let declared = dataset("price\n1\n2\n");
        let actual = dataset("price\nabc\n");
        let sales = target("sales");
        let ddl = generate_create_statement(&declared.descriptors(), &sales).expect("ddl");

        {
            let tx = db.connection_mut().transaction().expect("transaction");
            execute_create(&tx, &sales, &ddl).expect("ddl runs");
            let err = bulk_copy(&tx, &sales, &actual).expect_err("copy must fail");
            assert!(matches!(err, EngineError::BulkLoadFailure(_)), "{err}");
        }
        assert!(!table_exists(db.connection(), &sales).expect("exists check"));
    }

    #[test]
    fn failed_copy_on_append_keeps_existing_rows() {
        let mut db = DbManager::open_in_memory().expect("db");
        Loader::new(config("sales"))
            .load_dataset(db.connection_mut(), &dataset("price\n1\n2\n"))
            .expect("first load");

        let mut loader = Loader::new(config("sales"));
        let err = loader
            .load_dataset(db.connection_mut(), &dataset("price\nabc\n"))
            .expect_err("copy must fail");
        assert!(matches!(err, EngineError::BulkLoadFailure(_)), "{err}");
        assert_eq!(loader.failed_from(), Some(LoadPhase::Loading));
        assert_eq!(row_count(db.connection(), "sales"), 2);
    }

    #[test]
    fn rejected_ddl_fails_from_creating() {
        let mut db = DbManager::open_in_memory().expect("db");
        let mut loader = Loader::new(LoadConfig {
            schema: "staging".to_string(),
            ..config("sales")
        });

        let err = loader
            .load_dataset(db.connection_mut(), &dataset("price\n1\n"))
            .expect_err("ddl must fail");
        assert!(matches!(err, EngineError::DdlExecutionFailure(_)), "{err}");
        assert_eq!(loader.phase(), LoadPhase::Failed);
        assert_eq!(loader.failed_from(), Some(LoadPhase::Creating));

        let staging = TableIdentity::new("staging", "sales").expect("target");
        assert!(!table_exists(db.connection(), &staging).expect("exists check"));
    }

    #[test]
    fn table_name_case_does_not_split_create_and_append() {
        let mut db = DbManager::open_in_memory().expect("db");
        let first = Loader::new(config("Sales"))
            .load_dataset(db.connection_mut(), &dataset("price\n1\n"))
            .expect("first load");
        assert!(first.created);

        let mut mismatched = Loader::new(config("sales"));
        let err = mismatched
            .load_dataset(db.connection_mut(), &dataset("price,owner\n2,A Corp\n"))
            .expect_err("mismatch");
        assert!(matches!(err, EngineError::SchemaMismatch { .. }), "{err}");
        assert_eq!(mismatched.failed_from(), Some(LoadPhase::ReadyToLoad));

        let second = Loader::new(config("sales"))
            .load_dataset(db.connection_mut(), &dataset("price\n3\n"))
            .expect("append");
        assert!(!second.created);
        assert_eq!(row_count(db.connection(), "sales"), 2);

        let tables: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM information_schema.tables", [], |row| row.get(0))
            .expect("table count");
        assert_eq!(tables, 1);
    }

    #[test]
    fn append_with_unknown_columns_fails_fast() {
        let mut db = DbManager::open_in_memory().expect("db");
        Loader::new(config("sales"))
            .load_dataset(db.connection_mut(), &dataset("price\n1\n"))
            .expect("first load");

        let mut loader = Loader::new(config("sales"));
        let err = loader
            .load_dataset(db.connection_mut(), &dataset("price,owner\n2,A Corp\n"))
            .expect_err("mismatch");
        match err {
            EngineError::SchemaMismatch { table, missing } => {
                assert_eq!(table, "main.sales");
                assert_eq!(missing, vec!["owner"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(loader.phase(), LoadPhase::Failed);
        assert_eq!(row_count(db.connection(), "sales"), 1);
    }

    #[test]
    fn append_accepts_column_subset() {
        let mut db = DbManager::open_in_memory().expect("db");
        Loader::new(config("sales"))
            .load_dataset(db.connection_mut(), &dataset("price,owner\n1,A Corp\n"))
            .expect("first load");
        Loader::new(config("sales"))
            .load_dataset(db.connection_mut(), &dataset("owner\nB LLC\n"))
            .expect("subset load");
        assert_eq!(row_count(db.connection(), "sales"), 2);
    }

    #[test]
    fn missing_input_fails_before_connecting() {
        let mut loader = Loader::new(LoadConfig {
            source_path: PathBuf::from("/definitely/not/here.csv"),
            database: PathBuf::from("/nonexistent_csvload_dir/db.duckdb"),
            ..config("sales")
        });
        let err = loader.run().expect_err("missing input");
        assert!(matches!(err, EngineError::InputNotFound(_)), "{err}");
        assert_eq!(loader.phase(), LoadPhase::Failed);
    }

    #[test]
    fn unreachable_database_is_connection_unavailable() {
        let mut csv = tempfile::NamedTempFile::new().expect("temp csv");
        writeln!(csv, "a\n1").expect("write csv");
        let mut loader = Loader::new(LoadConfig {
            source_path: csv.path().to_path_buf(),
            database: PathBuf::from("/nonexistent_csvload_dir/db.duckdb"),
            connect_attempts: 2,
            ..config("sales")
        });
        let err = loader.run().expect_err("unreachable");
        assert!(matches!(err, EngineError::ConnectionUnavailable { attempts: 2, .. }), "{err}");
    }

    #[test]
    fn run_loads_file_end_to_end() {
        let dir = tempfile::tempdir().expect("temp dir");
        let csv_path = dir.path().join("housing.csv");
        let mut csv = std::fs::File::create(&csv_path).expect("create csv");
        writeln!(csv, "Unnamed: 0,Sale Date,Price,Owner").expect("write header");
        writeln!(csv, "0,2024-01-01,250000,A Corp").expect("write row");
        writeln!(csv, "1,,bad,B LLC").expect("write row");
        drop(csv);

        let db_path = dir.path().join("warehouse.duckdb");
        let config = LoadConfig {
            database: db_path.clone(),
            source_path: csv_path,
            ..config("housing")
        };

        let first = Loader::new(config.clone()).run().expect("first run");
        let second = Loader::new(config).run().expect("second run");
        assert!(first.created);
        assert!(!second.created);

        let types: Vec<(String, String)> = first
            .columns
            .iter()
            .map(|column| (column.name.clone(), column.data_type.to_string()))
            .collect();
        assert_eq!(
            types,
            vec![
                ("sale_date".to_string(), "DATE".to_string()),
                ("price".to_string(), "TEXT".to_string()),
                ("owner".to_string(), "TEXT".to_string()),
            ]
        );

        let db = DbManager::open_file(&db_path).expect("reopen");
        assert_eq!(row_count(db.connection(), "housing"), 4);
        let missing_dates: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM housing WHERE sale_date IS NULL", [], |row| row.get(0))
            .expect("null dates");
        assert_eq!(missing_dates, 2);
    }
}
