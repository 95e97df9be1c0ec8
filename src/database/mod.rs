//! Relational result store
//!
//! A thin wrapper over a SQLite connection that keeps one summary row per
//! training run in `model_results`. Statement failures are rolled back and
//! logged rather than raised: writes report `false`, reads return no rows.

use crate::error::{Result, WineError};
use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, error, info};

/// A single SQL value, as bound into statements and returned by queries
pub use rusqlite::types::Value as SqlValue;

/// Path that opens a private in-memory database
pub const IN_MEMORY: &str = ":memory:";

const CREATE_MODEL_RESULTS: &str = "CREATE TABLE IF NOT EXISTS model_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    accuracy REAL,
    loss REAL,
    model_name TEXT,
    run_id TEXT
)";

const INSERT_MODEL_RESULT: &str =
    "INSERT INTO model_results (accuracy, loss, model_name, run_id) VALUES (?1, ?2, ?3, ?4)";

const SELECT_MODEL_RESULTS: &str =
    "SELECT id, accuracy, loss, model_name, run_id FROM model_results ORDER BY id";

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// One row of `model_results`.
///
/// `accuracy` holds the train R² and `loss` the test R².
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub id: Option<i64>,
    pub accuracy: f64,
    pub loss: f64,
    pub model_name: String,
    pub run_id: Option<String>,
}

impl ModelResult {
    pub fn new(accuracy: f64, loss: f64, model_name: impl Into<String>) -> Self {
        Self {
            id: None,
            accuracy,
            loss,
            model_name: model_name.into(),
            run_id: None,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    fn from_row(row: &[SqlValue]) -> Option<Self> {
        let id = match row.first()? {
            SqlValue::Integer(i) => Some(*i),
            _ => None,
        };
        Some(Self {
            id,
            accuracy: as_f64(row.get(1)?)?,
            loss: as_f64(row.get(2)?)?,
            model_name: match row.get(3)? {
                SqlValue::Text(s) => s.clone(),
                _ => String::new(),
            },
            run_id: match row.get(4)? {
                SqlValue::Text(s) => Some(s.clone()),
                _ => None,
            },
        })
    }
}

fn as_f64(value: &SqlValue) -> Option<f64> {
    match value {
        SqlValue::Real(f) => Some(*f),
        SqlValue::Integer(i) => Some(*i as f64),
        _ => None,
    }
}

/// Wrapper around a SQLite database holding `model_results`
#[derive(Debug)]
pub struct ResultStore {
    path: String,
    conn: Option<Connection>,
}

impl ResultStore {
    /// Create a store for `path` without connecting. Use [`IN_MEMORY`] for a scratch database.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            conn: None,
        }
    }

    /// Connect and make sure `model_results` exists.
    pub fn open(path: impl Into<String>) -> Result<Self> {
        let mut store = Self::new(path);
        store.connect()?;
        if !store.create_table_if_not_exists() {
            return Err(WineError::DatabaseError(
                "failed to create model_results table".to_string(),
            ));
        }
        Ok(store)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> ConnectionState {
        if self.conn.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Open the database file, creating it and its parent directory if needed.
    pub fn connect(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }
        info!(path = %self.path, "Connecting to result store");

        let opened = self.prepare_location().and_then(|_| {
            Connection::open(&self.path).map_err(WineError::from)
        });
        match opened {
            Ok(conn) => {
                self.conn = Some(conn);
                info!(path = %self.path, "Connected to result store");
                Ok(())
            }
            Err(e) => {
                error!(path = %self.path, error = %e, "Failed to connect to result store");
                Err(e)
            }
        }
    }

    fn prepare_location(&self) -> Result<()> {
        if self.path == IN_MEMORY {
            return Ok(());
        }
        if let Some(parent) = Path::new(&self.path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    /// Create `model_results` if absent. Failures are logged and reported as `false`.
    pub fn create_table_if_not_exists(&mut self) -> bool {
        let created = self.execute(CREATE_MODEL_RESULTS, &[]);
        if created {
            debug!("Table 'model_results' is ready");
        }
        created
    }

    /// Run one statement in its own transaction.
    ///
    /// Returns `false` after rolling back and logging when the statement fails,
    /// or when the store is not connected.
    pub fn execute(&mut self, sql: &str, params: &[SqlValue]) -> bool {
        let Some(conn) = self.conn.as_mut() else {
            error!(sql, "Execute called on a disconnected result store");
            return false;
        };

        let outcome = conn.transaction().and_then(|tx| {
            let changed = tx.execute(sql, params_from_iter(params.iter()))?;
            tx.commit()?;
            Ok(changed)
        });

        match outcome {
            Ok(changed) => {
                debug!(sql, rows = changed, "Statement executed");
                true
            }
            Err(e) => {
                // The transaction rolls back when dropped uncommitted.
                error!(sql, error = %e, "Statement failed, rolled back");
                false
            }
        }
    }

    /// Run a query and return every row. Failures are logged and yield no rows.
    pub fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> Vec<Vec<SqlValue>> {
        let Some(conn) = self.conn.as_ref() else {
            error!(sql, "Fetch called on a disconnected result store");
            return Vec::new();
        };

        match Self::query_rows(conn, sql, params) {
            Ok(rows) => rows,
            Err(e) => {
                error!(sql, error = %e, "Query failed");
                Vec::new()
            }
        }
    }

    fn query_rows(conn: &Connection, sql: &str, params: &[SqlValue]) -> rusqlite::Result<Vec<Vec<SqlValue>>> {
        let mut stmt = conn.prepare(sql)?;
        let n_cols = stmt.column_count();
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
            (0..n_cols)
                .map(|i| row.get::<_, SqlValue>(i))
                .collect::<rusqlite::Result<Vec<SqlValue>>>()
        })?;
        rows.collect()
    }

    /// Insert one summary row
    pub fn insert_result(&mut self, result: &ModelResult) -> bool {
        let params = [
            SqlValue::Real(result.accuracy),
            SqlValue::Real(result.loss),
            SqlValue::Text(result.model_name.clone()),
            result
                .run_id
                .clone()
                .map(SqlValue::Text)
                .unwrap_or(SqlValue::Null),
        ];
        self.execute(INSERT_MODEL_RESULT, &params)
    }

    /// All summary rows, oldest first
    pub fn fetch_results(&self) -> Vec<ModelResult> {
        self.fetch_all(SELECT_MODEL_RESULTS, &[])
            .iter()
            .filter_map(|row| ModelResult::from_row(row))
            .collect()
    }

    /// Close the connection. Calling it again is a no-op.
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                error!(path = %self.path, error = %e, "Error while closing result store");
            }
            info!(path = %self.path, "Result store connection closed");
        }
    }
}

impl Drop for ResultStore {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store() -> ResultStore {
        ResultStore::open(IN_MEMORY).unwrap()
    }

    #[test]
    fn test_starts_disconnected() {
        let store = ResultStore::new(IN_MEMORY);
        assert_eq!(store.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_insert_then_fetch() {
        let mut store = memory_store();
        assert!(store.insert_result(&ModelResult::new(0.95, 0.45, "random_forest_regressor")));

        let rows = store.fetch_all("SELECT accuracy, loss, model_name FROM model_results", &[]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], SqlValue::Real(0.95));
        assert_eq!(rows[0][1], SqlValue::Real(0.45));
        assert_eq!(rows[0][2], SqlValue::Text("random_forest_regressor".to_string()));
    }

    #[test]
    fn test_failed_statement_returns_false_and_store_stays_usable() {
        let mut store = memory_store();
        assert!(!store.execute("INSERT INTO missing_table VALUES (1)", &[]));
        assert!(store.insert_result(&ModelResult::new(1.0, 0.5, "m").with_run_id("abc")));
        assert_eq!(store.fetch_results().len(), 1);
    }

    #[test]
    fn test_bad_query_yields_empty() {
        let store = memory_store();
        assert!(store.fetch_all("SELECT nope FROM nowhere", &[]).is_empty());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut store = memory_store();
        store.close();
        store.close();
        assert_eq!(store.state(), ConnectionState::Disconnected);
        assert!(!store.execute("SELECT 1", &[]));
        assert!(store.fetch_all("SELECT 1", &[]).is_empty());
    }
}
