//! Statement execution against a SQLite file.
//!
//! [`run_sql`] never fails: every outcome, including engine errors, is folded into
//! a [`QueryResult`] so callers can hand it straight back to the model.
//!
//! Dispatch rules:
//!
//! - text whose first word is `SELECT` is read eagerly into [`QueryResult::Rows`]
//! - trailing `;` are ignored; text still containing `;` runs as a batch inside one
//!   transaction, or as-is when the script opens and closes its own
//! - anything else runs as a single autocommitted statement; if it nevertheless
//!   yields a result set (`PRAGMA`, `WITH ...`, `VALUES`) the rows are returned

use std::path::Path;
use std::time::{Duration, Instant};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Statement};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};

const BUSY_TIMEOUT_MS: u64 = 5000;

/// A single SQLite cell
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Integer(i),
            ValueRef::Real(f) => SqlValue::Real(f),
            ValueRef::Text(s) => SqlValue::Text(String::from_utf8_lossy(s).into_owned()),
            ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
        }
    }
}

impl SqlValue {
    pub fn to_json(&self) -> Value {
        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(i) => Value::from(*i),
            SqlValue::Real(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SqlValue::Text(s) => Value::String(s.clone()),
            SqlValue::Blob(_) => Value::String("<BLOB>".to_string()),
        }
    }
}

impl Serialize for SqlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Normalized outcome of one [`run_sql`] call
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<SqlValue>>,
    },
    Mutation {
        rows_affected: u64,
        last_insert_rowid: Option<i64>,
    },
    Error {
        message: String,
    },
}

impl QueryResult {
    pub fn error(message: impl Into<String>) -> Self {
        QueryResult::Error {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryResult::Error { .. })
    }

    /// Number of rows in a result set; zero for mutations and errors
    pub fn row_count(&self) -> usize {
        match self {
            QueryResult::Rows { rows, .. } => rows.len(),
            _ => 0,
        }
    }

    /// Rows as JSON objects keyed by column name, in column order.
    ///
    /// Repeated column names (`SELECT a.id, b.id ...`) get a `:<n>` suffix so every
    /// object carries exactly one key per column.
    pub fn row_objects(&self) -> Vec<Map<String, Value>> {
        let QueryResult::Rows { columns, rows } = self else {
            return Vec::new();
        };

        let keys = unique_keys(columns);
        rows.iter()
            .map(|row| {
                keys.iter()
                    .cloned()
                    .zip(row.iter().map(SqlValue::to_json))
                    .collect()
            })
            .collect()
    }
}

fn unique_keys(columns: &[String]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::with_capacity(columns.len());
    for column in columns {
        let mut key = column.clone();
        let mut n = 1;
        while keys.contains(&key) {
            key = format!("{}:{}", column, n);
            n += 1;
        }
        keys.push(key);
    }
    keys
}

impl Serialize for QueryResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            QueryResult::Rows { columns, .. } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("status", "ok")?;
                map.serialize_entry("columns", columns)?;
                map.serialize_entry("rows", &self.row_objects())?;
                map.end()
            }
            QueryResult::Mutation {
                rows_affected,
                last_insert_rowid,
            } => {
                let len = if last_insert_rowid.is_some() { 3 } else { 2 };
                let mut map = serializer.serialize_map(Some(len))?;
                map.serialize_entry("status", "ok")?;
                map.serialize_entry("rows_affected", rows_affected)?;
                if let Some(id) = last_insert_rowid {
                    map.serialize_entry("lastrowid", id)?;
                }
                map.end()
            }
            QueryResult::Error { message } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("status", "error")?;
                map.serialize_entry("error", message)?;
                map.end()
            }
        }
    }
}

/// Run `sql` against the database at `db_path`.
///
/// A fresh connection is opened for every call and released before returning.
/// A missing file is reported, never created.
pub fn run_sql(db_path: impl AsRef<Path>, sql: &str) -> QueryResult {
    let sql = sql.trim_end_matches(|c: char| c == ';' || c.is_whitespace()).trim_start();
    if sql.is_empty() {
        return QueryResult::error("Empty SQL query");
    }

    let path = db_path.as_ref();
    if !path.is_file() {
        return QueryResult::error(format!("Database not found: {}", path.display()));
    }

    let start = Instant::now();
    let result = execute(path, sql).unwrap_or_else(|e| QueryResult::error(engine_message(e)));

    tracing::debug!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        rows = result.row_count(),
        error = result.is_error(),
        "executed sql"
    );
    result
}

/// The engine's own wording, without the statement text rusqlite appends
fn engine_message(error: rusqlite::Error) -> String {
    match error {
        rusqlite::Error::SqliteFailure(_, Some(message)) => message,
        rusqlite::Error::SqlInputError { msg, .. } => msg,
        other => other.to_string(),
    }
}

fn execute(path: &Path, sql: &str) -> rusqlite::Result<QueryResult> {
    let mut conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;

    let first_word = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();

    if first_word == "SELECT" {
        let mut stmt = conn.prepare(sql)?;
        return collect_rows(&mut stmt);
    }

    if sql.contains(';') {
        return execute_batch(&mut conn, sql);
    }

    let mut stmt = conn.prepare(sql)?;
    if stmt.column_count() > 0 {
        return collect_rows(&mut stmt);
    }

    let changes = stmt.execute([])?;
    let last_insert_rowid = matches!(first_word.as_str(), "INSERT" | "REPLACE")
        .then(|| conn.last_insert_rowid());

    Ok(QueryResult::Mutation {
        rows_affected: changes as u64,
        last_insert_rowid,
    })
}

fn collect_rows(stmt: &mut Statement<'_>) -> rusqlite::Result<QueryResult> {
    let columns: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let width = columns.len();

    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get_ref(i).map(SqlValue::from))
                .collect::<rusqlite::Result<Vec<_>>>()
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(QueryResult::Rows { columns, rows })
}

fn execute_batch(conn: &mut Connection, sql: &str) -> rusqlite::Result<QueryResult> {
    let before = total_changes(conn)?;

    if has_transaction_control(sql) {
        conn.execute_batch(sql)?;
    } else {
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.commit()?;
    }

    let after = total_changes(conn)?;
    Ok(QueryResult::Mutation {
        rows_affected: after.saturating_sub(before).max(0) as u64,
        last_insert_rowid: None,
    })
}

fn has_transaction_control(sql: &str) -> bool {
    sql.split(';').any(|statement| {
        let keyword = statement
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        matches!(
            keyword.as_str(),
            "BEGIN" | "COMMIT" | "END" | "ROLLBACK" | "SAVEPOINT" | "RELEASE"
        )
    })
}

fn total_changes(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT total_changes()", [], |row| row.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn fixture() -> NamedTempFile {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = Connection::open(temp_file.path()).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                score REAL
            );
            CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER, title TEXT);
            INSERT INTO users (name, score) VALUES ('alice', 9.5);
            INSERT INTO users (name, score) VALUES ('bob', NULL);
            INSERT INTO posts (user_id, title) VALUES (1, 'hello');
        "#,
        )
        .unwrap();
        temp_file
    }

    fn count_users(db: &NamedTempFile) -> i64 {
        let conn = Connection::open(db.path()).unwrap();
        conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_select_rows() {
        let db = fixture();
        let result = run_sql(db.path(), "  select id, name, score FROM users ORDER BY id ");

        match &result {
            QueryResult::Rows { columns, rows } => {
                assert_eq!(columns, &vec!["id", "name", "score"]);
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0][1], SqlValue::Text("alice".to_string()));
                assert_eq!(rows[1][2], SqlValue::Null);
            }
            other => panic!("Expected rows, got {other:?}"),
        }

        for object in result.row_objects() {
            assert_eq!(object.len(), 3);
        }
    }

    #[test]
    fn test_duplicate_columns_get_suffixed_keys() {
        let db = fixture();
        let result = run_sql(
            db.path(),
            "SELECT u.id, p.id, p.title FROM users u JOIN posts p ON p.user_id = u.id",
        );

        let objects = result.row_objects();
        assert_eq!(objects.len(), 1);
        let keys: Vec<&String> = objects[0].keys().collect();
        assert_eq!(keys, vec!["id", "id:1", "title"]);
    }

    #[test]
    fn test_empty_sql() {
        let result = run_sql("/definitely/not/here.db", "   ");
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({"status": "error", "error": "Empty SQL query"})
        );
    }

    #[test]
    fn test_missing_database_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");

        let result = run_sql(&path, "SELECT 1");
        assert_eq!(
            result,
            QueryResult::error(format!("Database not found: {}", path.display()))
        );
        assert!(!path.exists());
    }

    #[test]
    fn test_invalid_sql_is_an_error_result() {
        let db = fixture();
        let result = run_sql(db.path(), "SELECT * FROM no_such_table");
        match result {
            QueryResult::Error { message } => assert_eq!(message, "no such table: no_such_table"),
            other => panic!("Expected error, got {other:?}"),
        }

        assert!(run_sql(db.path(), "DELETE FROM").is_error());
    }

    #[test]
    fn test_single_insert_reports_rowid() {
        let db = fixture();
        let result = run_sql(db.path(), "INSERT INTO users (name) VALUES ('carol')");
        assert_eq!(
            result,
            QueryResult::Mutation {
                rows_affected: 1,
                last_insert_rowid: Some(3),
            }
        );
        assert_eq!(count_users(&db), 3);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "ok", "rows_affected": 1, "lastrowid": 3})
        );
    }

    #[test]
    fn test_update_has_no_rowid() {
        let db = fixture();
        let result = run_sql(db.path(), "UPDATE users SET score = 1.0");
        assert_eq!(
            result,
            QueryResult::Mutation {
                rows_affected: 2,
                last_insert_rowid: None,
            }
        );
    }

    #[test]
    fn test_batch_commits_once() {
        let db = fixture();
        let result = run_sql(
            db.path(),
            "INSERT INTO users (name) VALUES ('c'); INSERT INTO users (name) VALUES ('d');",
        );
        assert_eq!(
            result,
            QueryResult::Mutation {
                rows_affected: 2,
                last_insert_rowid: None,
            }
        );
        assert_eq!(count_users(&db), 4);
    }

    #[test]
    fn test_failed_batch_rolls_back() {
        let db = fixture();
        let result = run_sql(
            db.path(),
            "INSERT INTO users (name) VALUES ('c'); INSERT INTO missing VALUES (1);",
        );
        assert!(result.is_error());
        assert_eq!(count_users(&db), 2);
    }

    #[test]
    fn test_trailing_semicolon_keeps_rows() {
        let db = fixture();

        let result = run_sql(
            db.path(),
            "WITH named AS (SELECT name FROM users) SELECT * FROM named ORDER BY name;",
        );
        assert_eq!(
            result,
            QueryResult::Rows {
                columns: vec!["name".to_string()],
                rows: vec![
                    vec![SqlValue::Text("alice".to_string())],
                    vec![SqlValue::Text("bob".to_string())],
                ],
            }
        );

        let result = run_sql(db.path(), "PRAGMA table_info(users);  ");
        assert!(matches!(result, QueryResult::Rows { .. }));
        assert_eq!(result.row_count(), 3);

        let result = run_sql(db.path(), "INSERT INTO users (name) VALUES ('carol');");
        assert_eq!(
            result,
            QueryResult::Mutation {
                rows_affected: 1,
                last_insert_rowid: Some(3),
            }
        );
    }

    #[test]
    fn test_only_semicolons_is_empty() {
        let db = fixture();
        assert_eq!(run_sql(db.path(), " ; ;"), QueryResult::error("Empty SQL query"));
    }

    #[test]
    fn test_script_with_own_transaction() {
        let db = fixture();
        let result = run_sql(
            db.path(),
            "BEGIN; INSERT INTO users (name) VALUES ('c'); INSERT INTO users (name) VALUES ('d'); COMMIT;",
        );
        assert_eq!(
            result,
            QueryResult::Mutation {
                rows_affected: 2,
                last_insert_rowid: None,
            }
        );
        assert_eq!(count_users(&db), 4);
    }

    #[test]
    fn test_failed_script_with_own_transaction_is_not_committed() {
        let db = fixture();
        let result = run_sql(
            db.path(),
            "BEGIN TRANSACTION; INSERT INTO users (name) VALUES ('c'); INSERT INTO missing VALUES (1); COMMIT;",
        );
        assert!(result.is_error());
        assert_eq!(count_users(&db), 2);
    }

    #[test]
    fn test_pragma_returns_rows() {
        let db = fixture();
        let result = run_sql(db.path(), "PRAGMA table_info(users)");
        assert!(matches!(result, QueryResult::Rows { .. }));
        assert_eq!(result.row_count(), 3);
    }

    #[test]
    fn test_rows_serialization_shape() {
        let db = fixture();
        let result = run_sql(db.path(), "SELECT name, score FROM users WHERE id = 1");
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({
                "status": "ok",
                "columns": ["name", "score"],
                "rows": [{"name": "alice", "score": 9.5}]
            })
        );
    }

    #[test]
    fn test_blob_rendered_as_placeholder() {
        let db = fixture();
        let result = run_sql(db.path(), "SELECT x'00ff' AS payload");
        let objects = result.row_objects();
        assert_eq!(objects[0]["payload"], serde_json::json!("<BLOB>"));
    }
}
