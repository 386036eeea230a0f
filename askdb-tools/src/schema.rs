//! Schema inspection for prompt building.
//!
//! The agent never sees raw `sqlite_master` output. Every DDL statement is passed
//! through [`clean_sql`], which strips identifier quoting and folds the statement
//! onto one line, so the schema block stays compact no matter how the tables were
//! originally written.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;

use crate::tool_error::ToolError;

const BUSY_TIMEOUT_MS: u64 = 5000;

const LIST_OBJECTS_QUERY: &str = "SELECT name, type, sql FROM sqlite_master \
     WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' \
     ORDER BY type, name";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Table,
    View,
}

impl TableKind {
    fn from_catalog(kind: &str) -> Self {
        if kind.eq_ignore_ascii_case("view") {
            TableKind::View
        } else {
            TableKind::Table
        }
    }
}

/// A user-visible table or view with its normalized DDL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    pub name: String,
    pub kind: TableKind,
    pub sql: String,
}

/// List user tables and views, tables first, each group ordered by name.
///
/// Internal `sqlite_*` objects and indexes are skipped. The file is opened
/// read-only and is never created.
pub fn list_tables(db_path: impl AsRef<Path>) -> Result<Vec<TableSchema>, ToolError> {
    let path = db_path.as_ref();
    validate_db_path(path)?;

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;

    let mut stmt = conn.prepare(LIST_OBJECTS_QUERY)?;
    let tables = stmt
        .query_map([], |row| {
            let name: String = row.get(0)?;
            let kind: String = row.get(1)?;
            let sql: Option<String> = row.get(2)?;
            Ok(TableSchema {
                name,
                kind: TableKind::from_catalog(&kind),
                sql: clean_sql(sql.as_deref().unwrap_or_default()),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(db = %path.display(), tables = tables.len(), "listed schema objects");
    Ok(tables)
}

/// Render schema entries as `Table: <name>\n<sql>\n\n` blocks.
pub fn render_schema_context(tables: &[TableSchema]) -> String {
    tables
        .iter()
        .map(|table| format!("Table: {}\n{}\n\n", table.name, table.sql))
        .collect()
}

/// Schema block for the system prompt, or an empty string when the database is
/// missing, unreadable or has no user tables.
pub fn load_schema_context(db_path: impl AsRef<Path>) -> String {
    match list_tables(db_path.as_ref()) {
        Ok(tables) => render_schema_context(&tables),
        Err(e) => {
            tracing::warn!(db = %db_path.as_ref().display(), error = %e, "schema unavailable");
            String::new()
        }
    }
}

fn validate_db_path(path: &Path) -> Result<(), ToolError> {
    if path.as_os_str().is_empty() {
        return Err(ToolError::InvalidInput(
            "Database path cannot be empty".to_string(),
        ));
    }

    if !path.exists() {
        return Err(ToolError::InvalidInput(format!(
            "Database not found: {}",
            path.display()
        )));
    }

    if !path.is_file() {
        return Err(ToolError::InvalidInput(format!(
            "Path is not a file: {}",
            path.display()
        )));
    }

    Ok(())
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern compiles"))
}

fn create_header() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"(?i)(CREATE\s+(?:TABLE|VIEW)\s+[^(]+)\(\s*")
}

fn horizontal_space() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"[ \t]+")
}

fn comma_gap() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r",\s*")
}

fn line_break() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"\n\s*")
}

/// Multi-line DDL with one column per line, indented by parenthesis depth.
pub fn format_ddl(sql: &str) -> String {
    if sql.trim().is_empty() {
        return String::new();
    }

    let s = sql.replace("\r\n", "\n").replace('\r', "\n");
    let s = s.replace(['"', '[', ']'], "");
    let s = create_header().replace_all(&s, "${1}(\n");
    let s = horizontal_space().replace_all(&s, " ");
    let s = comma_gap().replace_all(&s, ",\n");

    let mut depth = 0usize;
    let mut out = Vec::new();
    for line in s.split('\n').map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with(')') {
            depth = depth.saturating_sub(1);
        }
        out.push(format!("{}{}", "    ".repeat(depth), line));
        if line.ends_with('(') || (line.contains('(') && !line.contains(')')) {
            depth += 1;
        }
    }

    out.join("\n").trim().to_string()
}

/// Normalize DDL to a single line: no identifier quoting, single spaces, `", "`
/// between list items.
pub fn clean_sql(sql: &str) -> String {
    let pretty = format_ddl(sql).replace("\\n", "");
    line_break().replace_all(&pretty, "").replace(',', ", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn fixture(ddl: &str) -> NamedTempFile {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = Connection::open(temp_file.path()).unwrap();
        conn.execute_batch(ddl).unwrap();
        temp_file
    }

    #[test]
    fn test_clean_sql_strips_quotes_and_flattens() {
        let ddl = "CREATE TABLE \"users\" (\r\n  id INTEGER PRIMARY KEY,\r\n  name   TEXT NOT NULL\r\n)";
        assert_eq!(
            clean_sql(ddl),
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)"
        );
    }

    #[test]
    fn test_clean_sql_brackets_and_nested_parens() {
        let ddl = "CREATE TABLE [orders] ([id] INTEGER, [total] DECIMAL(10,2),\n\tnote TEXT)";
        assert_eq!(
            clean_sql(ddl),
            "CREATE TABLE orders (id INTEGER, total DECIMAL(10, 2), note TEXT)"
        );
    }

    #[test]
    fn test_clean_sql_view_without_parens() {
        assert_eq!(
            clean_sql("CREATE VIEW v AS SELECT a,b FROM t"),
            "CREATE VIEW v AS SELECT a, b FROM t"
        );
        assert_eq!(clean_sql(""), "");
        assert_eq!(clean_sql("   "), "");
    }

    #[test]
    fn test_format_ddl_indents_columns() {
        let pretty = format_ddl("CREATE TABLE t (a INTEGER, b TEXT\n)");
        assert_eq!(pretty, "CREATE TABLE t (\n    a INTEGER,\n    b TEXT\n)");
    }

    #[test]
    fn test_list_tables_orders_tables_before_views() {
        let db = fixture(
            r#"
            CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT);
            CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER, title TEXT);
            CREATE INDEX idx_posts_user ON posts(user_id);
            CREATE VIEW active_users AS SELECT id, name FROM users;
            INSERT INTO users (name) VALUES ('alice');
        "#,
        );

        let tables = list_tables(db.path()).unwrap();
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        // sqlite_sequence exists because of AUTOINCREMENT and must be hidden
        assert_eq!(names, vec!["posts", "users", "active_users"]);
        assert_eq!(tables[0].kind, TableKind::Table);
        assert_eq!(tables[2].kind, TableKind::View);
        assert_eq!(
            tables[0].sql,
            "CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER, title TEXT)"
        );
    }

    #[test]
    fn test_render_schema_context() {
        let tables = vec![
            TableSchema {
                name: "a".to_string(),
                kind: TableKind::Table,
                sql: "CREATE TABLE a (x INTEGER)".to_string(),
            },
            TableSchema {
                name: "b".to_string(),
                kind: TableKind::View,
                sql: "CREATE VIEW b AS SELECT x FROM a".to_string(),
            },
        ];
        assert_eq!(
            render_schema_context(&tables),
            "Table: a\nCREATE TABLE a (x INTEGER)\n\nTable: b\nCREATE VIEW b AS SELECT x FROM a\n\n"
        );
        assert_eq!(render_schema_context(&[]), "");
    }

    #[test]
    fn test_missing_database_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.db");

        let err = list_tables(&path).unwrap_err();
        assert!(err.to_string().contains("Database not found"));
        assert_eq!(load_schema_context(&path), "");
        assert!(!path.exists());
    }

    #[test]
    fn test_empty_database_has_no_context() {
        let db = NamedTempFile::new().unwrap();
        assert!(list_tables(db.path()).unwrap().is_empty());
        assert_eq!(load_schema_context(db.path()), "");
    }

    #[test]
    fn test_directory_path_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_tables(dir.path()).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }
}
