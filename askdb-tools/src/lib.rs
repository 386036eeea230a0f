//! SQLite plumbing for the askdb agents.
//!
//! - [`schema`] lists user tables and views and renders them as prompt context
//! - [`executor`] runs a single statement (or a `;`-separated batch) and normalizes
//!   the outcome into a [`QueryResult`]

pub mod executor;
pub mod schema;
pub mod tool_error;

pub use executor::{run_sql, QueryResult, SqlValue};
pub use schema::{
    clean_sql, list_tables, load_schema_context, render_schema_context, TableKind, TableSchema,
};
pub use tool_error::ToolError;
