use askdb_tools::QueryResult;

use crate::events::AgentEvent;

/// What the user sees and what the model is told after one statement ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Feedback {
    pub event: AgentEvent,
    pub message: String,
}

pub(crate) fn summarize(result: &QueryResult, preview_rows: usize) -> Feedback {
    match result {
        QueryResult::Rows { .. } => {
            let objects = result.row_objects();
            let total = objects.len();

            let message = if total > preview_rows {
                let sample = serde_json::to_string(&objects[..preview_rows]).unwrap_or_default();
                format!(
                    "Query returned {total} rows. This is too many to show. Here are the first {preview_rows} rows:\n{sample}\n\nPlease refine your query if you need more specific data, or use this sample to answer."
                )
            } else {
                let data = serde_json::to_string(&objects).unwrap_or_default();
                format!("Query returned {total} rows:\n{data}")
            };

            Feedback {
                event: AgentEvent::SqlResult { rows: total },
                message,
            }
        }
        QueryResult::Mutation {
            rows_affected,
            last_insert_rowid,
        } => {
            let mut message = format!("Statement executed successfully. {rows_affected} rows affected.");
            if let Some(id) = last_insert_rowid {
                message.push_str(&format!(" Last inserted row id: {id}."));
            }

            Feedback {
                event: AgentEvent::SqlResult { rows: 0 },
                message,
            }
        }
        QueryResult::Error { message } => Feedback {
            event: AgentEvent::SqlError(message.clone()),
            message: format!("SQL Error: {message}"),
        },
    }
}
