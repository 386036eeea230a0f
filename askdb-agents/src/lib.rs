//! # askdb agents
//!
//! Answers natural-language questions about a SQLite database by letting an LLM
//! iterate: it reads the schema, issues SQL, sees (a preview of) the results and
//! eventually replies with a final answer.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use askdb_agents::SqlAgent;
//! use askdb_llm_sdk::openai::OpenAIClient;
//! use futures_util::StreamExt;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let client = OpenAIClient::new("gsk-...")?
//!     .with_base_url("https://api.groq.com/openai/v1")
//!     .with_model("openai/gpt-oss-120b");
//! let agent = SqlAgent::new(Arc::new(client), "chinook.db");
//!
//! let mut events = Box::pin(agent.run("How many jazz tracks are there?"));
//! while let Some(event) = events.next().await {
//!     println!("{event}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod completion;
pub mod config;
pub mod conversation;
pub mod decision;
pub mod events;
pub mod factory;
pub mod logging;
pub mod sql_agent;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{AgentConfig, Settings};
pub use events::{AgentEvent, AgentFailure};
pub use sql_agent::SqlAgent;
