use std::fmt;

use thiserror::Error;

/// Why a run ended without an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AgentFailure {
    #[error("Could not retrieve schema.")]
    SchemaUnavailable,
    #[error("Agent reached maximum steps without a final answer.")]
    StepLimitExceeded,
}

/// Observable progress of an agent run, in the order it happens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    Thought(String),
    ExecutingSql(String),
    SqlResult { rows: usize },
    SqlError(String),
    FinalAnswer(String),
    Debug(String),
    Error(AgentFailure),
}

impl AgentEvent {
    /// No further events follow a terminal one
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::FinalAnswer(_) | AgentEvent::Error(_))
    }
}

impl fmt::Display for AgentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentEvent::Thought(thought) => write!(f, "Thought: {}", thought),
            AgentEvent::ExecutingSql(sql) => write!(f, "Executing SQL: {}", sql),
            AgentEvent::SqlResult { rows } => write!(f, "SQL Result ({} rows)", rows),
            AgentEvent::SqlError(message) => write!(f, "SQL Error: {}", message),
            AgentEvent::FinalAnswer(answer) => write!(f, "Final Answer: {}", answer),
            AgentEvent::Debug(message) => write!(f, "Debug: {}", message),
            AgentEvent::Error(failure) => write!(f, "Error: {}", failure),
        }
    }
}
