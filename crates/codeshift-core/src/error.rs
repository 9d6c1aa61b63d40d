//! Error types for codeshift

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("log is empty")]
    EmptyLog,

    #[error("oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("malformed oracle output: {0}")]
    MalformedOracleOutput(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("action error: {name} - {message}")]
    ActionExecution { name: String, message: String },

    #[error("action timed out: {name} - {message}")]
    ActionTimeout { name: String, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("iteration limit exceeded: {cap} steps")]
    IterationLimitExceeded { cap: usize },

    #[error("run cancelled")]
    Cancelled,

    #[error("orphan action result: {0}")]
    OrphanResult(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn oracle_unavailable(reason: impl Into<String>) -> Self {
        Self::OracleUnavailable(reason.into())
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedOracleOutput(reason.into())
    }

    pub fn action_error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ActionExecution {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Whether the executor's backoff policy may retry the failed oracle call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OracleUnavailable(_) | Self::MalformedOracleOutput(_))
    }
}
