#![forbid(unsafe_code)]

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskboardError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid config key '{0}'")]
    InvalidConfigKey(String),

    #[error("invalid config value for '{key}': {msg}")]
    InvalidConfigValue { key: String, msg: String },

    #[error("invalid task status '{0}' (expected TODO, IN_PROGRESS or COMPLETED)")]
    InvalidStatus(String),

    #[error("invalid task priority '{0}' (expected LOW, MEDIUM, HIGH or URGENT)")]
    InvalidPriority(String),

    #[error("invalid project status '{0}' (expected ACTIVE, COMPLETED or ON_HOLD)")]
    InvalidProjectStatus(String),

    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("invalid record ID '{id}': {reason}")]
    InvalidId { id: String, reason: &'static str },

    #[error("task not found matching pattern: {0}")]
    TaskNotFound(String),

    #[error("multiple tasks match pattern: {0}")]
    AmbiguousTask(String),

    #[error("project not found matching pattern: {0}")]
    ProjectNotFound(String),

    #[error("terminal error: {0}")]
    Terminal(String),

    #[error("io error at {path}: {source}")]
    IoPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
