// src/errors.rs

//! Crate-wide error type.
//!
//! Every execution failure carries the task name and the [`Stage`] it came
//! from. Whether a failure ends the task is decided by the per-unit
//! `StopIfUnsuccessful` flag in the engine, never by the variant.

use std::time::Duration;

use thiserror::Error;

use crate::types::Stage;

#[derive(Error, Debug)]
pub enum WrapError {
    #[error("{task}: {stage} - interrupt received")]
    UserInterrupt { task: String, stage: Stage },

    #[error("{task}: {stage} - timeout reached after {}s", .after.as_secs())]
    Timeout {
        task: String,
        stage: Stage,
        after: Duration,
    },

    #[error("{task}: {stage}: operation failed: {reason}")]
    OperationFailed {
        task: String,
        stage: Stage,
        reason: String,
    },

    #[error("{task}: job failed: {reason}")]
    JobFailed { task: String, reason: String },

    #[error("{task}: archive failed: {reason}")]
    ArchiveFailed { task: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("{} task(s) failed: {}", .0.len(), join_errors(.0))]
    TasksFailed(Vec<WrapError>),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WrapError {
    /// Stage the failure originated from, if it is an execution failure.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            WrapError::UserInterrupt { stage, .. }
            | WrapError::Timeout { stage, .. }
            | WrapError::OperationFailed { stage, .. } => Some(*stage),
            WrapError::JobFailed { .. } | WrapError::ArchiveFailed { .. } => Some(Stage::Job),
            _ => None,
        }
    }

    pub fn is_interrupt(&self) -> bool {
        matches!(self, WrapError::UserInterrupt { .. })
    }
}

fn join_errors(errors: &[WrapError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WrapError>;
