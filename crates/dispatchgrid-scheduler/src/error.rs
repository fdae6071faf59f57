//! Scheduler error types.

use dispatch_core::config::ConfigError;
use thiserror::Error;

/// Errors surfaced by the scenario controller.
///
/// Per-call planning failures never appear here; the control loop
/// absorbs them into metrics.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scenario already running")]
    AlreadyRunning,

    #[error("scenario not running")]
    NotRunning,

    #[error("invalid scenario config: {0}")]
    Config(#[from] ConfigError),

    #[error("backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
