//! Error types for the batch kernel.
//!
//! The taxonomy mirrors how callers are expected to react:
//! - invariant violations (duplicate registration, bad identifiers) are programming errors
//!   and are never retried
//! - domain/control errors (already completed, not running, instance stopped) are typed
//!   failures surfaced to the caller of start/restart/stop
//! - collaborator errors (persistence, dispatch, controllers) propagate as-is

use crate::config::ConfigurationError;
use crate::constants::BatchStatus;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    /// A key was registered twice in the work unit registry
    #[error("Invariant violation: work unit {key} is already registered")]
    DuplicateRegistration { key: String },

    /// An identifier component contains a reserved separator
    #[error("Invalid identifier '{value}' for {component}: {reason}")]
    InvalidIdentifier {
        component: String,
        value: String,
        reason: String,
    },

    /// Required state was missing or inconsistent
    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Job execution {execution_id} already completed; instance {instance_id} cannot be restarted")]
    JobAlreadyCompleted { execution_id: i64, instance_id: i64 },

    #[error("Job execution {execution_id} is not the most recent execution of instance {instance_id} (most recent: {most_recent_execution_id})")]
    JobExecutionNotMostRecent {
        execution_id: i64,
        instance_id: i64,
        most_recent_execution_id: i64,
    },

    #[error("Job execution {execution_id} is not running")]
    JobExecutionNotRunning { execution_id: i64 },

    #[error("Job execution {execution_id} is still running with status {status}")]
    JobExecutionAlreadyRunning {
        execution_id: i64,
        status: BatchStatus,
    },

    #[error("Job instance {instance_id} has been stopped; execution {execution_id} will not start")]
    JobInstanceStopped { instance_id: i64, execution_id: i64 },

    #[error("Restart of job execution {execution_id} refused: {reason}")]
    JobRestartRefused { execution_id: i64, reason: String },

    #[error("No job execution found for id {0}")]
    NoSuchJobExecution(i64),

    #[error("No job instance found for id {0}")]
    NoSuchJobInstance(i64),

    #[error("Batch kernel is shutting down")]
    ShuttingDown,

    #[error("Persistence error during {operation}: {reason}")]
    Persistence { operation: String, reason: String },

    #[error("Dispatch of work unit {key} failed: {reason}")]
    Dispatch { key: String, reason: String },

    #[error("Stop request for work unit {key} failed: {reason}")]
    Controller { key: String, reason: String },

    #[error("Work unit {key} did not complete: {reason}")]
    Completion { key: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl KernelError {
    /// Invariant violations signal a programming error rather than a runtime condition
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateRegistration { .. }
                | Self::InvalidIdentifier { .. }
                | Self::IllegalState(_)
        )
    }

    /// Domain errors are expected, typed refusals of a start/restart/stop request
    pub fn is_domain_error(&self) -> bool {
        matches!(
            self,
            Self::JobAlreadyCompleted { .. }
                | Self::JobExecutionNotMostRecent { .. }
                | Self::JobExecutionNotRunning { .. }
                | Self::JobExecutionAlreadyRunning { .. }
                | Self::JobInstanceStopped { .. }
                | Self::JobRestartRefused { .. }
                | Self::ShuttingDown
        )
    }

    pub fn persistence(operation: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Persistence {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<ConfigurationError> for KernelError {
    fn from(error: ConfigurationError) -> Self {
        KernelError::Configuration(error.to_string())
    }
}

pub type KernelResult<T> = std::result::Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let duplicate = KernelError::DuplicateRegistration {
            key: "7::S::2".to_string(),
        };
        assert!(duplicate.is_invariant_violation());
        assert!(!duplicate.is_domain_error());

        let not_running = KernelError::JobExecutionNotRunning { execution_id: 3 };
        assert!(not_running.is_domain_error());
        assert!(!not_running.is_invariant_violation());

        let persistence = KernelError::persistence("get_job_instance", "connection reset");
        assert!(!persistence.is_domain_error());
        assert_eq!(
            persistence.to_string(),
            "Persistence error during get_job_instance: connection reset"
        );
    }
}
