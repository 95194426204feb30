//! # Kernel Constants
//!
//! Status enums, addressing separators and event topics shared by the kernel,
//! the registry and the resilience policies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between components of a composite sub-unit key (`7::step::2`)
pub const SUB_UNIT_KEY_SEPARATOR: &str = "::";

/// Separator (and prefix) of generated sub-job identifiers (`:7:step:2`)
pub const SUB_JOB_ID_SEPARATOR: char = ':';

/// Limit sentinel meaning "no retry/skip limit"
pub const MIN_UNLIMITED: i64 = i64::MIN;

/// 32-bit form of the unlimited sentinel, as written by job definitions
pub const MIN_UNLIMITED_I32: i64 = i32::MIN as i64;

/// Job parameter carrying the caller's correlation id
pub const CORRELATION_ID_PARAMETER: &str = "correlationId";

/// Event topics published through the notification sink
pub mod topics {
    pub const JOB_EXECUTION_STARTING: &str = "batch/jobs/execution/starting";
    pub const JOB_EXECUTION_RESTARTING: &str = "batch/jobs/execution/restarting";
    pub const JOB_EXECUTION_STOPPING: &str = "batch/jobs/execution/stopping";
    pub const JOB_EXECUTION_ENDED: &str = "batch/jobs/execution/ended";
    pub const JOB_INSTANCE_DISPATCHED: &str = "batch/jobs/instance/dispatched";
    pub const PARTITION_ENDED: &str = "batch/jobs/execution/partition/ended";
    pub const SPLIT_FLOW_ENDED: &str = "batch/jobs/execution/split-flow/ended";
}

/// Batch status of a job execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Starting,
    Started,
    Stopping,
    Stopped,
    Completed,
    Failed,
    Abandoned,
}

impl BatchStatus {
    /// Terminal statuses allow no further transitions for this execution
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Stopped | Self::Completed | Self::Failed | Self::Abandoned
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Started | Self::Stopping)
    }

    /// Only stopped or failed executions may be restarted
    pub fn is_restartable(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "STARTING"),
            Self::Started => write!(f, "STARTED"),
            Self::Stopping => write!(f, "STOPPING"),
            Self::Stopped => write!(f, "STOPPED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Abandoned => write!(f, "ABANDONED"),
        }
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STARTING" => Ok(Self::Starting),
            "STARTED" => Ok(Self::Started),
            "STOPPING" => Ok(Self::Stopping),
            "STOPPED" => Ok(Self::Stopped),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "ABANDONED" => Ok(Self::Abandoned),
            _ => Err(format!("Invalid batch status: {s}")),
        }
    }
}

/// Persisted state of a job instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceState {
    Submitted,
    JmsQueued,
    JmsConsumed,
    Dispatched,
    Failed,
    Stopped,
    Completed,
    Abandoned,
}

impl InstanceState {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitted => write!(f, "SUBMITTED"),
            Self::JmsQueued => write!(f, "JMS_QUEUED"),
            Self::JmsConsumed => write!(f, "JMS_CONSUMED"),
            Self::Dispatched => write!(f, "DISPATCHED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Stopped => write!(f, "STOPPED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Abandoned => write!(f, "ABANDONED"),
        }
    }
}
