//! Job instance and execution models.
//!
//! `JobInstance` and `JobExecutionRecord` are the persisted views returned by the
//! persistence service. `RuntimeJobExecution` is the live, in-memory execution the
//! kernel owns for as long as a work unit runs.

use crate::constants::{BatchStatus, InstanceState};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type JobParameters = HashMap<String, String>;

/// Persisted job instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInstance {
    pub instance_id: i64,
    pub job_name: String,
    pub app_name: String,
    pub submitter: Option<String>,
    pub instance_state: InstanceState,
    pub batch_status: BatchStatus,
    pub created_at: DateTime<Utc>,
}

impl JobInstance {
    /// A stop issued against the instance before any execution started
    pub fn is_stopped(&self) -> bool {
        self.instance_state == InstanceState::Stopped || self.batch_status == BatchStatus::Stopped
    }
}

/// Persisted job execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobExecutionRecord {
    pub execution_id: i64,
    pub instance_id: i64,
    pub job_name: String,
    pub batch_status: BatchStatus,
    pub exit_status: Option<String>,
    pub parameters: JobParameters,
    pub server_id: Option<String>,
    pub rest_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Live execution of a top-level job or of a generated sub-job.
///
/// Sub-job executions share the top-level execution id of the job that spawned them.
#[derive(Debug)]
pub struct RuntimeJobExecution {
    execution_id: i64,
    top_level_execution_id: i64,
    instance_id: i64,
    job_name: String,
    correlation_id: Option<String>,
    parameters: JobParameters,
    created_at: DateTime<Utc>,
    status: RwLock<BatchStatus>,
}

impl RuntimeJobExecution {
    /// Create the execution for a top-level job
    pub fn top_level(
        execution_id: i64,
        instance_id: i64,
        job_name: impl Into<String>,
        parameters: JobParameters,
        correlation_id: Option<String>,
    ) -> Self {
        Self {
            execution_id,
            top_level_execution_id: execution_id,
            instance_id,
            job_name: job_name.into(),
            correlation_id,
            parameters,
            created_at: Utc::now(),
            status: RwLock::new(BatchStatus::Starting),
        }
    }

    /// Create the execution of a sub-job spawned by `parent`
    pub fn sub_job(parent: &RuntimeJobExecution, sub_job_name: impl Into<String>) -> Self {
        Self {
            execution_id: parent.execution_id,
            top_level_execution_id: parent.top_level_execution_id,
            instance_id: parent.instance_id,
            job_name: sub_job_name.into(),
            correlation_id: parent.correlation_id.clone(),
            parameters: parent.parameters.clone(),
            created_at: Utc::now(),
            status: RwLock::new(BatchStatus::Starting),
        }
    }

    pub fn execution_id(&self) -> i64 {
        self.execution_id
    }

    pub fn top_level_execution_id(&self) -> i64 {
        self.top_level_execution_id
    }

    pub fn instance_id(&self) -> i64 {
        self.instance_id
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn parameters(&self) -> &JobParameters {
        &self.parameters
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> BatchStatus {
        *self.status.read()
    }

    pub fn set_status(&self, status: BatchStatus) {
        *self.status.write() = status;
    }

    /// Move from STARTING to STARTED. Returns false when a stop (or a finish)
    /// got there first.
    pub fn mark_started(&self) -> bool {
        let mut status = self.status.write();
        if *status != BatchStatus::Starting {
            return false;
        }
        *status = BatchStatus::Started;
        true
    }

    /// Move to STOPPING unless the execution already finished.
    /// Returns false when the execution was terminal (the stop is a no-op).
    pub fn mark_stopping(&self) -> bool {
        let mut status = self.status.write();
        if status.is_terminal() {
            return false;
        }
        *status = BatchStatus::Stopping;
        true
    }

    /// Record the final status reported by the runner. A stop request that
    /// raced with a normal completion keeps the runner's status; a runner that
    /// reports a non-terminal status after a stop request is recorded as STOPPED.
    pub fn finish(&self, reported: BatchStatus) -> BatchStatus {
        let mut status = self.status.write();
        let final_status = if reported.is_terminal() {
            reported
        } else if *status == BatchStatus::Stopping {
            BatchStatus::Stopped
        } else {
            BatchStatus::Completed
        };
        *status = final_status;
        final_status
    }
}
