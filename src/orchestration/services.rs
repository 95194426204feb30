//! # Kernel Collaborators
//!
//! Traits for the services the kernel calls out to but does not implement: the job
//! repository, the source of job definitions, and the interpreter that actually runs
//! a work unit's definition.

use crate::constants::BatchStatus;
use crate::error::KernelResult;
use crate::models::{JobDefinition, JobExecutionRecord, JobInstance, JobParameters, WorkUnit};
use async_trait::async_trait;
use std::sync::Arc;

/// Job repository consulted when starting and restarting executions
#[async_trait]
pub trait PersistenceService: Send + Sync {
    async fn create_job_instance(
        &self,
        job_name: &str,
        app_name: &str,
        submitter: Option<&str>,
    ) -> KernelResult<JobInstance>;

    /// Fails with `NoSuchJobInstance` when the instance does not exist
    async fn get_job_instance(&self, instance_id: i64) -> KernelResult<JobInstance>;

    /// Fails with `NoSuchJobExecution` when the execution does not exist
    async fn get_job_instance_id_from_execution_id(&self, execution_id: i64) -> KernelResult<i64>;

    /// Record which server is about to run the execution
    async fn update_server_id_and_rest_url_for_starting_job(
        &self,
        execution_id: i64,
        server_id: &str,
        rest_url: &str,
    ) -> KernelResult<JobExecutionRecord>;

    async fn get_job_execution(&self, execution_id: i64) -> KernelResult<JobExecutionRecord>;

    /// Create a new execution of an existing instance, in STARTING status
    async fn create_job_execution(
        &self,
        instance_id: i64,
        parameters: JobParameters,
    ) -> KernelResult<JobExecutionRecord>;

    async fn get_most_recent_execution_id(&self, instance_id: i64) -> KernelResult<i64>;
}

/// Resolves the job definition an instance was originally submitted with
#[async_trait]
pub trait JobModelSource: Send + Sync {
    async fn resolve_job_definition(&self, instance: &JobInstance)
        -> KernelResult<Arc<JobDefinition>>;
}

/// Runs a work unit's job definition to completion.
///
/// Implementations should observe [`WorkUnit::cancellation_token`] between units of
/// work and return once a stop has been requested. A returned error marks the unit
/// FAILED.
#[async_trait]
pub trait WorkUnitRunner: Send + Sync {
    async fn run(&self, unit: Arc<WorkUnit>) -> anyhow::Result<BatchStatus>;
}
