//! # Kernel Models
//!
//! - [`job_model`] - job definition tree (jobs, steps, flows, splits, chunks, partitions)
//! - [`execution`] - job instances, persisted execution records and live executions
//! - [`work_unit`] - dispatchable work unit handles and composite registry keys

pub mod execution;
pub mod job_model;
pub mod work_unit;

// Re-export core models for easy access
pub use execution::{JobExecutionRecord, JobInstance, JobParameters, RuntimeJobExecution};
pub use job_model::{
    parse_limit, ArtifactRef, Batchlet, Chunk, Decision, ExceptionClassFilter, ExecutionElement,
    Flow, JobDefinition, JslProperties, Listener, Listeners, Partition, PartitionPlan, Property,
    Split, Step, TransitionElement,
};
pub use work_unit::{SubUnitKey, WorkUnit, WorkUnitKind};
