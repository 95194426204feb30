//! # Sub-Job Builder
//!
//! Carves independent job definitions out of a running top-level job: one per
//! partition of a partitioned step and one per flow of a split.
//!
//! Generated ids embed the owning top-level execution id so any sub-job can be
//! traced back to the job that spawned it:
//!
//! ```text
//! partition:   :<topLevelExecutionId>:<stepId>:<partitionIndex>
//! split-flow:  :<topLevelExecutionId>:<splitId>:<flowId>
//! ```
//!
//! Definitions are deep copies; mutating a generated sub-job never affects the
//! parent definition.

use crate::constants::SUB_JOB_ID_SEPARATOR;
use crate::error::{KernelError, KernelResult};
use crate::models::{
    ExecutionElement, Flow, JobDefinition, JslProperties, Partition, PartitionPlan, Split, Step,
};
use tracing::debug;

/// Stateless builder of partition-level and split-flow sub-jobs
#[derive(Debug, Clone, Copy, Default)]
pub struct SubJobBuilder;

impl SubJobBuilder {
    /// Build the job a single flow of a split runs as.
    ///
    /// The context properties are copied verbatim and the flow is attached whole.
    pub fn build_flow_in_split_sub_job(
        top_level_execution_id: i64,
        context_properties: Option<&JslProperties>,
        split: &Split,
        flow: &Flow,
    ) -> KernelResult<JobDefinition> {
        let id = Self::split_flow_sub_job_id(top_level_execution_id, &split.id, &flow.id)?;

        debug!(
            top_level_execution_id = top_level_execution_id,
            split_id = %split.id,
            flow_id = %flow.id,
            sub_job_id = %id,
            "Building split-flow sub-job"
        );

        Ok(JobDefinition {
            id,
            restartable: None,
            properties: context_properties.cloned(),
            listeners: None,
            execution_elements: vec![ExecutionElement::Flow(flow.clone())],
        })
    }

    /// Build the single-step job one partition of `step` runs as.
    ///
    /// The step's batchlet or chunk, properties and listeners are copied. Its
    /// transitions, `next`, `start-limit` and `allow-start-if-complete` belong to the
    /// parent step and are dropped. When the step carries a partition plan, the copy's
    /// plan has one partition on one thread and only the plan properties addressed to
    /// `partition_index`.
    pub fn build_partition_level_job(
        top_level_execution_id: i64,
        job_properties: Option<&JslProperties>,
        step: &Step,
        partition_index: u32,
    ) -> KernelResult<JobDefinition> {
        let id = Self::partition_sub_job_id(top_level_execution_id, &step.id, partition_index)?;

        let partition_step = Step {
            id: step.id.clone(),
            next: None,
            start_limit: None,
            allow_start_if_complete: None,
            properties: step.properties.clone(),
            listeners: step.listeners.clone(),
            batchlet: step.batchlet.clone(),
            chunk: step.chunk.clone(),
            partition: step
                .partition
                .as_ref()
                .map(|partition| single_partition(partition, partition_index)),
            transition_elements: Vec::new(),
        };

        debug!(
            top_level_execution_id = top_level_execution_id,
            step_id = %step.id,
            partition_index = partition_index,
            sub_job_id = %id,
            "Building partition-level sub-job"
        );

        Ok(JobDefinition {
            id,
            restartable: None,
            properties: job_properties.cloned(),
            listeners: None,
            execution_elements: vec![ExecutionElement::Step(partition_step)],
        })
    }

    pub fn partition_sub_job_id(
        top_level_execution_id: i64,
        step_id: &str,
        partition_index: u32,
    ) -> KernelResult<String> {
        validate_component("step id", step_id)?;
        Ok(format!(
            "{sep}{top_level_execution_id}{sep}{step_id}{sep}{partition_index}",
            sep = SUB_JOB_ID_SEPARATOR
        ))
    }

    pub fn split_flow_sub_job_id(
        top_level_execution_id: i64,
        split_id: &str,
        flow_id: &str,
    ) -> KernelResult<String> {
        validate_component("split id", split_id)?;
        validate_component("flow id", flow_id)?;
        Ok(format!(
            "{sep}{top_level_execution_id}{sep}{split_id}{sep}{flow_id}",
            sep = SUB_JOB_ID_SEPARATOR
        ))
    }
}

/// Recover the owning top-level execution id from a generated sub-job id
pub fn parse_top_level_execution_id(sub_job_id: &str) -> Option<i64> {
    sub_job_id
        .strip_prefix(SUB_JOB_ID_SEPARATOR)?
        .split(SUB_JOB_ID_SEPARATOR)
        .next()?
        .parse()
        .ok()
}

fn validate_component(component: &str, value: &str) -> KernelResult<()> {
    if value.is_empty() {
        return Err(KernelError::InvalidIdentifier {
            component: component.to_string(),
            value: value.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if value.contains(SUB_JOB_ID_SEPARATOR) {
        return Err(KernelError::InvalidIdentifier {
            component: component.to_string(),
            value: value.to_string(),
            reason: format!("must not contain '{SUB_JOB_ID_SEPARATOR}'"),
        });
    }
    Ok(())
}

fn single_partition(partition: &Partition, partition_index: u32) -> Partition {
    let target = partition_index.to_string();
    let plan = partition.plan.as_ref().map(|plan| PartitionPlan {
        partitions: Some("1".to_string()),
        threads: Some("1".to_string()),
        properties: plan
            .properties
            .iter()
            .filter(|props| props.partition.as_deref().map(str::trim) == Some(target.as_str()))
            .cloned()
            .collect(),
    });

    Partition {
        mapper: None,
        plan,
        collector: None,
        analyzer: None,
        reducer: None,
    }
}
