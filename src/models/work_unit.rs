//! # Work Units
//!
//! A work unit is the dispatchable handle for one job, partition or split-flow
//! execution. The variant decides how the unit is addressed in the registry:
//! top-level jobs by execution id, sub-units by a composite key derived from the
//! top-level execution id.

use crate::constants::SUB_UNIT_KEY_SEPARATOR;
use crate::error::KernelResult;
use crate::models::{JobDefinition, RuntimeJobExecution};
use crate::orchestration::controller::{CancellationController, ExecutionController};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Variant of a work unit and its variant-specific addressing data
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkUnitKind {
    Job,
    Partition {
        step_name: String,
        partition_index: u32,
    },
    SplitFlow {
        split_name: String,
        flow_name: String,
    },
}

impl WorkUnitKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Job => "job",
            Self::Partition { .. } => "partition",
            Self::SplitFlow { .. } => "split_flow",
        }
    }
}

/// Composite registry key of a partition or split-flow work unit.
///
/// Equality and hashing are defined on the key string alone, so partitions and
/// split-flows live in one map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubUnitKey(String);

impl SubUnitKey {
    /// Derive the key for a unit kind; top-level jobs have none
    pub fn derive(top_level_execution_id: i64, kind: &WorkUnitKind) -> Option<Self> {
        match kind {
            WorkUnitKind::Job => None,
            WorkUnitKind::Partition {
                step_name,
                partition_index,
            } => Some(Self(format!(
                "{top_level_execution_id}{SUB_UNIT_KEY_SEPARATOR}{step_name}{SUB_UNIT_KEY_SEPARATOR}{partition_index}"
            ))),
            WorkUnitKind::SplitFlow { flow_name, .. } => Some(Self(format!(
                "{top_level_execution_id}{SUB_UNIT_KEY_SEPARATOR}{flow_name}"
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Owning top-level execution id (first key component)
    pub fn top_level_execution_id(&self) -> Option<i64> {
        self.0
            .split(SUB_UNIT_KEY_SEPARATOR)
            .next()
            .and_then(|id| id.parse().ok())
    }
}

impl fmt::Display for SubUnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle over one dispatchable job, partition or split-flow execution
#[derive(Debug)]
pub struct WorkUnit {
    kind: WorkUnitKind,
    execution: Arc<RuntimeJobExecution>,
    job_definition: Arc<JobDefinition>,
    controller: Arc<dyn ExecutionController>,
    cancellation: CancellationToken,
    created_at: DateTime<Utc>,
}

impl WorkUnit {
    /// Work unit for a top-level job with a fresh stop controller
    pub fn job(execution: Arc<RuntimeJobExecution>, job_definition: Arc<JobDefinition>) -> Self {
        let controller = CancellationController::new(execution.clone());
        Self::with_cancellation(WorkUnitKind::Job, execution, job_definition, controller)
    }

    /// Work unit for a sub-job. When `parent` is given (the owning job unit's token),
    /// stopping the parent also cancels this unit.
    pub fn sub_unit(
        kind: WorkUnitKind,
        execution: Arc<RuntimeJobExecution>,
        job_definition: Arc<JobDefinition>,
        parent: Option<&CancellationToken>,
    ) -> Self {
        let controller = match parent {
            Some(parent) => CancellationController::linked(execution.clone(), parent),
            None => CancellationController::new(execution.clone()),
        };
        Self::with_cancellation(kind, execution, job_definition, controller)
    }

    fn with_cancellation(
        kind: WorkUnitKind,
        execution: Arc<RuntimeJobExecution>,
        job_definition: Arc<JobDefinition>,
        controller: CancellationController,
    ) -> Self {
        let cancellation = controller.token();
        Self {
            kind,
            execution,
            job_definition,
            controller: Arc::new(controller),
            cancellation,
            created_at: Utc::now(),
        }
    }

    /// Work unit with a caller-supplied controller. The cancellation token is not
    /// linked to the controller; the controller is responsible for reaching the
    /// running code.
    pub fn with_controller(
        kind: WorkUnitKind,
        execution: Arc<RuntimeJobExecution>,
        job_definition: Arc<JobDefinition>,
        controller: Arc<dyn ExecutionController>,
    ) -> Self {
        Self {
            kind,
            execution,
            job_definition,
            controller,
            cancellation: CancellationToken::new(),
            created_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> &WorkUnitKind {
        &self.kind
    }

    pub fn is_job(&self) -> bool {
        matches!(self.kind, WorkUnitKind::Job)
    }

    pub fn execution(&self) -> &Arc<RuntimeJobExecution> {
        &self.execution
    }

    pub fn job_definition(&self) -> &Arc<JobDefinition> {
        &self.job_definition
    }

    pub fn controller(&self) -> &Arc<dyn ExecutionController> {
        &self.controller
    }

    /// Token the running code polls or awaits to observe stop requests
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn top_level_execution_id(&self) -> i64 {
        self.execution.top_level_execution_id()
    }

    pub fn sub_unit_key(&self) -> Option<SubUnitKey> {
        SubUnitKey::derive(self.top_level_execution_id(), &self.kind)
    }

    /// Human-readable registry address: the execution id for jobs, the composite key otherwise
    pub fn display_key(&self) -> String {
        match self.sub_unit_key() {
            Some(key) => key.to_string(),
            None => self.execution.execution_id().to_string(),
        }
    }

    pub fn request_stop(&self) -> KernelResult<()> {
        self.controller.request_stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobParameters;

    fn top_level(id: i64) -> Arc<RuntimeJobExecution> {
        Arc::new(RuntimeJobExecution::top_level(
            id,
            1,
            "job",
            JobParameters::new(),
            None,
        ))
    }

    #[test]
    fn test_partition_and_split_flow_keys_differ() {
        let partition = SubUnitKey::derive(
            7,
            &WorkUnitKind::Partition {
                step_name: "S".to_string(),
                partition_index: 2,
            },
        )
        .unwrap();
        let flow = SubUnitKey::derive(
            7,
            &WorkUnitKind::SplitFlow {
                split_name: "SP".to_string(),
                flow_name: "S".to_string(),
            },
        )
        .unwrap();

        assert_eq!(partition.as_str(), "7::S::2");
        assert_eq!(flow.as_str(), "7::S");
        assert_ne!(partition, flow);
        assert_eq!(partition.top_level_execution_id(), Some(7));
        assert_eq!(flow.top_level_execution_id(), Some(7));
    }

    #[test]
    fn test_job_units_have_no_composite_key() {
        let unit = WorkUnit::job(top_level(11), Arc::new(JobDefinition::new("job")));
        assert!(unit.sub_unit_key().is_none());
        assert_eq!(unit.display_key(), "11");
        assert!(unit.is_job());
    }

    #[test]
    fn test_sub_unit_token_follows_parent_controller() {
        let parent_exec = top_level(12);
        let parent_controller = CancellationController::new(parent_exec.clone());
        let unit = WorkUnit::sub_unit(
            WorkUnitKind::SplitFlow {
                split_name: "split".to_string(),
                flow_name: "flow".to_string(),
            },
            Arc::new(RuntimeJobExecution::sub_job(&parent_exec, ":12:split:flow")),
            Arc::new(JobDefinition::new(":12:split:flow")),
            Some(&parent_controller.token()),
        );

        assert!(!unit.cancellation_token().is_cancelled());
        parent_controller.request_stop().unwrap();
        assert!(unit.cancellation_token().is_cancelled());
        assert!(unit.controller().is_stop_requested());
    }
}
