//! # Work Unit Registry
//!
//! Concurrent index of every work unit the kernel has registered and not yet
//! deregistered. Top-level jobs are keyed by execution id, partitions and split-flows
//! by their [`SubUnitKey`].
//!
//! ## Key Features
//!
//! - **Atomic insert-if-absent**: duplicate registration is a typed invariant violation
//! - **Remove-if-same**: a stale handle can never evict a newer registration of its key
//! - **Lock-free reads**: snapshots are cloned `Arc`s, so no shard lock outlives a call
//!
//! ## Usage
//!
//! ```rust
//! use batch_kernel::models::{JobDefinition, JobParameters, RuntimeJobExecution, WorkUnit};
//! use batch_kernel::registry::WorkUnitRegistry;
//! use std::sync::Arc;
//!
//! let registry = WorkUnitRegistry::new();
//! let execution = Arc::new(RuntimeJobExecution::top_level(1, 1, "job", JobParameters::new(), None));
//! let unit = Arc::new(WorkUnit::job(execution, Arc::new(JobDefinition::new("job"))));
//!
//! registry.register_job(unit.clone()).unwrap();
//! assert!(registry.register_job(unit.clone()).is_err());
//! assert!(registry.deregister(&unit));
//! assert!(registry.is_empty());
//! ```

use crate::error::{KernelError, KernelResult};
use crate::models::{SubUnitKey, WorkUnit, WorkUnitKind};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Registry statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub job_units: usize,
    pub partition_units: usize,
    pub split_flow_units: usize,
}

#[derive(Debug, Default)]
pub struct WorkUnitRegistry {
    jobs: DashMap<i64, Arc<WorkUnit>>,
    sub_units: DashMap<SubUnitKey, Arc<WorkUnit>>,
}

impl WorkUnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a top-level job unit under its execution id
    pub fn register_job(&self, unit: Arc<WorkUnit>) -> KernelResult<()> {
        if !unit.is_job() {
            return Err(KernelError::IllegalState(format!(
                "work unit {} is a {} unit, not a job unit",
                unit.display_key(),
                unit.kind().label()
            )));
        }

        let execution_id = unit.execution().execution_id();
        match self.jobs.entry(execution_id) {
            Entry::Occupied(_) => {
                warn!(
                    execution_id = execution_id,
                    "Job work unit already registered - refusing duplicate"
                );
                Err(KernelError::DuplicateRegistration {
                    key: execution_id.to_string(),
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(unit);
                debug!(execution_id = execution_id, "Registered job work unit");
                Ok(())
            }
        }
    }

    /// Register a partition or split-flow unit under its composite key
    pub fn register_sub_unit(&self, unit: Arc<WorkUnit>) -> KernelResult<()> {
        let Some(key) = unit.sub_unit_key() else {
            return Err(KernelError::IllegalState(format!(
                "job work unit {} cannot be registered as a sub-unit",
                unit.display_key()
            )));
        };

        match self.sub_units.entry(key.clone()) {
            Entry::Occupied(_) => {
                warn!(
                    unit_key = %key,
                    kind = unit.kind().label(),
                    "Sub-unit already registered - refusing duplicate"
                );
                Err(KernelError::DuplicateRegistration {
                    key: key.to_string(),
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(unit);
                debug!(unit_key = %key, "Registered sub-unit");
                Ok(())
            }
        }
    }

    /// Remove `unit` if it is the registered entry for its key.
    ///
    /// Returns whether an entry was removed; absence is tolerated.
    pub fn deregister(&self, unit: &Arc<WorkUnit>) -> bool {
        let removed = match unit.sub_unit_key() {
            None => {
                let execution_id = unit.execution().execution_id();
                self.jobs
                    .remove_if(&execution_id, |_, existing| Arc::ptr_eq(existing, unit))
                    .is_some()
            }
            Some(key) => self
                .sub_units
                .remove_if(&key, |_, existing| Arc::ptr_eq(existing, unit))
                .is_some(),
        };

        if removed {
            debug!(unit_key = %unit.display_key(), "Deregistered work unit");
        } else {
            debug!(
                unit_key = %unit.display_key(),
                "Work unit not registered at deregistration - ignoring"
            );
        }
        removed
    }

    pub fn job_unit(&self, execution_id: i64) -> Option<Arc<WorkUnit>> {
        self.jobs.get(&execution_id).map(|entry| entry.value().clone())
    }

    pub fn sub_unit(&self, key: &SubUnitKey) -> Option<Arc<WorkUnit>> {
        self.sub_units.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains_job(&self, execution_id: i64) -> bool {
        self.jobs.contains_key(&execution_id)
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn sub_unit_count(&self) -> usize {
        self.sub_units.len()
    }

    pub fn len(&self) -> usize {
        self.job_count() + self.sub_unit_count()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty() && self.sub_units.is_empty()
    }

    /// All registered units, jobs first
    pub fn snapshot(&self) -> Vec<Arc<WorkUnit>> {
        self.jobs
            .iter()
            .map(|entry| entry.value().clone())
            .chain(self.sub_units.iter().map(|entry| entry.value().clone()))
            .collect()
    }

    /// Sub-units owned by one top-level execution
    pub fn sub_units_of(&self, top_level_execution_id: i64) -> Vec<Arc<WorkUnit>> {
        self.sub_units
            .iter()
            .filter(|entry| entry.value().top_level_execution_id() == top_level_execution_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn registered_job_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.jobs.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn stats(&self) -> RegistryStats {
        let mut partition_units = 0;
        let mut split_flow_units = 0;
        for entry in self.sub_units.iter() {
            match entry.value().kind() {
                WorkUnitKind::Partition { .. } => partition_units += 1,
                WorkUnitKind::SplitFlow { .. } => split_flow_units += 1,
                WorkUnitKind::Job => {}
            }
        }

        RegistryStats {
            job_units: self.job_count(),
            partition_units,
            split_flow_units,
        }
    }
}
