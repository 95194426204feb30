//! In-memory collaborators for kernel tests.

use async_trait::async_trait;
use batch_kernel::constants::{BatchStatus, InstanceState};
use batch_kernel::error::{KernelError, KernelResult};
use batch_kernel::models::{
    JobDefinition, JobExecutionRecord, JobInstance, JobParameters, WorkUnit,
};
use batch_kernel::orchestration::{
    CompletionHandle, ExecutionController, JobModelSource, PersistenceService, WorkUnitRunner,
    WorkUnitTask, WorkerPool,
};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct PersistenceState {
    instances: HashMap<i64, JobInstance>,
    executions: HashMap<i64, JobExecutionRecord>,
    next_instance_id: i64,
    next_execution_id: i64,
}

/// Job repository kept in memory
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    state: Mutex<PersistenceState>,
    server_updates: Mutex<Vec<(i64, String, String)>>,
    instance_lookup_delay: Mutex<Option<Duration>>,
    server_update_delay: Mutex<Option<Duration>>,
}

impl InMemoryPersistence {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_instance(&self, job_name: &str) -> JobInstance {
        let mut state = self.state.lock();
        state.next_instance_id += 1;
        let instance = JobInstance {
            instance_id: state.next_instance_id,
            job_name: job_name.to_string(),
            app_name: "batch-app".to_string(),
            submitter: Some("tester".to_string()),
            instance_state: InstanceState::Submitted,
            batch_status: BatchStatus::Starting,
            created_at: Utc::now(),
        };
        state.instances.insert(instance.instance_id, instance.clone());
        instance
    }

    pub fn add_execution(
        &self,
        instance_id: i64,
        batch_status: BatchStatus,
        parameters: JobParameters,
    ) -> JobExecutionRecord {
        let mut state = self.state.lock();
        state.next_execution_id += 1;
        let job_name = state
            .instances
            .get(&instance_id)
            .map(|instance| instance.job_name.clone())
            .unwrap_or_default();
        let record = JobExecutionRecord {
            execution_id: state.next_execution_id,
            instance_id,
            job_name,
            batch_status,
            exit_status: None,
            parameters,
            server_id: None,
            rest_url: None,
            created_at: Utc::now(),
        };
        state.executions.insert(record.execution_id, record.clone());
        record
    }

    pub fn set_instance_state(&self, instance_id: i64, instance_state: InstanceState) {
        if let Some(instance) = self.state.lock().instances.get_mut(&instance_id) {
            instance.instance_state = instance_state;
        }
    }

    pub fn execution(&self, execution_id: i64) -> Option<JobExecutionRecord> {
        self.state.lock().executions.get(&execution_id).cloned()
    }

    pub fn server_updates(&self) -> Vec<(i64, String, String)> {
        self.server_updates.lock().clone()
    }

    /// Make every `get_job_instance` call take at least `delay`
    pub fn set_instance_lookup_delay(&self, delay: Duration) {
        *self.instance_lookup_delay.lock() = Some(delay);
    }

    /// Make every server id update for a starting job take at least `delay`
    pub fn set_server_update_delay(&self, delay: Duration) {
        *self.server_update_delay.lock() = Some(delay);
    }
}

#[async_trait]
impl PersistenceService for InMemoryPersistence {
    async fn create_job_instance(
        &self,
        job_name: &str,
        app_name: &str,
        submitter: Option<&str>,
    ) -> KernelResult<JobInstance> {
        let mut instance = self.add_instance(job_name);
        instance.app_name = app_name.to_string();
        instance.submitter = submitter.map(str::to_string);
        self.state
            .lock()
            .instances
            .insert(instance.instance_id, instance.clone());
        Ok(instance)
    }

    async fn get_job_instance(&self, instance_id: i64) -> KernelResult<JobInstance> {
        let delay = *self.instance_lookup_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state
            .lock()
            .instances
            .get(&instance_id)
            .cloned()
            .ok_or(KernelError::NoSuchJobInstance(instance_id))
    }

    async fn get_job_instance_id_from_execution_id(&self, execution_id: i64) -> KernelResult<i64> {
        self.state
            .lock()
            .executions
            .get(&execution_id)
            .map(|record| record.instance_id)
            .ok_or(KernelError::NoSuchJobExecution(execution_id))
    }

    async fn update_server_id_and_rest_url_for_starting_job(
        &self,
        execution_id: i64,
        server_id: &str,
        rest_url: &str,
    ) -> KernelResult<JobExecutionRecord> {
        let delay = *self.server_update_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let record = {
            let mut state = self.state.lock();
            let record = state
                .executions
                .get_mut(&execution_id)
                .ok_or(KernelError::NoSuchJobExecution(execution_id))?;
            record.server_id = Some(server_id.to_string());
            record.rest_url = Some(rest_url.to_string());
            record.clone()
        };
        self.server_updates.lock().push((
            execution_id,
            server_id.to_string(),
            rest_url.to_string(),
        ));
        Ok(record)
    }

    async fn get_job_execution(&self, execution_id: i64) -> KernelResult<JobExecutionRecord> {
        self.state
            .lock()
            .executions
            .get(&execution_id)
            .cloned()
            .ok_or(KernelError::NoSuchJobExecution(execution_id))
    }

    async fn create_job_execution(
        &self,
        instance_id: i64,
        parameters: JobParameters,
    ) -> KernelResult<JobExecutionRecord> {
        if !self.state.lock().instances.contains_key(&instance_id) {
            return Err(KernelError::NoSuchJobInstance(instance_id));
        }
        Ok(self.add_execution(instance_id, BatchStatus::Starting, parameters))
    }

    async fn get_most_recent_execution_id(&self, instance_id: i64) -> KernelResult<i64> {
        self.state
            .lock()
            .executions
            .values()
            .filter(|record| record.instance_id == instance_id)
            .map(|record| record.execution_id)
            .max()
            .ok_or(KernelError::NoSuchJobInstance(instance_id))
    }
}

/// Job definitions keyed by job name
#[derive(Debug, Default)]
pub struct StaticJobModels {
    definitions: Mutex<HashMap<String, Arc<JobDefinition>>>,
}

impl StaticJobModels {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, job_name: &str, definition: JobDefinition) -> Arc<JobDefinition> {
        let definition = Arc::new(definition);
        self.definitions
            .lock()
            .insert(job_name.to_string(), definition.clone());
        definition
    }
}

#[async_trait]
impl JobModelSource for StaticJobModels {
    async fn resolve_job_definition(
        &self,
        instance: &JobInstance,
    ) -> KernelResult<Arc<JobDefinition>> {
        self.definitions
            .lock()
            .get(&instance.job_name)
            .cloned()
            .ok_or_else(|| {
                KernelError::IllegalState(format!("no job definition for '{}'", instance.job_name))
            })
    }
}

/// How a [`ScriptedRunner`] behaves for every unit
#[derive(Debug, Clone)]
pub enum RunBehavior {
    /// Return the status immediately
    Finish(BatchStatus),
    /// Wait for the unit's cancellation token, then report STOPPED
    UntilStopped,
    /// Ignore stop requests and keep running for the given duration
    IgnoreStops(Duration),
    /// Wait for the cancellation token, then report the given status
    ReportAfterStop(BatchStatus),
    Fail(String),
    Panic(String),
}

/// Runner with a fixed behavior that records every unit it ran
#[derive(Debug)]
pub struct ScriptedRunner {
    behavior: RunBehavior,
    started: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new(behavior: RunBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            started: Mutex::new(Vec::new()),
        })
    }

    pub fn started_units(&self) -> Vec<String> {
        self.started.lock().clone()
    }

    pub fn started_count(&self) -> usize {
        self.started.lock().len()
    }
}

#[async_trait]
impl WorkUnitRunner for ScriptedRunner {
    async fn run(&self, unit: Arc<WorkUnit>) -> anyhow::Result<BatchStatus> {
        self.started.lock().push(unit.display_key());
        match &self.behavior {
            RunBehavior::Finish(status) => Ok(*status),
            RunBehavior::UntilStopped => {
                unit.cancellation_token().cancelled().await;
                Ok(BatchStatus::Stopped)
            }
            RunBehavior::ReportAfterStop(status) => {
                unit.cancellation_token().cancelled().await;
                Ok(*status)
            }
            RunBehavior::IgnoreStops(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(BatchStatus::Completed)
            }
            RunBehavior::Fail(message) => Err(anyhow::anyhow!(message.clone())),
            RunBehavior::Panic(message) => panic!("{message}"),
        }
    }
}

/// Pool that refuses every submission
#[derive(Debug, Default)]
pub struct RejectingPool;

impl WorkerPool for RejectingPool {
    fn execute_task(&self, task: WorkUnitTask) -> KernelResult<CompletionHandle> {
        Err(KernelError::Dispatch {
            key: task.unit().display_key(),
            reason: "executor saturated".to_string(),
        })
    }

    fn execute_parallel_task(&self, task: WorkUnitTask) -> KernelResult<CompletionHandle> {
        Err(KernelError::Dispatch {
            key: task.unit().display_key(),
            reason: "executor saturated".to_string(),
        })
    }
}

/// Controller whose stop requests always fail
#[derive(Debug, Default)]
pub struct FailingController;

impl ExecutionController for FailingController {
    fn request_stop(&self) -> KernelResult<()> {
        Err(KernelError::Controller {
            key: "failing".to_string(),
            reason: "remote executor unreachable".to_string(),
        })
    }

    fn is_stop_requested(&self) -> bool {
        false
    }
}

/// Controller that panics when asked to stop
#[derive(Debug, Default)]
pub struct PanickingController;

impl ExecutionController for PanickingController {
    fn request_stop(&self) -> KernelResult<()> {
        panic!("controller state corrupted");
    }

    fn is_stop_requested(&self) -> bool {
        false
    }
}
