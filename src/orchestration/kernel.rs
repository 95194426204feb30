//! # Batch Kernel
//!
//! Starts, restarts, partitions and stops job executions.
//!
//! ## Lifecycle of a work unit
//!
//! ```text
//! start / restart / create_*_work_unit
//!         │
//!         ▼
//!   WorkUnitRegistry::register_*      (duplicate key -> DuplicateRegistration)
//!         │
//!         ▼
//!   WorkerPool::execute_*             (submission error -> deregister, propagate)
//!         │
//!         ▼
//!   WorkUnitRunner::run               (error or panic -> FAILED)
//!         │
//!         ▼
//!   RuntimeJobExecution::finish -> WorkUnitRegistry::deregister -> ended event
//! ```
//!
//! Stops are cooperative. `stop_job` signals the job unit's controller; partitions
//! and split-flows created under that job hold child cancellation tokens, so the
//! stop reaches them without the kernel touching each sub-unit. `shutdown` signals
//! every registered unit and waits a bounded grace period for the registry to drain.

use crate::config::KernelConfig;
use crate::constants::{topics, BatchStatus, CORRELATION_ID_PARAMETER};
use crate::error::{KernelError, KernelResult};
use crate::events::{BatchEventSink, BroadcastEventPublisher, PublishedEvent};
use crate::logging::{log_kernel_operation, log_work_unit_operation};
use crate::models::{
    Flow, JobDefinition, JobInstance, JobParameters, JslProperties, RuntimeJobExecution, Split,
    Step, WorkUnit, WorkUnitKind,
};
use crate::orchestration::services::{JobModelSource, PersistenceService, WorkUnitRunner};
use crate::orchestration::sub_job_builder::SubJobBuilder;
use crate::orchestration::worker_pool::{
    CompletionHandle, TokioWorkerPool, WorkUnitTask, WorkerPool,
};
use crate::registry::WorkUnitRegistry;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{fence, AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

/// A top-level execution that has been registered and handed to the worker pool
#[derive(Debug)]
pub struct DispatchedJob {
    execution: Arc<RuntimeJobExecution>,
    completion: CompletionHandle,
}

impl DispatchedJob {
    pub fn execution(&self) -> &Arc<RuntimeJobExecution> {
        &self.execution
    }

    pub fn execution_id(&self) -> i64 {
        self.execution.execution_id()
    }

    pub fn is_finished(&self) -> bool {
        self.completion.is_finished()
    }

    /// Wait for the execution's final status
    pub async fn wait(self) -> KernelResult<BatchStatus> {
        self.completion.wait().await
    }
}

/// Outcome of [`BatchKernel::shutdown`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    /// Units a stop was requested for
    pub units_signalled: usize,
    /// Controllers that returned an error or panicked
    pub stop_failures: usize,
    /// Whether the registry drained within the grace period
    pub drained: bool,
    /// Registry addresses of units still registered when the grace period ended
    pub remaining_units: Vec<String>,
    pub elapsed_ms: u64,
}

pub struct BatchKernel {
    config: KernelConfig,
    registry: Arc<WorkUnitRegistry>,
    persistence: Arc<dyn PersistenceService>,
    job_models: Arc<dyn JobModelSource>,
    runner: Arc<dyn WorkUnitRunner>,
    worker_pool: Arc<dyn WorkerPool>,
    event_sink: Option<Arc<dyn BatchEventSink>>,
    publisher: Option<BroadcastEventPublisher>,
    shutting_down: AtomicBool,
    shutdown_lock: Mutex<()>,
}

impl std::fmt::Debug for BatchKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchKernel")
            .field("config", &self.config)
            .field("registry", &self.registry.stats())
            .field("worker_pool", &self.worker_pool)
            .field("event_sink", &self.event_sink)
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}

impl BatchKernel {
    pub fn builder(
        persistence: Arc<dyn PersistenceService>,
        job_models: Arc<dyn JobModelSource>,
        runner: Arc<dyn WorkUnitRunner>,
    ) -> BatchKernelBuilder {
        BatchKernelBuilder::new(persistence, job_models, runner)
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<WorkUnitRegistry> {
        &self.registry
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Receiver on the built-in publisher, when the kernel created one
    pub fn subscribe_events(&self) -> Option<broadcast::Receiver<PublishedEvent>> {
        self.publisher.as_ref().map(BroadcastEventPublisher::subscribe)
    }

    /// Live execution of a registered top-level job
    pub fn job_execution(&self, execution_id: i64) -> Option<Arc<RuntimeJobExecution>> {
        self.registry
            .job_unit(execution_id)
            .map(|unit| unit.execution().clone())
    }

    pub fn is_execution_running(&self, execution_id: i64) -> bool {
        self.registry.contains_job(execution_id)
    }

    pub fn running_execution_ids(&self) -> Vec<i64> {
        self.registry.registered_job_ids()
    }

    /// Start a new execution of `job_instance`.
    ///
    /// Returns once the job unit is registered and dispatched.
    pub async fn start(
        &self,
        job_instance: &JobInstance,
        job_definition: Arc<JobDefinition>,
        parameters: JobParameters,
        execution_id: i64,
    ) -> KernelResult<DispatchedJob> {
        self.ensure_accepting_work()?;

        let instance = self
            .persistence
            .get_job_instance(job_instance.instance_id)
            .await?;
        if instance.is_stopped() {
            warn!(
                instance_id = instance.instance_id,
                execution_id = execution_id,
                "Job instance was stopped before its execution started - not dispatching"
            );
            return Err(KernelError::JobInstanceStopped {
                instance_id: instance.instance_id,
                execution_id,
            });
        }

        let dispatched = self
            .launch(&instance, job_definition, parameters, execution_id)
            .await?;

        self.publish_execution_event(topics::JOB_EXECUTION_STARTING, dispatched.execution())
            .await;
        self.publish_instance_event(topics::JOB_INSTANCE_DISPATCHED, &instance)
            .await;

        log_kernel_operation(
            "start",
            Some(execution_id),
            Some(&instance.job_name),
            "dispatched",
            None,
        );
        Ok(dispatched)
    }

    /// Restart the instance that owns `execution_id` with a new execution.
    ///
    /// `override_parameters` replaces the previous execution's parameters when given.
    pub async fn restart(
        &self,
        execution_id: i64,
        override_parameters: Option<JobParameters>,
    ) -> KernelResult<DispatchedJob> {
        self.ensure_accepting_work()?;

        let instance_id = self
            .persistence
            .get_job_instance_id_from_execution_id(execution_id)
            .await?;
        let instance = self.persistence.get_job_instance(instance_id).await?;
        let previous = self.persistence.get_job_execution(execution_id).await?;

        match previous.batch_status {
            BatchStatus::Completed => {
                return Err(KernelError::JobAlreadyCompleted {
                    execution_id,
                    instance_id,
                });
            }
            BatchStatus::Abandoned => {
                return Err(KernelError::JobRestartRefused {
                    execution_id,
                    reason: "execution was abandoned".to_string(),
                });
            }
            _ => {}
        }

        let job_definition = self.job_models.resolve_job_definition(&instance).await?;
        if !job_definition.is_restartable() {
            return Err(KernelError::JobRestartRefused {
                execution_id,
                reason: format!("job '{}' is not restartable", job_definition.id),
            });
        }

        if previous.batch_status.is_active() || self.registry.contains_job(execution_id) {
            return Err(KernelError::JobExecutionAlreadyRunning {
                execution_id,
                status: previous.batch_status,
            });
        }

        let most_recent_execution_id = self
            .persistence
            .get_most_recent_execution_id(instance_id)
            .await?;
        if most_recent_execution_id != execution_id {
            return Err(KernelError::JobExecutionNotMostRecent {
                execution_id,
                instance_id,
                most_recent_execution_id,
            });
        }

        let parameters = override_parameters.unwrap_or(previous.parameters);
        let new_execution = self
            .persistence
            .create_job_execution(instance_id, parameters.clone())
            .await?;

        info!(
            previous_execution_id = execution_id,
            execution_id = new_execution.execution_id,
            instance_id = instance_id,
            job_name = %instance.job_name,
            "🔄 KERNEL: Restarting job instance"
        );

        let dispatched = self
            .launch(
                &instance,
                job_definition,
                parameters,
                new_execution.execution_id,
            )
            .await?;

        self.publish_execution_event(topics::JOB_EXECUTION_RESTARTING, dispatched.execution())
            .await;

        log_kernel_operation(
            "restart",
            Some(new_execution.execution_id),
            Some(&instance.job_name),
            "dispatched",
            Some(&format!("previous_execution_id={execution_id}")),
        );
        Ok(dispatched)
    }

    /// Build and register (without dispatching) the work unit for one partition of `step`
    pub fn create_partition_work_unit(
        &self,
        top_level_execution: &Arc<RuntimeJobExecution>,
        step: &Step,
        partition_index: u32,
        job_properties: Option<&JslProperties>,
    ) -> KernelResult<Arc<WorkUnit>> {
        self.ensure_accepting_work()?;

        let definition = SubJobBuilder::build_partition_level_job(
            top_level_execution.top_level_execution_id(),
            job_properties,
            step,
            partition_index,
        )?;

        self.register_sub_unit(
            WorkUnitKind::Partition {
                step_name: step.id.clone(),
                partition_index,
            },
            top_level_execution,
            definition,
        )
    }

    /// Build and register (without dispatching) the work unit for one flow of `split`
    pub fn create_split_flow_work_unit(
        &self,
        top_level_execution: &Arc<RuntimeJobExecution>,
        split: &Split,
        flow: &Flow,
        context_properties: Option<&JslProperties>,
    ) -> KernelResult<Arc<WorkUnit>> {
        self.ensure_accepting_work()?;

        let definition = SubJobBuilder::build_flow_in_split_sub_job(
            top_level_execution.top_level_execution_id(),
            context_properties,
            split,
            flow,
        )?;

        self.register_sub_unit(
            WorkUnitKind::SplitFlow {
                split_name: split.id.clone(),
                flow_name: flow.id.clone(),
            },
            top_level_execution,
            definition,
        )
    }

    /// Dispatch a registered partition unit without waiting for it
    pub fn run_partition(&self, unit: Arc<WorkUnit>) -> KernelResult<CompletionHandle> {
        if !matches!(unit.kind(), WorkUnitKind::Partition { .. }) {
            return Err(KernelError::IllegalState(format!(
                "run_partition called with a {} unit ({})",
                unit.kind().label(),
                unit.display_key()
            )));
        }
        self.dispatch_parallel(unit, topics::PARTITION_ENDED)
    }

    /// Dispatch a registered split-flow unit without waiting for it
    pub fn run_split_flow(&self, unit: Arc<WorkUnit>) -> KernelResult<CompletionHandle> {
        if !matches!(unit.kind(), WorkUnitKind::SplitFlow { .. }) {
            return Err(KernelError::IllegalState(format!(
                "run_split_flow called with a {} unit ({})",
                unit.kind().label(),
                unit.display_key()
            )));
        }
        self.dispatch_parallel(unit, topics::SPLIT_FLOW_ENDED)
    }

    /// Request a cooperative stop of a running top-level job
    pub fn stop_job(&self, execution_id: i64) -> KernelResult<()> {
        let unit = self
            .registry
            .job_unit(execution_id)
            .ok_or(KernelError::JobExecutionNotRunning { execution_id })?;

        unit.request_stop()?;

        log_kernel_operation(
            "stop",
            Some(execution_id),
            Some(unit.execution().job_name()),
            "stop_requested",
            None,
        );
        self.publish_stopping_in_background(&unit);
        Ok(())
    }

    /// Stop every registered unit and wait up to the grace period for them to finish.
    ///
    /// Controller errors and panics are logged and counted, never propagated.
    pub async fn shutdown(&self) -> ShutdownReport {
        let _guard = self.shutdown_lock.lock().await;
        let started = Instant::now();
        // Set before the snapshot: a registration racing with this either appears in
        // the snapshot or sees the flag and withdraws itself.
        self.shutting_down.store(true, Ordering::SeqCst);
        fence(Ordering::SeqCst);

        let units = self.registry.snapshot();
        info!(
            registered_units = units.len(),
            grace_period_ms = self.config.shutdown_grace_period_ms,
            "🛑 KERNEL: Shutdown requested - stopping registered work units"
        );

        let mut stop_failures = 0;
        for unit in &units {
            match std::panic::catch_unwind(AssertUnwindSafe(|| unit.request_stop())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    stop_failures += 1;
                    warn!(
                        unit_key = %unit.display_key(),
                        error = %e,
                        "Failed to stop work unit during shutdown - continuing"
                    );
                }
                Err(panic) => {
                    stop_failures += 1;
                    error!(
                        unit_key = %unit.display_key(),
                        panic = %panic_message(panic.as_ref()),
                        "Work unit controller panicked during shutdown - continuing"
                    );
                }
            }
        }

        let grace = self.config.shutdown_grace_period();
        let poll_interval = self.config.shutdown_poll_interval();
        let deadline = started + grace;
        while !self.registry.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep(poll_interval.min(deadline - now)).await;
        }

        let remaining_units: Vec<String> = self
            .registry
            .snapshot()
            .iter()
            .map(|unit| unit.display_key())
            .collect();
        let drained = remaining_units.is_empty();
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if drained {
            info!(
                units_signalled = units.len(),
                stop_failures = stop_failures,
                elapsed_ms = elapsed_ms,
                "✅ KERNEL: Shutdown complete - all work units finished"
            );
        } else {
            warn!(
                remaining = remaining_units.len(),
                remaining_units = ?remaining_units,
                elapsed_ms = elapsed_ms,
                "⚠️ KERNEL: Grace period elapsed with work units still registered"
            );
        }

        ShutdownReport {
            units_signalled: units.len(),
            stop_failures,
            drained,
            remaining_units,
            elapsed_ms,
        }
    }

    fn ensure_accepting_work(&self) -> KernelResult<()> {
        if self.is_shutting_down() {
            return Err(KernelError::ShuttingDown);
        }
        Ok(())
    }

    /// Undo a registration that completed after shutdown began
    fn withdraw_if_shutting_down(&self, unit: &Arc<WorkUnit>) -> KernelResult<()> {
        fence(Ordering::SeqCst);
        if !self.is_shutting_down() {
            return Ok(());
        }
        self.registry.deregister(unit);
        warn!(
            unit_key = %unit.display_key(),
            "Shutdown began while registering work unit - registration withdrawn"
        );
        Err(KernelError::ShuttingDown)
    }

    /// Shared create/register/dispatch path of start and restart
    async fn launch(
        &self,
        instance: &JobInstance,
        job_definition: Arc<JobDefinition>,
        parameters: JobParameters,
        execution_id: i64,
    ) -> KernelResult<DispatchedJob> {
        self.ensure_accepting_work()?;
        self.persistence
            .update_server_id_and_rest_url_for_starting_job(
                execution_id,
                &self.config.server_id,
                &self.config.rest_url,
            )
            .await?;

        let correlation_id = parameters.get(CORRELATION_ID_PARAMETER).cloned();
        let execution = Arc::new(RuntimeJobExecution::top_level(
            execution_id,
            instance.instance_id,
            instance.job_name.clone(),
            parameters,
            correlation_id,
        ));

        let unit = Arc::new(WorkUnit::job(execution.clone(), job_definition));
        self.registry.register_job(unit.clone())?;
        self.withdraw_if_shutting_down(&unit)?;

        let task = WorkUnitTask::new(
            unit.clone(),
            self.completion_body(unit.clone(), topics::JOB_EXECUTION_ENDED),
        );
        let completion = match self.worker_pool.execute_task(task) {
            Ok(completion) => completion,
            Err(e) => {
                self.registry.deregister(&unit);
                error!(
                    execution_id = execution_id,
                    error = %e,
                    "❌ KERNEL: Failed to dispatch job - registration rolled back"
                );
                return Err(e);
            }
        };

        Ok(DispatchedJob {
            execution,
            completion,
        })
    }

    fn register_sub_unit(
        &self,
        kind: WorkUnitKind,
        top_level_execution: &Arc<RuntimeJobExecution>,
        definition: JobDefinition,
    ) -> KernelResult<Arc<WorkUnit>> {
        let top_level_execution_id = top_level_execution.top_level_execution_id();
        let execution = Arc::new(RuntimeJobExecution::sub_job(
            top_level_execution,
            definition.id.clone(),
        ));

        let parent_token = self
            .registry
            .job_unit(top_level_execution_id)
            .map(|job| job.cancellation_token());
        if parent_token.is_none() {
            debug!(
                top_level_execution_id = top_level_execution_id,
                sub_job_id = %definition.id,
                "No registered job unit for sub-unit - it will not follow job stops"
            );
        }

        let unit = Arc::new(WorkUnit::sub_unit(
            kind,
            execution,
            Arc::new(definition),
            parent_token.as_ref(),
        ));
        self.registry.register_sub_unit(unit.clone())?;
        self.withdraw_if_shutting_down(&unit)?;

        log_work_unit_operation(
            "register",
            top_level_execution_id,
            &unit.display_key(),
            "registered",
            Some(unit.kind().label()),
        );
        Ok(unit)
    }

    fn dispatch_parallel(
        &self,
        unit: Arc<WorkUnit>,
        ended_topic: &'static str,
    ) -> KernelResult<CompletionHandle> {
        let task = WorkUnitTask::new(unit.clone(), self.completion_body(unit.clone(), ended_topic));
        match self.worker_pool.execute_parallel_task(task) {
            Ok(completion) => {
                log_work_unit_operation(
                    "dispatch",
                    unit.top_level_execution_id(),
                    &unit.display_key(),
                    "dispatched",
                    None,
                );
                Ok(completion)
            }
            Err(e) => {
                self.registry.deregister(&unit);
                error!(
                    unit_key = %unit.display_key(),
                    error = %e,
                    "❌ KERNEL: Failed to dispatch sub-unit - registration rolled back"
                );
                Err(e)
            }
        }
    }

    /// The future a worker runs: run the unit, record its final status, deregister it
    /// and announce the end.
    fn completion_body(
        &self,
        unit: Arc<WorkUnit>,
        ended_topic: &'static str,
    ) -> BoxFuture<'static, BatchStatus> {
        let registry = self.registry.clone();
        let runner = self.runner.clone();
        let event_sink = self.event_sink.clone();

        async move {
            // A stop of the owning job reaches sub-units only through their token
            if unit.cancellation_token().is_cancelled() {
                unit.execution().mark_stopping();
            }

            let reported = if unit.execution().mark_started() {
                match AssertUnwindSafe(runner.run(unit.clone()))
                    .catch_unwind()
                    .await
                {
                    Ok(Ok(status)) => status,
                    Ok(Err(e)) => {
                        error!(
                            unit_key = %unit.display_key(),
                            error = %e,
                            "❌ KERNEL: Work unit failed"
                        );
                        BatchStatus::Failed
                    }
                    Err(panic) => {
                        error!(
                            unit_key = %unit.display_key(),
                            panic = %panic_message(panic.as_ref()),
                            "❌ KERNEL: Work unit panicked"
                        );
                        BatchStatus::Failed
                    }
                }
            } else {
                debug!(
                    unit_key = %unit.display_key(),
                    "Work unit stopped before it started running"
                );
                BatchStatus::Stopped
            };

            if unit.cancellation_token().is_cancelled() {
                unit.execution().mark_stopping();
            }
            let final_status = unit.execution().finish(reported);
            registry.deregister(&unit);

            log_work_unit_operation(
                "complete",
                unit.top_level_execution_id(),
                &unit.display_key(),
                &final_status.to_string(),
                Some(unit.kind().label()),
            );

            if let Some(sink) = event_sink {
                if let Err(e) = sink
                    .publish_execution_event(ended_topic, unit.execution())
                    .await
                {
                    warn!(
                        unit_key = %unit.display_key(),
                        error = %e,
                        "Failed to publish work unit end event"
                    );
                }
            }

            final_status
        }
        .boxed()
    }

    async fn publish_execution_event(&self, topic: &str, execution: &RuntimeJobExecution) {
        let Some(sink) = &self.event_sink else {
            return;
        };
        if let Err(e) = sink.publish_execution_event(topic, execution).await {
            warn!(
                topic = topic,
                execution_id = execution.execution_id(),
                error = %e,
                "Failed to publish execution event"
            );
        }
    }

    async fn publish_instance_event(&self, topic: &str, instance: &JobInstance) {
        let Some(sink) = &self.event_sink else {
            return;
        };
        if let Err(e) = sink.publish_instance_event(topic, instance).await {
            warn!(
                topic = topic,
                instance_id = instance.instance_id,
                error = %e,
                "Failed to publish instance event"
            );
        }
    }

    /// `stop_job` is synchronous, so the stopping event goes out on the runtime when one is available
    fn publish_stopping_in_background(&self, unit: &Arc<WorkUnit>) {
        let Some(sink) = self.event_sink.clone() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(
                execution_id = unit.execution().execution_id(),
                "No tokio runtime available - skipping stopping event"
            );
            return;
        };

        let execution = unit.execution().clone();
        handle.spawn(async move {
            if let Err(e) = sink
                .publish_execution_event(topics::JOB_EXECUTION_STOPPING, &execution)
                .await
            {
                warn!(
                    execution_id = execution.execution_id(),
                    error = %e,
                    "Failed to publish stopping event"
                );
            }
        });
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Builder pattern for creating kernels with fluent API
pub struct BatchKernelBuilder {
    persistence: Arc<dyn PersistenceService>,
    job_models: Arc<dyn JobModelSource>,
    runner: Arc<dyn WorkUnitRunner>,
    config: KernelConfig,
    worker_pool: Option<Arc<dyn WorkerPool>>,
    event_sink: Option<Arc<dyn BatchEventSink>>,
    registry: Option<Arc<WorkUnitRegistry>>,
}

impl BatchKernelBuilder {
    /// Create a new builder
    pub fn new(
        persistence: Arc<dyn PersistenceService>,
        job_models: Arc<dyn JobModelSource>,
        runner: Arc<dyn WorkUnitRunner>,
    ) -> Self {
        Self {
            persistence,
            job_models,
            runner,
            config: KernelConfig::default(),
            worker_pool: None,
            event_sink: None,
            registry: None,
        }
    }

    /// Set the kernel configuration
    pub fn with_config(mut self, config: KernelConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the worker pool; defaults to a [`TokioWorkerPool`] on the current runtime
    pub fn with_worker_pool(mut self, worker_pool: Arc<dyn WorkerPool>) -> Self {
        self.worker_pool = Some(worker_pool);
        self
    }

    /// Set the event sink; ignored when `publish_events` is off. Without one the
    /// kernel publishes to its own [`BroadcastEventPublisher`].
    pub fn with_event_sink(mut self, event_sink: Arc<dyn BatchEventSink>) -> Self {
        self.event_sink = Some(event_sink);
        self
    }

    /// Share an existing registry
    pub fn with_registry(mut self, registry: Arc<WorkUnitRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the kernel
    pub fn build(self) -> KernelResult<BatchKernel> {
        self.config.validate()?;

        let worker_pool = match self.worker_pool {
            Some(pool) => pool,
            None => Arc::new(TokioWorkerPool::from_config(&self.config)?),
        };
        let (event_sink, publisher) = match (self.config.publish_events, self.event_sink) {
            (false, _) => (None, None),
            (true, Some(sink)) => (Some(sink), None),
            (true, None) => {
                let publisher = BroadcastEventPublisher::from_config(&self.config);
                let sink: Arc<dyn BatchEventSink> = Arc::new(publisher.clone());
                (Some(sink), Some(publisher))
            }
        };

        info!(
            environment = %self.config.environment,
            server_id = %self.config.server_id,
            grace_period_ms = self.config.shutdown_grace_period_ms,
            max_concurrent_jobs = self.config.max_concurrent_jobs,
            events = event_sink.is_some(),
            "🚀 KERNEL: Batch kernel initialized"
        );

        Ok(BatchKernel {
            config: self.config,
            registry: self.registry.unwrap_or_default(),
            persistence: self.persistence,
            job_models: self.job_models,
            runner: self.runner,
            worker_pool,
            event_sink,
            publisher,
            shutting_down: AtomicBool::new(false),
            shutdown_lock: Mutex::new(()),
        })
    }
}
