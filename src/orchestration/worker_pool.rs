//! # Worker Pool
//!
//! The execution seam between the kernel and whatever runs work units. The kernel
//! hands the pool a [`WorkUnitTask`] (the unit plus the future that runs it to
//! completion) and gets back a [`CompletionHandle`]. Submission is synchronous, so a
//! pool that cannot accept a task reports it immediately and the kernel can undo
//! the registration.
//!
//! [`TokioWorkerPool`] spawns onto a tokio runtime. Top-level jobs go through
//! [`WorkerPool::execute_task`], optionally bounded by a semaphore; partitions and
//! split-flows go through [`WorkerPool::execute_parallel_task`] and are never
//! throttled, because a job waiting on its partitions must not starve them of permits.
//!
//! ```rust
//! use batch_kernel::constants::BatchStatus;
//! use batch_kernel::models::{JobDefinition, JobParameters, RuntimeJobExecution, WorkUnit};
//! use batch_kernel::orchestration::{TokioWorkerPool, WorkUnitTask, WorkerPool};
//! use futures::FutureExt;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let pool = TokioWorkerPool::new(tokio::runtime::Handle::current(), Some(2));
//! let execution = Arc::new(RuntimeJobExecution::top_level(1, 1, "job", JobParameters::new(), None));
//! let unit = Arc::new(WorkUnit::job(execution, Arc::new(JobDefinition::new("job"))));
//!
//! let task = WorkUnitTask::new(unit, async { BatchStatus::Completed }.boxed());
//! let handle = pool.execute_task(task)?;
//! assert_eq!(handle.wait().await?, BatchStatus::Completed);
//! # Ok::<(), batch_kernel::KernelError>(())
//! # }).unwrap();
//! ```

use crate::config::KernelConfig;
use crate::constants::BatchStatus;
use crate::error::{KernelError, KernelResult};
use crate::models::WorkUnit;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A work unit together with the future that runs it to a final status
pub struct WorkUnitTask {
    unit: Arc<WorkUnit>,
    body: BoxFuture<'static, BatchStatus>,
}

impl WorkUnitTask {
    pub fn new(unit: Arc<WorkUnit>, body: BoxFuture<'static, BatchStatus>) -> Self {
        Self { unit, body }
    }

    pub fn unit(&self) -> &Arc<WorkUnit> {
        &self.unit
    }

    pub fn into_parts(self) -> (Arc<WorkUnit>, BoxFuture<'static, BatchStatus>) {
        (self.unit, self.body)
    }
}

impl fmt::Debug for WorkUnitTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkUnitTask")
            .field("unit", &self.unit.display_key())
            .field("kind", &self.unit.kind().label())
            .finish()
    }
}

/// Handle to a dispatched work unit's eventual final status
#[derive(Debug)]
pub struct CompletionHandle {
    key: String,
    handle: JoinHandle<BatchStatus>,
}

impl CompletionHandle {
    pub fn new(key: impl Into<String>, handle: JoinHandle<BatchStatus>) -> Self {
        Self {
            key: key.into(),
            handle,
        }
    }

    /// Registry address of the unit this handle tracks
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the unit's final status
    pub async fn wait(self) -> KernelResult<BatchStatus> {
        let key = self.key;
        self.handle.await.map_err(|e| KernelError::Completion {
            key,
            reason: e.to_string(),
        })
    }
}

/// Executes work units on behalf of the kernel
pub trait WorkerPool: Send + Sync + fmt::Debug {
    /// Submit a top-level job
    fn execute_task(&self, task: WorkUnitTask) -> KernelResult<CompletionHandle>;

    /// Submit a partition or split-flow
    fn execute_parallel_task(&self, task: WorkUnitTask) -> KernelResult<CompletionHandle>;
}

/// Worker pool that spawns work units onto a tokio runtime
#[derive(Debug)]
pub struct TokioWorkerPool {
    handle: Handle,
    job_permits: Option<Arc<Semaphore>>,
    closed: AtomicBool,
}

impl TokioWorkerPool {
    /// `max_concurrent_jobs: None` leaves top-level jobs unbounded
    pub fn new(handle: Handle, max_concurrent_jobs: Option<usize>) -> Self {
        info!(
            max_concurrent_jobs = ?max_concurrent_jobs,
            "🏊 POOL: Creating tokio worker pool"
        );
        Self {
            handle,
            job_permits: max_concurrent_jobs.map(|limit| Arc::new(Semaphore::new(limit))),
            closed: AtomicBool::new(false),
        }
    }

    /// Pool on the current runtime, sized from configuration
    pub fn from_config(config: &KernelConfig) -> KernelResult<Self> {
        let handle = Handle::try_current().map_err(|e| {
            KernelError::IllegalState(format!("worker pool requires a tokio runtime: {e}"))
        })?;
        Ok(Self::new(handle, config.job_concurrency_limit()))
    }

    /// Refuse further submissions; already running units are unaffected
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("🛑 POOL: Worker pool closed to new work units");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Job permits currently free, `None` when jobs are unbounded
    pub fn available_job_permits(&self) -> Option<usize> {
        self.job_permits
            .as_ref()
            .map(|permits| permits.available_permits())
    }

    fn ensure_open(&self, task: &WorkUnitTask) -> KernelResult<()> {
        if self.is_closed() {
            warn!(
                unit_key = %task.unit().display_key(),
                "Worker pool is closed - rejecting work unit"
            );
            return Err(KernelError::Dispatch {
                key: task.unit().display_key(),
                reason: "worker pool is closed".to_string(),
            });
        }
        Ok(())
    }
}

impl WorkerPool for TokioWorkerPool {
    fn execute_task(&self, task: WorkUnitTask) -> KernelResult<CompletionHandle> {
        self.ensure_open(&task)?;
        let (unit, body) = task.into_parts();
        let key = unit.display_key();
        let permits = self.job_permits.clone();

        debug!(unit_key = %key, "Spawning job work unit");
        let handle = self.handle.spawn(async move {
            // held until the body finishes
            let _permit = match permits {
                Some(semaphore) => match semaphore.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        warn!(
                            unit_key = %unit.display_key(),
                            "Job permit semaphore closed - running without a permit"
                        );
                        None
                    }
                },
                None => None,
            };
            body.await
        });

        Ok(CompletionHandle::new(key, handle))
    }

    fn execute_parallel_task(&self, task: WorkUnitTask) -> KernelResult<CompletionHandle> {
        self.ensure_open(&task)?;
        let (unit, body) = task.into_parts();
        let key = unit.display_key();

        debug!(unit_key = %key, kind = unit.kind().label(), "Spawning parallel work unit");
        let handle = self.handle.spawn(body);

        Ok(CompletionHandle::new(key, handle))
    }
}
