//! # Orchestration Engine
//!
//! Drives work units from registration to completion.
//!
//! ## Core Components
//!
//! - **BatchKernel**: starts, restarts, partitions and stops job executions; owns shutdown
//! - **SubJobBuilder**: carves partition-level and split-flow sub-jobs out of a job definition
//! - **WorkerPool**: execution seam; `TokioWorkerPool` spawns units onto a tokio runtime
//! - **ExecutionController**: cooperative stop capability held by every work unit
//! - **Services**: persistence, job model source and unit runner collaborators

pub mod controller;
pub mod kernel;
pub mod services;
pub mod sub_job_builder;
pub mod worker_pool;

pub use controller::{CancellationController, ExecutionController};
pub use kernel::{BatchKernel, BatchKernelBuilder, DispatchedJob, ShutdownReport};
pub use services::{JobModelSource, PersistenceService, WorkUnitRunner};
pub use sub_job_builder::{parse_top_level_execution_id, SubJobBuilder};
pub use worker_pool::{CompletionHandle, TokioWorkerPool, WorkUnitTask, WorkerPool};
