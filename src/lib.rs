#![allow(clippy::doc_markdown)] // Allow technical terms like JobExecution, SplitFlow in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Batch Kernel
//!
//! Work-unit execution kernel for long-running batch jobs.
//!
//! ## Overview
//!
//! The kernel starts top-level job executions, fans them out into partitioned and
//! split-flow sub-jobs, tracks every live unit in a shared registry and stops them
//! cooperatively, including a bounded graceful shutdown. Alongside it, the resilience
//! policies decide how chunk-oriented processing reacts to read, process and write
//! failures.
//!
//! ## Key Features
//!
//! - **Typed work units**: jobs, partitions and split-flows as one tagged enum with
//!   collision-free registry keys
//! - **Atomic registry**: `DashMap`-backed insert-if-absent and remove-if-same
//! - **Cooperative cancellation**: job stops cascade to sub-units through child tokens
//! - **Retry/skip policies**: nearest-ancestor include/exclude classification over a
//!   named error type hierarchy
//!
//! ## Module Organization
//!
//! - [`orchestration`] - kernel, sub-job builder, worker pool and collaborator traits
//! - [`registry`] - live work unit registry
//! - [`resilience`] - exception classifier, retry and skip policies
//! - [`models`] - job definitions, executions and work units
//! - [`events`] - lifecycle event sink and broadcast publisher
//! - [`config`] - configuration management
//! - [`error`] - structured error handling
//! - [`logging`] - structured logging setup and helpers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use batch_kernel::config::ConfigManager;
//! use batch_kernel::orchestration::{BatchKernel, JobModelSource, PersistenceService, WorkUnitRunner};
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     persistence: Arc<dyn PersistenceService>,
//! #     job_models: Arc<dyn JobModelSource>,
//! #     runner: Arc<dyn WorkUnitRunner>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! batch_kernel::logging::init_structured_logging();
//! let config = ConfigManager::load()?;
//!
//! let kernel = BatchKernel::builder(persistence, job_models, runner)
//!     .with_config(config.config().clone())
//!     .build()?;
//!
//! // ... start jobs ...
//!
//! let report = kernel.shutdown().await;
//! println!("shutdown drained: {}", report.drained);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, integration and property tests
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod registry;
pub mod resilience;

pub use config::{ConfigManager, ConfigurationError, KernelConfig};
pub use constants::{topics, BatchStatus, InstanceState, MIN_UNLIMITED, MIN_UNLIMITED_I32};
pub use error::{KernelError, KernelResult};
pub use events::{BatchEventSink, BroadcastEventPublisher, PublishedEvent};
pub use models::{JobDefinition, JobInstance, RuntimeJobExecution, SubUnitKey, WorkUnit, WorkUnitKind};
pub use orchestration::{
    BatchKernel, BatchKernelBuilder, CompletionHandle, ShutdownReport, SubJobBuilder,
    TokioWorkerPool, WorkerPool,
};
pub use registry::WorkUnitRegistry;
pub use resilience::{ChunkError, ExceptionClassifier, PolicyError, RetryPolicy, SkipPolicy, TypeHierarchy};
