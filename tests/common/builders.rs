//! Kernel and job definition builders shared across integration tests.

use super::fakes::{InMemoryPersistence, ScriptedRunner, StaticJobModels};
use batch_kernel::config::KernelConfig;
use batch_kernel::events::BroadcastEventPublisher;
use batch_kernel::models::{
    ArtifactRef, Chunk, ExceptionClassFilter, ExecutionElement, Flow, JobDefinition,
    JslProperties, Partition, PartitionPlan, Split, Step,
};
use batch_kernel::orchestration::{BatchKernel, BatchKernelBuilder, WorkerPool};
use std::sync::Arc;

/// Configuration with short shutdown timings for tests
pub fn test_config() -> KernelConfig {
    KernelConfig {
        environment: "test".to_string(),
        shutdown_grace_period_ms: 300,
        shutdown_poll_interval_ms: 10,
        server_id: "test-server".to_string(),
        rest_url: "https://localhost:9443/batch".to_string(),
        ..KernelConfig::default()
    }
}

/// Everything a kernel test needs to drive and inspect the kernel
pub struct KernelHarness {
    pub kernel: BatchKernel,
    pub persistence: Arc<InMemoryPersistence>,
    pub job_models: Arc<StaticJobModels>,
    pub runner: Arc<ScriptedRunner>,
    pub events: BroadcastEventPublisher,
}

pub struct KernelHarnessBuilder {
    runner: Arc<ScriptedRunner>,
    config: KernelConfig,
    worker_pool: Option<Arc<dyn WorkerPool>>,
}

impl KernelHarnessBuilder {
    pub fn new(runner: Arc<ScriptedRunner>) -> Self {
        Self {
            runner,
            config: test_config(),
            worker_pool: None,
        }
    }

    pub fn with_config(mut self, config: KernelConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_worker_pool(mut self, worker_pool: Arc<dyn WorkerPool>) -> Self {
        self.worker_pool = Some(worker_pool);
        self
    }

    /// Must be called inside a tokio runtime when no worker pool is supplied
    pub fn build(self) -> KernelHarness {
        let persistence = InMemoryPersistence::new();
        let job_models = StaticJobModels::new();
        let events = BroadcastEventPublisher::new(64);

        let mut builder: BatchKernelBuilder =
            BatchKernel::builder(persistence.clone(), job_models.clone(), self.runner.clone())
                .with_config(self.config)
                .with_event_sink(Arc::new(events.clone()));
        if let Some(pool) = self.worker_pool {
            builder = builder.with_worker_pool(pool);
        }

        KernelHarness {
            kernel: builder.build().expect("kernel should build"),
            persistence,
            job_models,
            runner: self.runner,
            events,
        }
    }
}

pub fn chunk_step(id: &str) -> Step {
    let mut chunk = Chunk::default();
    chunk.reader = Some(ArtifactRef::new("recordReader"));
    chunk.writer = Some(ArtifactRef::new("recordWriter"));
    chunk.set_item_count("10");
    chunk.set_retry_limit("3");
    chunk.retryable_exception_classes = Some(ExceptionClassFilter::including(["IoError"]));

    let mut step = Step::new(id);
    step.chunk = Some(chunk);
    step.properties = Some(JslProperties::from_pairs([("table", "accounts")]));
    step
}

/// A chunk step partitioned into `partitions` partitions with one property set each
pub fn partitioned_step(id: &str, partitions: u32) -> Step {
    let mut step = chunk_step(id);
    let properties = (0..partitions)
        .map(|index| {
            let mut props = JslProperties::from_pairs([("partitionNumber", index.to_string())]);
            props.partition = Some(index.to_string());
            props
        })
        .collect();
    step.partition = Some(Partition {
        mapper: None,
        plan: Some(PartitionPlan {
            partitions: Some(partitions.to_string()),
            threads: Some(partitions.to_string()),
            properties,
        }),
        collector: None,
        analyzer: None,
        reducer: None,
    });
    step
}

pub fn split_with_flows(split_id: &str, flow_ids: &[&str]) -> Split {
    Split {
        id: split_id.to_string(),
        next: None,
        flows: flow_ids
            .iter()
            .map(|flow_id| {
                Flow::new(*flow_id)
                    .with_element(ExecutionElement::Step(chunk_step(&format!("{flow_id}-step"))))
            })
            .collect(),
    }
}

pub fn simple_job(job_name: &str) -> JobDefinition {
    JobDefinition::new(job_name).with_element(ExecutionElement::Step(chunk_step("load")))
}
