use crate::config::KernelConfig;
use crate::models::{JobInstance, RuntimeJobExecution};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tokio::sync::broadcast;
use tracing::{trace, warn};
use uuid::Uuid;

/// Destination for kernel lifecycle notifications
#[async_trait]
pub trait BatchEventSink: Send + Sync + fmt::Debug {
    async fn publish_execution_event(
        &self,
        topic: &str,
        execution: &RuntimeJobExecution,
    ) -> Result<(), PublishError>;

    async fn publish_instance_event(
        &self,
        topic: &str,
        instance: &JobInstance,
    ) -> Result<(), PublishError>;
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub event_id: Uuid,
    pub topic: String,
    pub payload: Value,
    pub published_at: DateTime<Utc>,
}

/// Execution snapshot carried by execution events
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionEventPayload {
    pub execution_id: i64,
    pub top_level_execution_id: i64,
    pub instance_id: i64,
    pub job_name: String,
    pub batch_status: String,
    pub correlation_id: Option<String>,
    pub create_time: DateTime<Utc>,
}

impl From<&RuntimeJobExecution> for ExecutionEventPayload {
    fn from(execution: &RuntimeJobExecution) -> Self {
        Self {
            execution_id: execution.execution_id(),
            top_level_execution_id: execution.top_level_execution_id(),
            instance_id: execution.instance_id(),
            job_name: execution.job_name().to_string(),
            batch_status: execution.status().to_string(),
            correlation_id: execution.correlation_id().map(str::to_string),
            create_time: execution.created_at(),
        }
    }
}

/// In-process event publisher backed by a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

impl BroadcastEventPublisher {
    /// Create a new event publisher with the specified channel capacity.
    ///
    /// A capacity of zero is raised to one; broadcast channels cannot be empty.
    pub fn new(capacity: usize) -> Self {
        if capacity == 0 {
            warn!("Event channel capacity of 0 requested - using 1");
        }
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publisher sized by `event_channel_capacity`
    pub fn from_config(config: &KernelConfig) -> Self {
        Self::new(config.event_channel_capacity)
    }

    /// Publish a payload under `topic`
    pub async fn publish(&self, topic: impl Into<String>, payload: Value) -> Result<(), PublishError> {
        let event = PublishedEvent {
            event_id: Uuid::new_v4(),
            topic: topic.into(),
            payload,
            published_at: Utc::now(),
        };

        // No subscribers is not an error for lifecycle events
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            trace!(topic = %event.topic, "No subscribers for published event");
        }
        Ok(())
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl BatchEventSink for BroadcastEventPublisher {
    async fn publish_execution_event(
        &self,
        topic: &str,
        execution: &RuntimeJobExecution,
    ) -> Result<(), PublishError> {
        let payload = serde_json::to_value(ExecutionEventPayload::from(execution))?;
        self.publish(topic, payload).await
    }

    async fn publish_instance_event(
        &self,
        topic: &str,
        instance: &JobInstance,
    ) -> Result<(), PublishError> {
        let payload = serde_json::to_value(instance)?;
        self.publish(topic, payload).await
    }
}

/// Error types for event publishing
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
