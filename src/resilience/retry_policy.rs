//! # Retry Policy
//!
//! Decides whether a failed read, process or write may be retried, counts absorbed
//! retries against the configured limit and notifies retry listeners.
//!
//! A policy instance belongs to one step execution and is driven by a single chunk
//! loop, so it takes `&mut self` and holds no locks.

use super::error::{ChunkError, ChunkPhase, PolicyError, PolicyResult};
use super::exception_classifier::{ExceptionClassifier, TypeHierarchy};
use super::listeners::{RetryProcessListener, RetryReadListener, RetryWriteListener};
use super::policy_config::ExceptionPolicyConfig;
use crate::error::KernelResult;
use crate::logging::log_policy_decision;
use crate::models::Chunk;
use std::fmt;
use std::sync::Arc;

pub struct RetryPolicy<I> {
    retryable: ExceptionClassifier,
    no_rollback: ExceptionClassifier,
    limit: Option<u64>,
    retry_count: u64,
    last_error: Option<ChunkError>,
    retry_phase: Option<ChunkPhase>,
    read_listeners: Vec<Arc<dyn RetryReadListener>>,
    process_listeners: Vec<Arc<dyn RetryProcessListener<I>>>,
    write_listeners: Vec<Arc<dyn RetryWriteListener<I>>>,
}

impl<I> RetryPolicy<I> {
    pub fn new(
        hierarchy: Arc<TypeHierarchy>,
        retry: ExceptionPolicyConfig,
        no_rollback: ExceptionPolicyConfig,
    ) -> Self {
        let limit = retry.limit();
        Self {
            retryable: ExceptionClassifier::new(
                hierarchy.clone(),
                retry.include().to_vec(),
                retry.exclude().to_vec(),
            ),
            no_rollback: ExceptionClassifier::new(
                hierarchy,
                no_rollback.include().to_vec(),
                no_rollback.exclude().to_vec(),
            ),
            limit,
            retry_count: 0,
            last_error: None,
            retry_phase: None,
            read_listeners: Vec::new(),
            process_listeners: Vec::new(),
            write_listeners: Vec::new(),
        }
    }

    /// Build from a chunk's retryable/no-rollback classes and `retry-limit`
    pub fn from_chunk(hierarchy: Arc<TypeHierarchy>, chunk: &Chunk) -> KernelResult<Self> {
        Ok(Self::new(
            hierarchy,
            ExceptionPolicyConfig::retry_from_chunk(chunk)?,
            ExceptionPolicyConfig::no_rollback_from_chunk(chunk),
        ))
    }

    pub fn add_read_listener(&mut self, listener: Arc<dyn RetryReadListener>) {
        self.read_listeners.push(listener);
    }

    pub fn add_process_listener(&mut self, listener: Arc<dyn RetryProcessListener<I>>) {
        self.process_listeners.push(listener);
    }

    pub fn add_write_listener(&mut self, listener: Arc<dyn RetryWriteListener<I>>) {
        self.write_listeners.push(listener);
    }

    /// Whether the transaction must be rolled back before retrying after `error`
    pub fn is_rollback(&self, error: &ChunkError) -> bool {
        !self.no_rollback.matches(error.type_name())
    }

    pub fn is_retryable(&self, error: &ChunkError) -> bool {
        self.retryable.matches(error.type_name())
    }

    pub fn retry_count(&self) -> u64 {
        self.retry_count
    }

    pub fn retry_limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn is_retry_limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.retry_count >= limit)
    }

    pub fn last_error(&self) -> Option<&ChunkError> {
        self.last_error.as_ref()
    }

    pub fn retry_phase(&self) -> Option<ChunkPhase> {
        self.retry_phase
    }

    /// Clear the retry count, last error and phase
    pub fn reset(&mut self) {
        self.retry_count = 0;
        self.last_error = None;
        self.retry_phase = None;
    }

    pub fn handle_read_failure(&mut self, error: ChunkError) -> PolicyResult<()> {
        let error = self.absorb(ChunkPhase::Read, error)?;
        for listener in &self.read_listeners {
            listener.on_retry_read_error(&error)?;
        }
        Ok(())
    }

    pub fn handle_process_failure(&mut self, error: ChunkError, item: &I) -> PolicyResult<()> {
        let error = self.absorb(ChunkPhase::Process, error)?;
        for listener in &self.process_listeners {
            listener.on_retry_process_error(item, &error)?;
        }
        Ok(())
    }

    pub fn handle_write_failure(&mut self, error: ChunkError, items: &[I]) -> PolicyResult<()> {
        let error = self.absorb(ChunkPhase::Write, error)?;
        for listener in &self.write_listeners {
            listener.on_retry_write_error(items, &error)?;
        }
        Ok(())
    }

    /// Count the failure when it may be retried, otherwise give up with it
    fn absorb(&mut self, phase: ChunkPhase, error: ChunkError) -> PolicyResult<ChunkError> {
        let absorbed = !self.is_retry_limit_reached() && self.is_retryable(&error);
        if absorbed {
            self.retry_count += 1;
            self.last_error = Some(error.clone());
            self.retry_phase = Some(phase);
        }

        log_policy_decision(
            "retry",
            &phase.to_string(),
            error.type_name(),
            absorbed,
            self.retry_count,
            self.limit,
        );

        if absorbed {
            Ok(error)
        } else {
            Err(PolicyError::NonRetryable {
                phase,
                source: error,
            })
        }
    }
}

impl<I> fmt::Debug for RetryPolicy<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("retryable", &self.retryable)
            .field("no_rollback", &self.no_rollback)
            .field("limit", &self.limit)
            .field("retry_count", &self.retry_count)
            .field("last_error", &self.last_error)
            .field("retry_phase", &self.retry_phase)
            .field("read_listeners", &self.read_listeners.len())
            .field("process_listeners", &self.process_listeners.len())
            .field("write_listeners", &self.write_listeners.len())
            .finish()
    }
}
