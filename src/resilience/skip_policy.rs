//! # Skip Policy
//!
//! Decides whether a failed read, process or write may be skipped and notifies skip
//! listeners. Ordering between retry and skip is the chunk loop's concern.

use super::error::{ChunkError, ChunkPhase, PolicyError, PolicyResult};
use super::exception_classifier::{ExceptionClassifier, TypeHierarchy};
use super::listeners::{SkipProcessListener, SkipReadListener, SkipWriteListener};
use super::policy_config::ExceptionPolicyConfig;
use crate::error::KernelResult;
use crate::logging::log_policy_decision;
use crate::models::Chunk;
use std::fmt;
use std::sync::Arc;

pub struct SkipPolicy<I> {
    skippable: ExceptionClassifier,
    limit: Option<u64>,
    skip_count: u64,
    read_listeners: Vec<Arc<dyn SkipReadListener>>,
    process_listeners: Vec<Arc<dyn SkipProcessListener<I>>>,
    write_listeners: Vec<Arc<dyn SkipWriteListener<I>>>,
}

impl<I> SkipPolicy<I> {
    pub fn new(hierarchy: Arc<TypeHierarchy>, config: ExceptionPolicyConfig) -> Self {
        Self {
            skippable: ExceptionClassifier::new(
                hierarchy,
                config.include().to_vec(),
                config.exclude().to_vec(),
            ),
            limit: config.limit(),
            skip_count: 0,
            read_listeners: Vec::new(),
            process_listeners: Vec::new(),
            write_listeners: Vec::new(),
        }
    }

    /// Build from a chunk's skippable classes and `skip-limit`
    pub fn from_chunk(hierarchy: Arc<TypeHierarchy>, chunk: &Chunk) -> KernelResult<Self> {
        Ok(Self::new(
            hierarchy,
            ExceptionPolicyConfig::skip_from_chunk(chunk)?,
        ))
    }

    pub fn add_read_listener(&mut self, listener: Arc<dyn SkipReadListener>) {
        self.read_listeners.push(listener);
    }

    pub fn add_process_listener(&mut self, listener: Arc<dyn SkipProcessListener<I>>) {
        self.process_listeners.push(listener);
    }

    pub fn add_write_listener(&mut self, listener: Arc<dyn SkipWriteListener<I>>) {
        self.write_listeners.push(listener);
    }

    pub fn is_skippable(&self, error: &ChunkError) -> bool {
        self.skippable.matches(error.type_name())
    }

    pub fn skip_count(&self) -> u64 {
        self.skip_count
    }

    pub fn skip_limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn is_skip_limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.skip_count >= limit)
    }

    pub fn handle_read_failure(&mut self, error: ChunkError) -> PolicyResult<()> {
        let error = self.absorb(ChunkPhase::Read, error)?;
        for listener in &self.read_listeners {
            listener.on_skip_read_item(&error)?;
        }
        Ok(())
    }

    pub fn handle_process_with_item_failure(
        &mut self,
        error: ChunkError,
        item: &I,
    ) -> PolicyResult<()> {
        let error = self.absorb(ChunkPhase::Process, error)?;
        for listener in &self.process_listeners {
            listener.on_skip_process_item(item, &error)?;
        }
        Ok(())
    }

    pub fn handle_write_with_items_failure(
        &mut self,
        error: ChunkError,
        items: &[I],
    ) -> PolicyResult<()> {
        let error = self.absorb(ChunkPhase::Write, error)?;
        for listener in &self.write_listeners {
            listener.on_skip_write_items(items, &error)?;
        }
        Ok(())
    }

    fn absorb(&mut self, phase: ChunkPhase, error: ChunkError) -> PolicyResult<ChunkError> {
        let absorbed = !self.is_skip_limit_reached() && self.is_skippable(&error);
        if absorbed {
            self.skip_count += 1;
        }

        log_policy_decision(
            "skip",
            &phase.to_string(),
            error.type_name(),
            absorbed,
            self.skip_count,
            self.limit,
        );

        if absorbed {
            Ok(error)
        } else {
            Err(PolicyError::NonSkippable {
                phase,
                source: error,
            })
        }
    }
}

impl<I> fmt::Debug for SkipPolicy<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkipPolicy")
            .field("skippable", &self.skippable)
            .field("limit", &self.limit)
            .field("skip_count", &self.skip_count)
            .field("read_listeners", &self.read_listeners.len())
            .field("process_listeners", &self.process_listeners.len())
            .field("write_listeners", &self.write_listeners.len())
            .finish()
    }
}
