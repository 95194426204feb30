//! Parsed include/exclude/limit configuration for one failure policy.

use crate::error::KernelResult;
use crate::models::{parse_limit, Chunk, ExceptionClassFilter};
use serde::{Deserialize, Serialize};

/// Include set, exclude set and optional limit, parsed once from a chunk definition.
///
/// `limit: None` means unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionPolicyConfig {
    include: Vec<String>,
    exclude: Vec<String>,
    limit: Option<u64>,
}

impl ExceptionPolicyConfig {
    pub fn new(include: Vec<String>, exclude: Vec<String>, limit: Option<u64>) -> Self {
        Self {
            include,
            exclude,
            limit,
        }
    }

    /// Config from an optional filter element and a raw limit attribute
    pub fn from_filter(
        filter: Option<&ExceptionClassFilter>,
        limit_attribute: &str,
        raw_limit: Option<&str>,
    ) -> KernelResult<Self> {
        let limit = parse_limit(limit_attribute, raw_limit)?;
        let (include, exclude) = filter
            .map(|f| (f.include.clone(), f.exclude.clone()))
            .unwrap_or_default();
        Ok(Self::new(include, exclude, limit))
    }

    /// `retryable-exception-classes` with `retry-limit`
    pub fn retry_from_chunk(chunk: &Chunk) -> KernelResult<Self> {
        Self::from_filter(
            chunk.retryable_exception_classes.as_ref(),
            "retry-limit",
            chunk.retry_limit(),
        )
    }

    /// `skippable-exception-classes` with `skip-limit`
    pub fn skip_from_chunk(chunk: &Chunk) -> KernelResult<Self> {
        Self::from_filter(
            chunk.skippable_exception_classes.as_ref(),
            "skip-limit",
            chunk.skip_limit(),
        )
    }

    /// `no-rollback-exception-classes`; never limited
    pub fn no_rollback_from_chunk(chunk: &Chunk) -> Self {
        let (include, exclude) = chunk
            .no_rollback_exception_classes
            .as_ref()
            .map(|f| (f.include.clone(), f.exclude.clone()))
            .unwrap_or_default();
        Self::new(include, exclude, None)
    }

    pub fn include(&self) -> &[String] {
        &self.include
    }

    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn is_unlimited(&self) -> bool {
        self.limit.is_none()
    }

    /// Limit reached once `count >= limit`; an unbounded limit is never reached
    pub fn is_limit_reached(&self, count: u64) -> bool {
        self.limit.is_some_and(|limit| count >= limit)
    }
}
