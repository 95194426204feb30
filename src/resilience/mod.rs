//! # Resilience Module
//!
//! Failure classification policies consulted by chunk-oriented step processing.
//!
//! ## Architecture
//!
//! - **Exception Classifier**: include/exclude matching over a named error type hierarchy
//! - **Policy Config**: include set, exclude set and limit parsed from a chunk definition
//! - **Retry Policy**: counts retries, decides rollback, notifies retry listeners
//! - **Skip Policy**: counts skips, notifies skip listeners
//!
//! ## Usage
//!
//! ```rust
//! use batch_kernel::models::{Chunk, ExceptionClassFilter};
//! use batch_kernel::resilience::{ChunkError, RetryPolicy, TypeHierarchy};
//! use std::sync::Arc;
//!
//! let mut chunk = Chunk::default();
//! chunk.retryable_exception_classes = Some(ExceptionClassFilter::including(["IoError"]));
//! chunk.set_retry_limit("2");
//!
//! let mut retry: RetryPolicy<String> =
//!     RetryPolicy::from_chunk(Arc::new(TypeHierarchy::standard()), &chunk).unwrap();
//!
//! assert!(retry.handle_read_failure(ChunkError::new("TimeoutError", "slow read")).is_ok());
//! assert!(retry.handle_read_failure(ChunkError::new("IoError", "reset")).is_ok());
//! assert!(retry.handle_read_failure(ChunkError::new("IoError", "reset")).is_err());
//! ```

pub mod error;
pub mod exception_classifier;
pub mod listeners;
pub mod policy_config;
pub mod retry_policy;
pub mod skip_policy;

pub use error::{ChunkError, ChunkPhase, PolicyError, PolicyResult};
pub use exception_classifier::{matches, ExceptionClassifier, TypeHierarchy};
pub use listeners::{
    RetryProcessListener, RetryReadListener, RetryWriteListener, SkipProcessListener,
    SkipReadListener, SkipWriteListener,
};
pub use policy_config::ExceptionPolicyConfig;
pub use retry_policy::RetryPolicy;
pub use skip_policy::SkipPolicy;
