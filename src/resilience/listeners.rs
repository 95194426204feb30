//! # Retry and Skip Listeners
//!
//! Callbacks notified when a policy absorbs a failure. Listener bodies are user
//! code, so they report failures through `anyhow`; the policy surfaces them as
//! [`PolicyError::Listener`](crate::resilience::PolicyError::Listener).
//!
//! Every trait has a blanket implementation for matching closures:
//!
//! ```rust
//! use batch_kernel::resilience::{ChunkError, RetryReadListener};
//!
//! let listener = |error: &ChunkError| -> anyhow::Result<()> {
//!     println!("retrying read after {error}");
//!     Ok(())
//! };
//! listener.on_retry_read_error(&ChunkError::new("IoError", "eof")).unwrap();
//! ```

use super::error::ChunkError;

pub trait RetryReadListener: Send + Sync {
    fn on_retry_read_error(&self, error: &ChunkError) -> anyhow::Result<()>;
}

pub trait RetryProcessListener<I>: Send + Sync {
    fn on_retry_process_error(&self, item: &I, error: &ChunkError) -> anyhow::Result<()>;
}

pub trait RetryWriteListener<I>: Send + Sync {
    fn on_retry_write_error(&self, items: &[I], error: &ChunkError) -> anyhow::Result<()>;
}

pub trait SkipReadListener: Send + Sync {
    fn on_skip_read_item(&self, error: &ChunkError) -> anyhow::Result<()>;
}

pub trait SkipProcessListener<I>: Send + Sync {
    fn on_skip_process_item(&self, item: &I, error: &ChunkError) -> anyhow::Result<()>;
}

pub trait SkipWriteListener<I>: Send + Sync {
    fn on_skip_write_items(&self, items: &[I], error: &ChunkError) -> anyhow::Result<()>;
}

impl<F> RetryReadListener for F
where
    F: Fn(&ChunkError) -> anyhow::Result<()> + Send + Sync,
{
    fn on_retry_read_error(&self, error: &ChunkError) -> anyhow::Result<()> {
        self(error)
    }
}

impl<I, F> RetryProcessListener<I> for F
where
    F: Fn(&I, &ChunkError) -> anyhow::Result<()> + Send + Sync,
{
    fn on_retry_process_error(&self, item: &I, error: &ChunkError) -> anyhow::Result<()> {
        self(item, error)
    }
}

impl<I, F> RetryWriteListener<I> for F
where
    F: Fn(&[I], &ChunkError) -> anyhow::Result<()> + Send + Sync,
{
    fn on_retry_write_error(&self, items: &[I], error: &ChunkError) -> anyhow::Result<()> {
        self(items, error)
    }
}

impl<F> SkipReadListener for F
where
    F: Fn(&ChunkError) -> anyhow::Result<()> + Send + Sync,
{
    fn on_skip_read_item(&self, error: &ChunkError) -> anyhow::Result<()> {
        self(error)
    }
}

impl<I, F> SkipProcessListener<I> for F
where
    F: Fn(&I, &ChunkError) -> anyhow::Result<()> + Send + Sync,
{
    fn on_skip_process_item(&self, item: &I, error: &ChunkError) -> anyhow::Result<()> {
        self(item, error)
    }
}

impl<I, F> SkipWriteListener<I> for F
where
    F: Fn(&[I], &ChunkError) -> anyhow::Result<()> + Send + Sync,
{
    fn on_skip_write_items(&self, items: &[I], error: &ChunkError) -> anyhow::Result<()> {
        self(items, error)
    }
}
