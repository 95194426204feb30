//! Error types for chunk failure handling.

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Phase of chunk processing in which a failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkPhase {
    Read,
    Process,
    Write,
}

impl fmt::Display for ChunkPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Process => write!(f, "process"),
            Self::Write => write!(f, "write"),
        }
    }
}

/// A failure raised by a reader, processor or writer, tagged with its error type name.
///
/// The type name is what the retry and skip classifiers match against.
#[derive(Debug, Clone)]
pub struct ChunkError {
    type_name: String,
    message: String,
    cause: Option<Arc<dyn StdError + Send + Sync>>,
}

impl ChunkError {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            cause: None,
        }
    }

    /// Attach the underlying error that triggered this chunk failure
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

impl StdError for ChunkError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

/// Outcome of a failure the policy could not absorb
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// Retry limit reached or the error is not retryable; the caller gives up
    #[error("Error in {phase} phase is not retryable: {source}")]
    NonRetryable { phase: ChunkPhase, source: ChunkError },

    /// Skip limit reached or the error is not skippable; the caller gives up
    #[error("Error in {phase} phase is not skippable: {source}")]
    NonSkippable { phase: ChunkPhase, source: ChunkError },

    /// A registered listener failed while being notified
    #[error(transparent)]
    Listener(#[from] anyhow::Error),
}

impl PolicyError {
    /// The chunk error that could not be absorbed, if any
    pub fn chunk_error(&self) -> Option<&ChunkError> {
        match self {
            Self::NonRetryable { source, .. } | Self::NonSkippable { source, .. } => Some(source),
            Self::Listener(_) => None,
        }
    }

    pub fn phase(&self) -> Option<ChunkPhase> {
        match self {
            Self::NonRetryable { phase, .. } | Self::NonSkippable { phase, .. } => Some(*phase),
            Self::Listener(_) => None,
        }
    }
}

pub type PolicyResult<T> = Result<T, PolicyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_error_exposes_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "socket timed out");
        let error = ChunkError::new("TimeoutError", "reader stalled").with_cause(io);

        assert_eq!(error.to_string(), "TimeoutError: reader stalled");
        assert_eq!(
            error.source().map(|s| s.to_string()),
            Some("socket timed out".to_string())
        );
    }

    #[test]
    fn test_policy_error_accessors() {
        let error = PolicyError::NonSkippable {
            phase: ChunkPhase::Write,
            source: ChunkError::new("DataError", "bad row"),
        };
        assert_eq!(error.phase(), Some(ChunkPhase::Write));
        assert_eq!(error.chunk_error().map(ChunkError::type_name), Some("DataError"));
        assert!(error.to_string().contains("write phase"));

        let listener: PolicyError = anyhow::anyhow!("listener blew up").into();
        assert!(listener.phase().is_none());
        assert_eq!(listener.to_string(), "listener blew up");
    }
}
