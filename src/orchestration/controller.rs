//! # Cooperative Stop Controllers
//!
//! A controller is the capability a work unit exposes for requesting a stop. Stops are
//! cooperative: the controller flips the execution to STOPPING and cancels a token that
//! the running code is expected to observe between units of work. Nothing here can
//! terminate a running task, so a stop request is best-effort.

use crate::error::KernelResult;
use crate::models::RuntimeJobExecution;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Capability to request a cooperative stop of a running work unit
pub trait ExecutionController: Send + Sync + fmt::Debug {
    /// Request a stop. Requesting a stop of an already finished unit is a no-op.
    fn request_stop(&self) -> KernelResult<()>;

    /// Whether a stop has been requested (directly or through a parent)
    fn is_stop_requested(&self) -> bool;
}

/// Default controller backed by a cancellation token.
///
/// Controllers created with [`CancellationController::linked`] are cancelled when their
/// parent is, which is how a stop of a top-level job reaches its partitions and
/// split-flows.
#[derive(Debug, Clone)]
pub struct CancellationController {
    execution: Arc<RuntimeJobExecution>,
    token: CancellationToken,
}

impl CancellationController {
    pub fn new(execution: Arc<RuntimeJobExecution>) -> Self {
        Self {
            execution,
            token: CancellationToken::new(),
        }
    }

    /// Controller whose token is a child of an existing unit's token
    pub fn linked(execution: Arc<RuntimeJobExecution>, parent: &CancellationToken) -> Self {
        Self {
            execution,
            token: parent.child_token(),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl ExecutionController for CancellationController {
    fn request_stop(&self) -> KernelResult<()> {
        if !self.execution.mark_stopping() {
            debug!(
                execution_id = self.execution.execution_id(),
                job_name = %self.execution.job_name(),
                status = %self.execution.status(),
                "Stop requested for finished execution - ignoring"
            );
            return Ok(());
        }

        self.token.cancel();
        info!(
            execution_id = self.execution.execution_id(),
            job_name = %self.execution.job_name(),
            "🛑 CONTROLLER: Stop requested"
        );
        Ok(())
    }

    fn is_stop_requested(&self) -> bool {
        self.token.is_cancelled()
    }
}
