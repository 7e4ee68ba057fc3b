use std::time::Duration;

use sockrpc_envelope::{ErrorReason, Status};

/// Errors surfaced to callers of the calling facade.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// The call failed; reason and message come from the call's status.
    #[error("rpc failed ({reason}): {message}")]
    Failed { reason: ErrorReason, message: String },

    /// The server ran the handler but it produced neither a response nor an error.
    #[error("server completed the call without producing a response")]
    NoResponse,

    /// A blocking call did not complete within its timeout.
    ///
    /// The worker is not cancelled and may still finish afterwards.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// The worker thread ended without reporting an outcome.
    #[error("call worker terminated before reporting an outcome")]
    Aborted,

    /// The worker thread could not be started.
    #[error("failed to spawn call worker: {0}")]
    Spawn(#[source] std::io::Error),
}

impl CallError {
    /// Build a [`CallError::Failed`] from a failed status.
    pub fn from_status(status: &Status) -> Self {
        Self::Failed {
            reason: status.reason().unwrap_or(ErrorReason::RpcFailed),
            message: status.message().unwrap_or_default().to_string(),
        }
    }

    /// Protocol reason, when the error came from the pipeline.
    pub fn reason(&self) -> Option<ErrorReason> {
        match self {
            Self::Failed { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CallError>;
