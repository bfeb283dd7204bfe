//! Error types for the Session Runtime.

use forge_protocol::{ErrorKind, RoomId};

/// Errors that can occur submitting an action or observing a room.
///
/// This wraps the shared [`ErrorKind`] taxonomy with the room context
/// needed to log and route the failure; the taxonomy tag itself is
/// what travels back to the client in a failure envelope.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    NotFound(RoomId),

    #[error("room {0} is not ready (conversion status is not complete)")]
    NotReady(RoomId),

    #[error("room {0} has ended")]
    Terminated(RoomId),

    /// A benign, validator-reported rejection. Carries no room mutation.
    #[error("{kind}: {message}")]
    Rejected { kind: ErrorKind, message: String },

    /// An infrastructure failure: store, sandbox, or deadline related.
    #[error("{kind}: {message}")]
    Infra { kind: ErrorKind, message: String },

    #[error("room {0} actor is unavailable")]
    Unavailable(RoomId),
}

impl RoomError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RoomError::NotFound(_) => ErrorKind::RoomNotFound,
            RoomError::NotReady(_) => ErrorKind::RoomNotReady,
            RoomError::Terminated(_) => ErrorKind::RoomTerminated,
            RoomError::Rejected { kind, .. } => *kind,
            RoomError::Infra { kind, .. } => *kind,
            RoomError::Unavailable(_) => ErrorKind::StoreFailure,
        }
    }

    pub fn retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    pub fn rejected(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Rejected {
            kind,
            message: message.into(),
        }
    }

    pub fn infra(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Infra {
            kind,
            message: message.into(),
        }
    }
}

impl From<forge_store::StoreError> for RoomError {
    fn from(err: forge_store::StoreError) -> Self {
        RoomError::infra(ErrorKind::StoreFailure, err.to_string())
    }
}

impl From<forge_sandbox::SandboxError> for RoomError {
    fn from(err: forge_sandbox::SandboxError) -> Self {
        use forge_sandbox::SandboxError::*;
        let kind = match err {
            Timeout => ErrorKind::ValidatorTimeout,
            LimitExceeded => ErrorKind::ValidatorLimit,
            Unavailable(_) | AddressConflict => ErrorKind::ValidatorUnavailable,
        };
        RoomError::infra(kind, err.to_string())
    }
}
