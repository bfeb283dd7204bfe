//! The error taxonomy shared across the workspace, plus codec-level errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every error kind named in the error taxonomy. This is data, not a
/// Rust `enum` of distinct types — one flat set of tags that every
/// crate's own `thiserror` type maps into, so a client sees one
/// consistent vocabulary regardless of which layer raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    // Input errors
    InvalidActionShape,
    InvalidKind,
    PayloadTooLarge,
    // Room errors
    RoomNotFound,
    RoomNotReady,
    RoomTerminated,
    // Validation errors (validator-reported, benign)
    NotYourTurn,
    GameFull,
    DuplicatePlayer,
    IllegalMove,
    GameNotActive,
    GameAlreadyActive,
    NotEnoughPlayers,
    // Infrastructure errors
    StoreFailure,
    ValidatorUnavailable,
    ValidatorTimeout,
    ValidatorLimit,
    TimeoutRetry,
    // Conversion errors
    AnalysisFailed,
    LlmFailed,
    ArtifactPublishFailed,
    ValidatorDeployFailed,
}

impl ErrorKind {
    /// Whether a client may reasonably retry after this error. Validation
    /// errors are never retryable as-is; infrastructure errors usually
    /// are.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::StoreFailure
                | ErrorKind::ValidatorUnavailable
                | ErrorKind::ValidatorTimeout
                | ErrorKind::ValidatorLimit
                | ErrorKind::TimeoutRetry
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ErrorKind::NotYourTurn
                | ErrorKind::GameFull
                | ErrorKind::DuplicatePlayer
                | ErrorKind::IllegalMove
                | ErrorKind::GameNotActive
                | ErrorKind::GameAlreadyActive
                | ErrorKind::NotEnoughPlayers
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidActionShape => "INVALID_ACTION_SHAPE",
            ErrorKind::InvalidKind => "INVALID_KIND",
            ErrorKind::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ErrorKind::RoomNotFound => "ROOM_NOT_FOUND",
            ErrorKind::RoomNotReady => "ROOM_NOT_READY",
            ErrorKind::RoomTerminated => "ROOM_TERMINATED",
            ErrorKind::NotYourTurn => "NOT_YOUR_TURN",
            ErrorKind::GameFull => "GAME_FULL",
            ErrorKind::DuplicatePlayer => "DUPLICATE_PLAYER",
            ErrorKind::IllegalMove => "ILLEGAL_MOVE",
            ErrorKind::GameNotActive => "GAME_NOT_ACTIVE",
            ErrorKind::GameAlreadyActive => "GAME_ALREADY_ACTIVE",
            ErrorKind::NotEnoughPlayers => "NOT_ENOUGH_PLAYERS",
            ErrorKind::StoreFailure => "STORE_FAILURE",
            ErrorKind::ValidatorUnavailable => "VALIDATOR_UNAVAILABLE",
            ErrorKind::ValidatorTimeout => "VALIDATOR_TIMEOUT",
            ErrorKind::ValidatorLimit => "VALIDATOR_LIMIT",
            ErrorKind::TimeoutRetry => "TIMEOUT_RETRY",
            ErrorKind::AnalysisFailed => "ANALYSIS_FAILED",
            ErrorKind::LlmFailed => "LLM_FAILED",
            ErrorKind::ArtifactPublishFailed => "ARTIFACT_PUBLISH_FAILED",
            ErrorKind::ValidatorDeployFailed => "VALIDATOR_DEPLOY_FAILED",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structured, client-facing error: a taxonomy kind plus a
/// human-readable message.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ActionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ActionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Errors arising at the codec boundary: malformed bytes, or bytes that
/// decode to a shape the protocol doesn't recognize.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
