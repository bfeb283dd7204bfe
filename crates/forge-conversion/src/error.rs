//! Conversion pipeline errors. Every variant maps to a structured
//! reason string recorded on the room's `conversion_error` field — the
//! original document is never discarded on failure, so the room always
//! remains retryable.

use forge_protocol::RoomId;

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("room {0} already has a conversion in flight")]
    AlreadyInFlight(RoomId),

    #[error("analysis produced no usable characteristics")]
    AnalysisFailed,

    #[error("collaborator call failed: {0}")]
    Collaborator(#[from] forge_llm::LlmError),

    #[error("converted document was missing required structure: {0}")]
    MalformedDocument(String),

    #[error("artifact publication failed: {0}")]
    Publication(#[from] forge_store::StoreError),

    #[error("validator deployment failed: {0}")]
    Deployment(#[from] forge_room::RoomError),
}

impl ConversionError {
    /// The structured reason recorded on the room record. Deliberately
    /// coarser than `Display` — callers outside this crate shouldn't
    /// match on prose.
    pub fn reason_code(&self) -> &'static str {
        match self {
            ConversionError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            ConversionError::AlreadyInFlight(_) => "ALREADY_IN_FLIGHT",
            ConversionError::AnalysisFailed => "ANALYSIS_FAILED",
            ConversionError::Collaborator(_) => "COLLABORATOR_FAILED",
            ConversionError::MalformedDocument(_) => "MALFORMED_DOCUMENT",
            ConversionError::Publication(_) => "PUBLICATION_FAILED",
            ConversionError::Deployment(_) => "DEPLOYMENT_FAILED",
        }
    }
}
