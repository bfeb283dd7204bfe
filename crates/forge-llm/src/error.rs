//! Errors the LLM collaborator boundary can surface. Deliberately thin:
//! callers on the other side of this trait never learn which vendor,
//! model, or transport produced a response, so they never learn why
//! one failed either — only the outcome shape below.

/// Errors from a [`crate::TextCollaborator`] call.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The call did not complete within its configured time budget.
    #[error("collaborator call timed out")]
    Timeout,

    /// The underlying transport or vendor call failed outright.
    #[error("collaborator request failed: {0}")]
    RequestFailed(String),

    /// The collaborator responded, but not with a usable text body.
    #[error("collaborator returned an unusable response: {0}")]
    InvalidResponse(String),

    /// Every attempt in the configured retry budget failed.
    #[error("collaborator retry budget exhausted after {attempts} attempt(s): {last}")]
    RetriesExhausted { attempts: u32, last: Box<LlmError> },
}

impl LlmError {
    /// Whether retrying this particular failure is worth attempting
    /// again. A malformed response from the vendor is unlikely to
    /// change on retry with the same prompt; timeouts and transport
    /// failures often do.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Timeout | LlmError::RequestFailed(_) => true,
            LlmError::InvalidResponse(_) => false,
            LlmError::RetriesExhausted { .. } => false,
        }
    }
}
