/// Errors raised invoking or deploying into the validator sandbox.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// The validator did not return within its declared deadline.
    #[error("validator exceeded its deadline")]
    Timeout,

    /// The validator exceeded its declared memory ceiling.
    #[error("validator exceeded its memory limit")]
    LimitExceeded,

    /// No validator is deployed at the given address, or the validator
    /// panicked during invocation.
    #[error("validator unavailable: {0}")]
    Unavailable(String),

    /// A redeploy was attempted with an address already bound to a
    /// different validator. Addresses are never mutated in place.
    #[error("address already deployed to a different validator")]
    AddressConflict,
}
