/// Errors raised by the store adapter and artifact store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("room not found")]
    NotFound,

    /// A `put`/`update` lost a compare-and-swap race against a
    /// concurrently committed version.
    #[error("version conflict: expected {expected}, found {found}")]
    VersionConflict { expected: u64, found: u64 },

    #[error("store backend failure: {0}")]
    Backend(String),
}
