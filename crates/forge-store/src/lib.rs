//! Room Registry & Store Adapter: authoritative room persistence,
//! versioning, a process-local freshness-windowed cache, and
//! content-addressed artifact storage shared by the Conversion Pipeline
//! and the Validator Sandbox.

#![allow(async_fn_in_trait)]

mod artifact;
mod cache;
mod error;
mod store;
mod types;

pub use artifact::{content_hash, ArtifactStore, InMemoryArtifactStore};
pub use cache::CachedStore;
pub use error::StoreError;
pub use store::{InMemoryStore, StoreAdapter};
pub use types::{next_version, PersistedRoom, PlayerRecord};
