//! Content-addressed storage for published documents and validator
//! artifacts. The address is a hash of the bytes, so two identical
//! artifacts (even published for different rooms) collapse to the same
//! reference and redeploys of changed content always get a fresh one.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::RwLock;

use crate::error::StoreError;

/// Unlike [`crate::StoreAdapter`] and `forge-sandbox`'s `Sandbox`, which
/// are only ever used behind a generic bound, callers hold this one as
/// `Arc<dyn ArtifactStore>` so a server can be built against whichever
/// artifact backend it's given without threading a type parameter
/// through every crate between here and `forge`. That requires boxing
/// the returned futures, hence `#[async_trait]` instead of a native
/// `async fn` in trait.
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Publishes `bytes`, returning its content address.
    async fn put(&self, bytes: Vec<u8>) -> Result<String, StoreError>;

    async fn get(&self, address: &str) -> Result<Option<Vec<u8>>, StoreError>;
}

/// Computes a content address. A cryptographic hash would be the
/// production choice; the reference store only needs determinism and
/// collision-avoidance-in-practice, so it uses the standard library's
/// hasher rather than pulling in a dedicated digest crate.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bytes.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[derive(Default)]
pub struct InMemoryArtifactStore {
    artifacts: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<String, StoreError> {
        let address = content_hash(&bytes);
        self.artifacts
            .write()
            .expect("artifact store lock poisoned")
            .insert(address.clone(), bytes);
        Ok(address)
    }

    async fn get(&self, address: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .artifacts
            .read()
            .expect("artifact store lock poisoned")
            .get(address)
            .cloned())
    }
}
