//! Isolates synthesized validator modules and enforces their resource
//! envelopes.
//!
//! Invocation is synchronous from the Session Runtime's perspective
//! (request/response): `invoke` either returns a verdict within the
//! declared deadline or the sandbox aborts it. Each invocation runs
//! against a fresh logical context — the in-memory reference sandbox
//! here constructs no state that survives between calls beyond the
//! validator's own (stateless) `invoke` closure, so there's no channel
//! for a validator to leak information across rooms or across calls.

#![allow(async_fn_in_trait)]

mod error;

pub use error::SandboxError;

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use forge_validator::{Validator, ValidatorInput, ValidatorOutput};

/// Addresses a deployed validator by content hash of its artifact plus
/// the room it was deployed for. Two rooms running the "same" validator
/// template still get distinct addresses, because the contract forbids
/// ever mutating a room's bound validator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactAddress {
    pub content_hash: String,
    pub room_id: String,
}

impl ArtifactAddress {
    pub fn new(content_hash: impl Into<String>, room_id: impl Into<String>) -> Self {
        Self {
            content_hash: content_hash.into(),
            room_id: room_id.into(),
        }
    }
}

/// An opaque handle to a deployed validator, resolved back to the real
/// implementation only inside the sandbox.
#[derive(Debug, Clone)]
pub struct SandboxHandle {
    address: ArtifactAddress,
}

impl SandboxHandle {
    pub fn address(&self) -> &ArtifactAddress {
        &self.address
    }
}

/// Isolates and invokes validator modules, enforcing the declared
/// wall-clock deadline per call.
pub trait Sandbox: Send + Sync {
    /// Deploys a validator under the given address. Idempotent: a
    /// repeat deploy at an address already bound to an
    /// `Arc`-equal validator returns the same handle; binding a
    /// *different* validator to an already-used address is a conflict
    /// (the contract requires redeploys to use a new address).
    fn deploy(
        &self,
        address: ArtifactAddress,
        validator: Arc<dyn Validator>,
    ) -> Result<SandboxHandle, SandboxError>;

    /// Invokes the deployed validator at `handle` with a wall-clock
    /// deadline. Resolution failure or a validator panic both surface
    /// as [`SandboxError::Unavailable`], matching `VALIDATOR_UNAVAILABLE`
    /// in the error taxonomy; exceeding `deadline` surfaces as
    /// [`SandboxError::Timeout`] (`VALIDATOR_TIMEOUT`).
    async fn invoke(
        &self,
        handle: &SandboxHandle,
        input: ValidatorInput,
        deadline: Duration,
    ) -> Result<ValidatorOutput, SandboxError>;
}

struct Deployment {
    validator: Arc<dyn Validator>,
}

/// Default ceiling on a validator's serialized `updated_state`, in bytes.
/// Chosen generously for a turn-based board/counter state; a hardened
/// deployment would make this configurable per validator template.
pub const DEFAULT_MEMORY_CEILING_BYTES: usize = 1 << 20;

/// Reference sandbox: validators live in-process, isolation is limited
/// to panic containment, deadline enforcement, and a ceiling on the
/// state a validator is allowed to produce, rather than a hard OS-level
/// memory/CPU jail. A hardened deployment plugs a stronger [`Sandbox`]
/// implementation in behind this same trait.
pub struct InMemorySandbox {
    deployments: Mutex<HashMap<ArtifactAddress, Deployment>>,
    memory_ceiling_bytes: usize,
}

impl Default for InMemorySandbox {
    fn default() -> Self {
        Self {
            deployments: Mutex::new(HashMap::new()),
            memory_ceiling_bytes: DEFAULT_MEMORY_CEILING_BYTES,
        }
    }
}

impl InMemorySandbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a sandbox that rejects any `updated_state` whose serialized
    /// form exceeds `memory_ceiling_bytes`.
    pub fn with_memory_ceiling(memory_ceiling_bytes: usize) -> Self {
        Self {
            deployments: Mutex::new(HashMap::new()),
            memory_ceiling_bytes,
        }
    }
}

impl Sandbox for InMemorySandbox {
    fn deploy(
        &self,
        address: ArtifactAddress,
        validator: Arc<dyn Validator>,
    ) -> Result<SandboxHandle, SandboxError> {
        let mut deployments = self.deployments.lock().expect("sandbox lock poisoned");
        match deployments.get(&address) {
            Some(existing) if Arc::ptr_eq(&existing.validator, &validator) => {}
            Some(_) => return Err(SandboxError::AddressConflict),
            None => {
                tracing::debug!(
                    content_hash = %address.content_hash,
                    room_id = %address.room_id,
                    "deploying validator"
                );
                deployments.insert(address.clone(), Deployment { validator });
            }
        }
        Ok(SandboxHandle { address })
    }

    async fn invoke(
        &self,
        handle: &SandboxHandle,
        input: ValidatorInput,
        deadline: Duration,
    ) -> Result<ValidatorOutput, SandboxError> {
        let validator = {
            let deployments = self.deployments.lock().expect("sandbox lock poisoned");
            deployments
                .get(&handle.address)
                .map(|d| d.validator.clone())
                .ok_or_else(|| SandboxError::Unavailable("no validator at address".into()))?
        };

        let task = tokio::task::spawn_blocking(move || {
            std::panic::catch_unwind(AssertUnwindSafe(|| validator.invoke(input)))
        });

        match tokio::time::timeout(deadline, task).await {
            Ok(Ok(Ok(output))) => {
                let encoded_len = serde_json::to_vec(&output.updated_state)
                    .map(|bytes| bytes.len())
                    .unwrap_or(0);
                if encoded_len > self.memory_ceiling_bytes {
                    tracing::warn!(
                        room_id = %handle.address.room_id,
                        encoded_len,
                        ceiling = self.memory_ceiling_bytes,
                        "validator output exceeded memory ceiling"
                    );
                    return Err(SandboxError::LimitExceeded);
                }
                Ok(output)
            }
            Ok(Ok(Err(_panic))) => Err(SandboxError::Unavailable("validator panicked".into())),
            Ok(Err(_join_error)) => Err(SandboxError::Unavailable("validator task was cancelled".into())),
            Err(_elapsed) => Err(SandboxError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_protocol::{ActionKind, PlayerId, RoomId};

    struct AlwaysAccepts;
    impl Validator for AlwaysAccepts {
        fn invoke(&self, input: ValidatorInput) -> ValidatorOutput {
            ValidatorOutput::accept(
                input.state,
                forge_validator::ValidatorBroadcast {
                    kind: None,
                    change: "ok".into(),
                    delta: None,
                },
                input.timestamp,
            )
        }

        fn initial_state(&self) -> serde_json::Value {
            serde_json::json!({})
        }
    }

    struct NeverReturns;
    impl Validator for NeverReturns {
        fn invoke(&self, _input: ValidatorInput) -> ValidatorOutput {
            std::thread::sleep(Duration::from_secs(10));
            unreachable!()
        }

        fn initial_state(&self) -> serde_json::Value {
            serde_json::json!({})
        }
    }

    fn sample_input() -> ValidatorInput {
        ValidatorInput {
            action: ActionKind::Join,
            state: serde_json::json!({}),
            player_id: PlayerId::new("p1"),
            data: serde_json::Value::Null,
            room_id: RoomId::new("r1"),
            timestamp: 1,
        }
    }

    #[tokio::test]
    async fn deploy_then_invoke_succeeds() {
        let sandbox = InMemorySandbox::new();
        let address = ArtifactAddress::new("hash1", "r1");
        let handle = sandbox
            .deploy(address, Arc::new(AlwaysAccepts))
            .expect("deploy should succeed");

        let out = sandbox
            .invoke(&handle, sample_input(), Duration::from_secs(1))
            .await
            .expect("invoke should succeed");
        assert!(out.valid);
    }

    #[tokio::test]
    async fn invoke_unknown_handle_is_unavailable() {
        let sandbox = InMemorySandbox::new();
        let handle = SandboxHandle {
            address: ArtifactAddress::new("missing", "r1"),
        };
        let err = sandbox
            .invoke(&handle, sample_input(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::Unavailable(_)));
    }

    #[tokio::test]
    async fn redeploy_with_different_validator_conflicts() {
        let sandbox = InMemorySandbox::new();
        let address = ArtifactAddress::new("hash1", "r1");
        sandbox.deploy(address.clone(), Arc::new(AlwaysAccepts)).unwrap();
        let err = sandbox.deploy(address, Arc::new(AlwaysAccepts)).unwrap_err();
        assert!(matches!(err, SandboxError::AddressConflict));
    }

    #[tokio::test]
    async fn invoke_past_deadline_times_out() {
        let sandbox = InMemorySandbox::new();
        let address = ArtifactAddress::new("hash-slow", "r1");
        let handle = sandbox.deploy(address, Arc::new(NeverReturns)).unwrap();
        let err = sandbox
            .invoke(&handle, sample_input(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::Timeout));
    }

    struct BloatsState;
    impl Validator for BloatsState {
        fn invoke(&self, input: ValidatorInput) -> ValidatorOutput {
            let bloated = serde_json::json!({ "padding": "x".repeat(64) });
            ValidatorOutput::accept(
                bloated,
                forge_validator::ValidatorBroadcast {
                    kind: None,
                    change: "ok".into(),
                    delta: None,
                },
                input.timestamp,
            )
        }

        fn initial_state(&self) -> serde_json::Value {
            serde_json::json!({})
        }
    }

    #[tokio::test]
    async fn invoke_over_memory_ceiling_is_rejected() {
        let sandbox = InMemorySandbox::with_memory_ceiling(16);
        let address = ArtifactAddress::new("hash-bloat", "r1");
        let handle = sandbox.deploy(address, Arc::new(BloatsState)).unwrap();
        let err = sandbox
            .invoke(&handle, sample_input(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::LimitExceeded));
    }
}
