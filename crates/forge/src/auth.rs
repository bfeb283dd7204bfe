//! Authentication hook for asserting a connecting client's player
//! identity.
//!
//! This system doesn't implement identity or auth — that's the
//! deployer's job (a JWT, an API key, a session cookie, whatever sits
//! in front of this server). What it defines is a single trait: given
//! whatever token the client's handshake carries, return the
//! [`PlayerId`] the rest of the system should trust, or reject the
//! connection outright.

use forge_protocol::PlayerId;

/// Validates a client's handshake token and returns their identity.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` — shared across every connection task the
/// accept loop spawns.
pub trait Authenticator: Send + Sync + 'static {
    /// Validates `token` and returns the player identity the rest of
    /// the system should trust for this connection.
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<PlayerId, AuthError>> + Send;
}

/// Why a handshake's token was rejected.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authentication failed: {0}")]
    Rejected(String),
}

/// Accepts any non-empty token and uses it verbatim as the player
/// identifier. Only for local development and tests — never deploy
/// this.
pub struct AllowAllAuthenticator;

impl Authenticator for AllowAllAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<PlayerId, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Rejected("empty token".into()));
        }
        Ok(PlayerId::new(token))
    }
}
