//! # Forge
//!
//! The meta-crate that ties transport, protocol, conversion, and the
//! room runtime into a single running server.
//!
//! Forge does not implement any particular game's rules. A room's
//! behavior comes from whatever validator the Conversion Pipeline
//! synthesizes for it (see [`forge_conversion`]), or one a caller
//! deploys directly into the [`forge_sandbox`] sandbox. This crate's
//! job is wiring: accept connections, authenticate them, decode
//! requests, and route them to [`forge_room::RoomManager`] or
//! [`forge_conversion::ConversionPipeline`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! // let server = ForgeServerBuilder::new()
//! //     .bind("0.0.0.0:8080")
//! //     .build(store, sandbox, artifacts, collaborator, auth)
//! //     .await?;
//! // server.run().await
//! ```

mod auth;
mod config;
mod error;
mod handler;
mod response;
mod server;

pub use auth::{AllowAllAuthenticator, AuthError, Authenticator};
pub use config::ForgeConfig;
pub use error::ForgeError;
pub use response::{ConversionStatusView, ServerResponse};
pub use server::{ForgeServer, ForgeServerBuilder};

/// Re-exports for the common set of types a deployer needs to stand up
/// a server and a room-handling binary around it.
pub mod prelude {
    pub use crate::{AllowAllAuthenticator, Authenticator, ForgeConfig, ForgeError, ForgeServerBuilder};
    pub use forge_protocol::{Action, ActionKind, PlayerId, RoomId};
    pub use forge_room::RuntimeConfig;
    pub use forge_validator::{GenericValidator, Validator, ValidatorInput, ValidatorOutput};
}
