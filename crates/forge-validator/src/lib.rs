//! The validator module contract, plus the generic standard-kind
//! handlers that stand in for a synthesized validator.
//!
//! ```text
//! Session Runtime → Validator::invoke({action, state, playerId, data, roomId})
//!                 ← {valid, reason?, updatedState?, broadcast?, metadata?, timestamp}
//! ```
//!
//! A validator is intentionally a narrow, synchronous, object-safe
//! trait: rooms resolve their validator dynamically (by content hash,
//! see `forge-sandbox`), so this can't be a compile-time generic the
//! way a single-game framework would do it.

mod contract;
mod generic;

pub use contract::{Validator, ValidatorBroadcast, ValidatorInput, ValidatorOutput};
pub use generic::{GenericValidator, GenericValidatorConfig};
