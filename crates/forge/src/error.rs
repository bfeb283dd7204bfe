//! Unified error type for the `forge` meta-crate.

use forge_conversion::ConversionError;
use forge_protocol::ProtocolError;
use forge_room::RoomError;
use forge_transport::TransportError;

use crate::auth::AuthError;

/// Top-level error that wraps every crate-specific error a connection
/// handler or server loop can surface.
///
/// When using the `forge` meta-crate, callers deal with this single
/// error type instead of importing errors from each sub-crate. The
/// `#[from]` attribute on each variant auto-generates `From` impls, so
/// the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_converts_via_from() {
        let err = TransportError::ConnectionClosed("gone".into());
        let forge_err: ForgeError = err.into();
        assert!(matches!(forge_err, ForgeError::Transport(_)));
        assert!(forge_err.to_string().contains("gone"));
    }

    #[test]
    fn room_error_converts_via_from() {
        let err = RoomError::NotFound(forge_protocol::RoomId::new("r1"));
        let forge_err: ForgeError = err.into();
        assert!(matches!(forge_err, ForgeError::Room(_)));
    }
}
