//! Response shapes for the external mutation surface
//! ([`forge_protocol::ClientRequest`]). These aggregate data owned by
//! several crates (`forge-room`, `forge-store`, `forge-conversion`), so
//! unlike the request side they live here rather than in
//! `forge-protocol`.

use serde::{Deserialize, Serialize};

use forge_conversion::ConversionStatusReport;
use forge_protocol::{ConversionStatus, RoomId, RoomListEntry, SubmitResponse};
use forge_store::PersistedRoom;

/// A conversion's status, projected onto the wire. Built from
/// [`ConversionStatusReport`], which isn't itself `Serialize` (it's an
/// internal pipeline type, not a wire type).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionStatusView {
    pub status: ConversionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ConversionStatusReport> for ConversionStatusView {
    fn from(report: ConversionStatusReport) -> Self {
        Self {
            status: report.status,
            document_ref: report.document_ref,
            validator_ref: report.validator_ref,
            error: report.error,
        }
    }
}

/// One response to a [`forge_protocol::ClientRequest`]. `Subscribe`
/// isn't represented here: it opens a standing stream of
/// [`forge_protocol::SubscriptionEvent`] rather than a single reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum ServerResponse {
    RoomCreated {
        room_id: RoomId,
    },
    ConversionRequested(ConversionStatusView),
    Submitted(SubmitResponse),
    Room(PersistedRoom),
    RoomList {
        rooms: Vec<RoomListEntry>,
    },
    Error {
        code: String,
        message: String,
        retryable: bool,
    },
}

impl ServerResponse {
    pub fn error(code: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }
}
