//! Outbound frames the relay itself writes to client sockets.
//!
//! Everything else going down a socket is an opaque payload relayed on
//! behalf of a handler.

use serde::{Deserialize, Serialize};

use crate::ids::ConnectionId;

/// First frame sent on every accepted connection, so the client UI can show
/// its identifier. Sent regardless of the connect handler's outcome.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename = "connection_ack", rename_all = "camelCase")]
pub struct ConnectionAck {
    pub connection_id: ConnectionId,
}

/// Synchronous reply relayed from a message handler's return payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Reply {
    pub reply: String,
}
