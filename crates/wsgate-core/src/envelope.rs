//! The event envelope handed to remote handlers.
//!
//! The shape mirrors what a managed WebSocket gateway delivers to its
//! integration functions, so the same handlers run unmodified against the
//! local relay and the real deployment.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::ConnectionId;

/// Lifecycle category of a socket event.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum RouteKey {
    #[serde(rename = "$connect")]
    Connect,
    #[serde(rename = "sendMessage")]
    SendMessage,
    #[serde(rename = "$disconnect")]
    Disconnect,
}

impl RouteKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "$connect",
            Self::SendMessage => "sendMessage",
            Self::Disconnect => "$disconnect",
        }
    }
}

/// Routing context attached to every event.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub route_key: RouteKey,
    pub connection_id: ConnectionId,
    pub domain_name: String,
    pub stage: String,
}

/// One socket lifecycle event, constructed fresh per event and passed by
/// value to the handler invocation. Never persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayEvent {
    pub request_context: RequestContext,
    /// Connect-time query parameters (the client's `token`, when present),
    /// passed through opaquely for the handler to validate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_string_parameters: Option<HashMap<String, String>>,
    /// The raw inbound frame, forwarded verbatim on the message route.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}
