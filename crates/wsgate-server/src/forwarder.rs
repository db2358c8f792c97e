//! Translates socket lifecycle events into gateway envelopes and invokes
//! the remote handler registered for the route kind.

use std::collections::HashMap;
use std::sync::Arc;

use wsgate_core::envelope::{GatewayEvent, RequestContext, RouteKey};
use wsgate_core::errors::InvokeError;
use wsgate_core::invoke::{InvokeOutput, Invoker};
use wsgate_core::ConnectionId;

/// Remote handler names, one per route kind, fixed at startup. Defaults
/// match the deployed function names.
#[derive(Clone, Debug)]
pub struct RouteTable {
    pub connect: String,
    pub message: String,
    pub disconnect: String,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            connect: "on_connect_v2".into(),
            message: "on_send_message_v3".into(),
            disconnect: "on_disconnect_v2".into(),
        }
    }
}

impl RouteTable {
    pub fn function_for(&self, route: RouteKey) -> &str {
        match route {
            RouteKey::Connect => &self.connect,
            RouteKey::SendMessage => &self.message,
            RouteKey::Disconnect => &self.disconnect,
        }
    }
}

pub struct EventForwarder {
    invoker: Arc<dyn Invoker>,
    routes: RouteTable,
    domain_name: String,
    stage: String,
}

impl EventForwarder {
    pub fn new(
        invoker: Arc<dyn Invoker>,
        routes: RouteTable,
        domain_name: impl Into<String>,
        stage: impl Into<String>,
    ) -> Self {
        Self {
            invoker,
            routes,
            domain_name: domain_name.into(),
            stage: stage.into(),
        }
    }

    fn context(&self, route_key: RouteKey, id: &ConnectionId) -> RequestContext {
        RequestContext {
            route_key,
            connection_id: id.clone(),
            domain_name: self.domain_name.clone(),
            stage: self.stage.clone(),
        }
    }

    /// Envelope for the `$connect` route; carries the client's token when
    /// it supplied one.
    pub fn connect_event(&self, id: &ConnectionId, token: Option<&str>) -> GatewayEvent {
        let query = token.map(|t| HashMap::from([("token".to_string(), t.to_string())]));
        GatewayEvent {
            request_context: self.context(RouteKey::Connect, id),
            query_string_parameters: query,
            body: None,
        }
    }

    /// Envelope for an inbound frame, forwarded verbatim as the body.
    pub fn message_event(&self, id: &ConnectionId, body: &str) -> GatewayEvent {
        GatewayEvent {
            request_context: self.context(RouteKey::SendMessage, id),
            query_string_parameters: None,
            body: Some(body.to_string()),
        }
    }

    pub fn disconnect_event(&self, id: &ConnectionId) -> GatewayEvent {
        GatewayEvent {
            request_context: self.context(RouteKey::Disconnect, id),
            query_string_parameters: None,
            body: None,
        }
    }

    /// Serialize the envelope and invoke the handler for its route kind,
    /// awaiting completion. Failure is returned for the caller to log and
    /// discard; it never affects other connections.
    pub async fn forward(&self, event: GatewayEvent) -> Result<InvokeOutput, InvokeError> {
        let function = self.routes.function_for(event.request_context.route_key);
        let payload =
            serde_json::to_value(&event).map_err(|e| InvokeError::Transport(e.to_string()))?;
        let output = self.invoker.invoke(function, payload).await?;
        if let Some(kind) = &output.function_error {
            tracing::debug!(function = %function, error = %kind, "handler reported a function error");
        }
        Ok(output)
    }
}

/// Extract the synchronous reply from a message handler's result payload.
///
/// Only a string-typed `reply` field counts; non-JSON payloads, a missing
/// field, or a non-string field all yield `None` with no error surfaced to
/// the client.
pub fn extract_reply(output: &InvokeOutput) -> Option<String> {
    let value = output.payload_json()?;
    value.get("reply")?.as_str().map(str::to_string)
}
