use async_trait::async_trait;

use crate::errors::InvokeError;

/// Raw result of one handler invocation. The payload is whatever the
/// handler returned; it may or may not be JSON.
#[derive(Clone, Debug)]
pub struct InvokeOutput {
    pub status: u16,
    pub payload: String,
    /// Set when the handler itself raised (as opposed to the invoke call
    /// failing); the payload then carries the error document.
    pub function_error: Option<String>,
}

impl InvokeOutput {
    /// Parse the payload as JSON, if it is any.
    pub fn payload_json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.payload).ok()
    }
}

/// A named remote handler: an external unit of compute invoked with a
/// structured event, returning an opaque result. Object-safe so the server
/// can hold an `Arc<dyn Invoker>` and tests can substitute a mock.
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Invoke `function` synchronously with the given JSON payload,
    /// awaiting its completion.
    async fn invoke(
        &self,
        function: &str,
        payload: serde_json::Value,
    ) -> Result<InvokeOutput, InvokeError>;
}
