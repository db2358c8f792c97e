//! Pre-programmed invoker for deterministic testing without a running
//! function endpoint.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use wsgate_core::errors::InvokeError;
use wsgate_core::invoke::{InvokeOutput, Invoker};

/// Canned outcome for one function name.
#[derive(Clone)]
pub enum MockOutcome {
    /// Succeed with the JSON-serialized value as the payload.
    Payload(serde_json::Value),
    /// Succeed with a raw (possibly non-JSON) payload string.
    Raw(String),
    /// Fail the invocation.
    Error(InvokeError),
    /// Simulate a handler that raised: success at the transport level, with
    /// the function-error marker set and an error document payload.
    Fault(String),
    /// Wait, then yield the inner outcome.
    Delay(Duration, Box<MockOutcome>),
}

/// One recorded call: the function name and the payload it received.
pub type RecordedCall = (String, serde_json::Value);

/// Mock invoker keyed by function name, with an invocation log.
///
/// Functions without a configured outcome succeed with a bare
/// `{"statusCode":200}` payload, the shape the real connect/disconnect
/// handlers return.
pub struct MockInvoker {
    outcomes: HashMap<String, MockOutcome>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockInvoker {
    pub fn new() -> Self {
        Self {
            outcomes: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Configure the outcome for `function`.
    pub fn with_outcome(mut self, function: &str, outcome: MockOutcome) -> Self {
        self.outcomes.insert(function.to_string(), outcome);
        self
    }

    /// All calls recorded so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    /// Number of calls made to `function`.
    pub fn calls_to(&self, function: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .iter()
            .filter(|(name, _)| name == function)
            .count()
    }
}

impl Default for MockInvoker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Invoker for MockInvoker {
    async fn invoke(
        &self,
        function: &str,
        payload: serde_json::Value,
    ) -> Result<InvokeOutput, InvokeError> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push((function.to_string(), payload));

        let mut outcome = self
            .outcomes
            .get(function)
            .cloned()
            .unwrap_or(MockOutcome::Payload(serde_json::json!({"statusCode": 200})));

        loop {
            match outcome {
                MockOutcome::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    outcome = *inner;
                }
                MockOutcome::Payload(value) => {
                    return Ok(InvokeOutput {
                        status: 200,
                        payload: value.to_string(),
                        function_error: None,
                    })
                }
                MockOutcome::Raw(payload) => {
                    return Ok(InvokeOutput {
                        status: 200,
                        payload,
                        function_error: None,
                    })
                }
                MockOutcome::Fault(message) => {
                    return Ok(InvokeOutput {
                        status: 200,
                        payload: serde_json::json!({"errorMessage": message}).to_string(),
                        function_error: Some("Unhandled".into()),
                    })
                }
                MockOutcome::Error(e) => return Err(e),
            }
        }
    }
}
