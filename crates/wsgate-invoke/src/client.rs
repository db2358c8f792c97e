//! HTTP client for the Lambda Invoke REST API.
//!
//! Works against SAM local (the default endpoint) or anything else speaking
//! the same API. One call per event, request/response invocation type, no
//! retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use wsgate_core::errors::InvokeError;
use wsgate_core::invoke::{InvokeOutput, Invoker};

const INVOKE_PATH_PREFIX: &str = "/2015-03-31/functions";
const FUNCTION_ERROR_HEADER: &str = "x-amz-function-error";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`LambdaInvoker`].
#[derive(Clone, Debug)]
pub struct InvokeConfig {
    /// Base URL of the invoke endpoint.
    pub endpoint: String,
    /// Upper bound on a single invocation, connect through body.
    pub timeout: Duration,
}

impl Default for InvokeConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:3001".into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

pub struct LambdaInvoker {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl LambdaInvoker {
    pub fn new(config: InvokeConfig) -> Self {
        Self {
            client: Client::builder()
                .build()
                .expect("failed to build HTTP client"),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        }
    }

    fn invocation_url(&self, function: &str) -> String {
        format!(
            "{}{}/{}/invocations",
            self.endpoint, INVOKE_PATH_PREFIX, function
        )
    }
}

#[async_trait]
impl Invoker for LambdaInvoker {
    async fn invoke(
        &self,
        function: &str,
        payload: serde_json::Value,
    ) -> Result<InvokeOutput, InvokeError> {
        let response = self
            .client
            .post(self.invocation_url(function))
            .header("x-amz-invocation-type", "RequestResponse")
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InvokeError::Timeout(self.timeout)
                } else {
                    InvokeError::Transport(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let function_error = response
            .headers()
            .get(FUNCTION_ERROR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                InvokeError::Timeout(self.timeout)
            } else {
                InvokeError::Transport(e.to_string())
            }
        })?;

        if !(200..300).contains(&status) {
            return Err(InvokeError::Status { status, body });
        }

        tracing::debug!(
            function = %function,
            status = status,
            payload_len = body.len(),
            "handler invoked"
        );

        Ok(InvokeOutput {
            status,
            payload: body,
            function_error,
        })
    }
}
