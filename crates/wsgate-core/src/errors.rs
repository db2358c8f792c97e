use std::time::Duration;

/// Failures invoking a remote handler. Logged by the relay and discarded;
/// a failed forward never closes the originating socket.
#[derive(Clone, Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    #[error("invoke endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
}

impl InvokeError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Timeout(_) => "timeout",
            Self::Status { .. } => "status",
        }
    }
}

/// Failures pushing a payload to a registered connection. Both variants are
/// answered as not-found by the push endpoint; the distinction exists for
/// logging only.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PushError {
    /// No live registry entry for the target identifier.
    #[error("no live connection for the target identifier")]
    NotFound,
    /// The entry exists but its socket is not in a writable state.
    #[error("connection write failed")]
    WriteFailed,
}

impl PushError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::WriteFailed => "write_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoke_error_kind_strings() {
        assert_eq!(InvokeError::Transport("tcp".into()).error_kind(), "transport");
        assert_eq!(
            InvokeError::Timeout(Duration::from_secs(30)).error_kind(),
            "timeout"
        );
        assert_eq!(
            InvokeError::Status {
                status: 500,
                body: "err".into()
            }
            .error_kind(),
            "status"
        );
    }

    #[test]
    fn push_error_kind_strings() {
        assert_eq!(PushError::NotFound.error_kind(), "not_found");
        assert_eq!(PushError::WriteFailed.error_kind(), "write_failed");
    }

    #[test]
    fn invoke_error_display() {
        let e = InvokeError::Status {
            status: 502,
            body: "bad gateway".into(),
        };
        assert_eq!(e.to_string(), "invoke endpoint returned status 502: bad gateway");
    }
}
