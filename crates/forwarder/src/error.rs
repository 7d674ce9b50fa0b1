use std::time::Duration;

use vis_relay_client::ClientError;

/// Coarse classification used by the failure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No value arrived within the read deadline.
    Timeout,
    /// The webhook request failed before a response arrived.
    Transport,
    /// Shutdown was requested.
    Cancelled,
    Other,
}

/// Errors that abort a forwarding cycle.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("no value for {what} within {after:?}")]
    Timeout { what: String, after: Duration },

    #[error("POST {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("VIS client error: {0}")]
    Client(ClientError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cancelled")]
    Cancelled,
}

impl ForwardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Transport { .. } | Self::Http(_) => ErrorKind::Transport,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Client(_) | Self::Json(_) => ErrorKind::Other,
        }
    }
}

impl From<ClientError> for ForwardError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Timeout { path, after } => Self::Timeout { what: path, after },
            other => Self::Client(other),
        }
    }
}

/// Renders an error followed by its `source()` chain.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut cur = err.source();
    while let Some(e) = cur {
        out.push_str(": ");
        out.push_str(&e.to_string());
        cur = e.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_timeout_maps_to_timeout_kind() {
        let err: ForwardError = ClientError::Timeout {
            path: "Signal.Emulator.telemetry.lat".into(),
            after: Duration::from_secs(5),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(
            err.to_string(),
            "no value for Signal.Emulator.telemetry.lat within 5s"
        );
    }

    #[test]
    fn other_client_errors_are_unclassified() {
        let err: ForwardError = ClientError::Closed.into();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(ForwardError::Cancelled.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn transport_chain_includes_cause() {
        let err = ForwardError::Transport {
            url: "http://127.0.0.1:1/latitude".into(),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )),
        };
        assert_eq!(err.kind(), ErrorKind::Transport);
        let chain = error_chain(&err);
        assert!(chain.starts_with("POST http://127.0.0.1:1/latitude failed"));
        assert!(chain.ends_with(": connection refused"));
    }
}
