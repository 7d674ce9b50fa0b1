use std::time::Duration;

use tokio_tungstenite::tungstenite;
use vis_relay_protocol::PathError;

/// Errors from the VIS client and its data handles.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid signal path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("no value for {path} within {after:?}")]
    Timeout { path: String, after: Duration },

    #[error("handle for {0} is not registered with this client")]
    NotRegistered(String),

    #[error("{0} has no active subscription")]
    NotSubscribed(String),

    #[error("connection closed")]
    Closed,
}
