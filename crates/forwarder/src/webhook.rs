//! Webhook delivery.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Url;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ForwardError;

pub type PostFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ForwardError>> + Send + 'a>>;

/// Destination for forwarded payloads.
///
/// One attempt per call; implementations must not retry.
pub trait WebhookSink: Send + Sync {
    fn post<'a>(&'a self, url: &'a Url, body: &'a Value) -> PostFuture<'a>;
}

/// JSON-over-HTTP sink backed by `reqwest`.
///
/// Only request-level failures (connect, DNS, timeout) are errors. A
/// non-success status is logged and otherwise treated as delivered.
pub struct HttpSink {
    http: reqwest::Client,
}

impl HttpSink {
    /// Creates a sink whose requests give up after `request_timeout`.
    pub fn new(request_timeout: Duration) -> Result<Self, ForwardError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self { http })
    }
}

impl WebhookSink for HttpSink {
    fn post<'a>(&'a self, url: &'a Url, body: &'a Value) -> PostFuture<'a> {
        Box::pin(async move {
            let resp = self
                .http
                .post(url.clone())
                .json(body)
                .send()
                .await
                .map_err(|e| ForwardError::Transport {
                    url: url.to_string(),
                    source: Box::new(e),
                })?;

            let status = resp.status();
            if status.is_success() {
                debug!(url = %url, status = status.as_u16(), "webhook accepted payload");
            } else {
                warn!(url = %url, status = status.as_u16(), "webhook answered with non-success status");
            }
            Ok(())
        })
    }
}
