use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::source::ValueSource;

/// What the loop does after a cycle fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Log and stop the loop.
    Terminate,
    /// Log, wait `error_backoff`, start the next cycle.
    #[default]
    Resume,
}

/// Timing and failure policy for [`Forwarder`](crate::Forwarder).
#[derive(Debug, Clone)]
pub struct ForwardSettings {
    /// Pause after a successful cycle.
    pub send_interval: Duration,
    /// Deadline for each source read.
    pub read_timeout: Duration,
    /// Pause after a failed cycle under [`ErrorPolicy::Resume`].
    pub error_backoff: Duration,
    pub on_error: ErrorPolicy,
}

impl Default for ForwardSettings {
    fn default() -> Self {
        Self {
            send_interval: Duration::from_secs(2),
            read_timeout: Duration::from_secs(5),
            error_backoff: Duration::from_secs(5),
            on_error: ErrorPolicy::Resume,
        }
    }
}

/// One forwarding destination: where the value comes from, which payload
/// field it goes in, and which URL receives it.
#[derive(Clone)]
pub struct Target {
    pub name: String,
    pub field: String,
    pub url: Url,
    pub source: Arc<dyn ValueSource>,
}

impl Target {
    pub fn new(
        name: impl Into<String>,
        field: impl Into<String>,
        url: Url,
        source: Arc<dyn ValueSource>,
    ) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            url,
            source,
        }
    }
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("field", &self.field)
            .field("url", &self.url.as_str())
            .field("source", &self.source.describe())
            .finish()
    }
}
