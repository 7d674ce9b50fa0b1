//! Relay configuration.
//!
//! Values come from an optional TOML file, then environment overrides, then
//! validation. Every field has a default except the receiver URL.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use vis_relay_cache::DEFAULT_CAPACITY;
use vis_relay_forwarder::{ErrorPolicy, ForwardSettings};
use vis_relay_protocol::constants::{DEFAULT_VIS_URL, VIN_PATH};
use vis_relay_protocol::validate_path;

/// What a route posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadShape {
    /// The subscription's latest value.
    #[default]
    Latest,
    /// The last `cache_size` samples of the subscription.
    History,
}

/// One subscription forwarded to one webhook endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub name: String,
    /// Signal path or wildcard pattern to subscribe to.
    pub path: String,
    /// Resolved against `receiver_url` like a relative link.
    pub endpoint: String,
    /// Payload key for the value; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default)]
    pub shape: PayloadShape,
}

impl RouteConfig {
    pub fn field(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_vis_url")]
    pub vis_url: String,

    /// Base URL of the webhook receiver.
    #[serde(default)]
    pub receiver_url: String,

    #[serde(default = "default_vin_path")]
    pub vin_path: String,

    /// Pause between cycles.
    #[serde(default = "default_send_interval")]
    pub send_interval_secs: u64,

    /// Deadline for every value read, including the startup VIN read.
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_secs: u64,

    /// Pause after a failed cycle when `on_error = "resume"`.
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub on_error: ErrorPolicy,

    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    #[serde(default = "default_routes", rename = "route")]
    pub routes: Vec<RouteConfig>,
}

fn default_vis_url() -> String {
    DEFAULT_VIS_URL.into()
}

fn default_vin_path() -> String {
    VIN_PATH.into()
}

fn default_send_interval() -> u64 {
    2
}

fn default_wait_timeout() -> u64 {
    5
}

fn default_error_backoff() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    10
}

fn default_cache_size() -> usize {
    DEFAULT_CAPACITY
}

fn default_routes() -> Vec<RouteConfig> {
    let route = |name: &str, path: &str, shape| RouteConfig {
        name: name.into(),
        path: path.into(),
        endpoint: name.into(),
        field: None,
        shape,
    };
    vec![
        route("latitude", "Signal.Emulator.telemetry.lat", PayloadShape::Latest),
        route("telemetry", "Signal.Emulator.telemetry.*", PayloadShape::Latest),
        route(
            "speed_history",
            "Signal.Emulator.telemetry.veh_speed",
            PayloadShape::History,
        ),
    ]
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            vis_url: default_vis_url(),
            receiver_url: String::new(),
            vin_path: default_vin_path(),
            send_interval_secs: default_send_interval(),
            wait_timeout_secs: default_wait_timeout(),
            error_backoff_secs: default_error_backoff(),
            request_timeout_secs: default_request_timeout(),
            on_error: ErrorPolicy::default(),
            cache_size: default_cache_size(),
            routes: default_routes(),
        }
    }
}

impl RelayConfig {
    /// Loads the file at `path` (or defaults), applies process environment
    /// overrides and validates the result.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: RelayConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration file read");
        Ok(config)
    }

    /// Overrides fields from environment variables looked up via `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(v) = lookup("VIS_URL") {
            self.vis_url = v;
        }
        if let Some(v) = lookup("HTTP_REQUEST_RECEIVER_URL") {
            self.receiver_url = v;
        }
        if let Some(v) = lookup("DATA_SENDING_DELAY") {
            self.send_interval_secs = parse_secs("DATA_SENDING_DELAY", &v)?;
        }
        if let Some(v) = lookup("WAIT_TIMEOUT") {
            self.wait_timeout_secs = parse_secs("WAIT_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("DELAY_AFTER_ERROR") {
            self.error_backoff_secs = parse_secs("DELAY_AFTER_ERROR", &v)?;
        }
        if let Some(v) = lookup("VIS_RELAY_ON_ERROR") {
            self.on_error = match v.trim().to_ascii_lowercase().as_str() {
                "terminate" => ErrorPolicy::Terminate,
                "resume" => ErrorPolicy::Resume,
                other => bail!("VIS_RELAY_ON_ERROR must be terminate or resume, got {other:?}"),
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.receiver_url.trim().is_empty() {
            bail!("receiver URL is not set (HTTP_REQUEST_RECEIVER_URL or receiver_url)");
        }
        self.receiver_base()?;

        if self.cache_size == 0 {
            bail!("cache_size must be at least 1");
        }

        validate_path(&self.vin_path).context("invalid vin_path")?;

        let mut names = HashSet::new();
        for route in &self.routes {
            if route.name.is_empty() || route.field().is_empty() {
                bail!("route name and field must not be empty");
            }
            if !names.insert(route.name.as_str()) {
                bail!("duplicate route {:?}", route.name);
            }
            validate_path(&route.path)
                .with_context(|| format!("invalid path for route {:?}", route.name))?;
            self.endpoint_url(route)?;
        }
        Ok(())
    }

    pub fn receiver_base(&self) -> anyhow::Result<Url> {
        Url::parse(self.receiver_url.trim())
            .with_context(|| format!("invalid receiver URL {:?}", self.receiver_url))
    }

    /// Full webhook URL for `route`, resolved like `urljoin(receiver, endpoint)`.
    pub fn endpoint_url(&self, route: &RouteConfig) -> anyhow::Result<Url> {
        self.receiver_base()?
            .join(&route.endpoint)
            .with_context(|| format!("invalid endpoint {:?}", route.endpoint))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn forward_settings(&self) -> ForwardSettings {
        ForwardSettings {
            send_interval: Duration::from_secs(self.send_interval_secs),
            read_timeout: Duration::from_secs(self.wait_timeout_secs),
            error_backoff: Duration::from_secs(self.error_backoff_secs),
            on_error: self.on_error,
        }
    }
}

fn parse_secs(key: &str, value: &str) -> anyhow::Result<u64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a whole number of seconds, got {value:?}"))
}

/// Config file location: first CLI argument, else `VIS_RELAY_CONFIG`.
pub fn config_path(arg: Option<String>, env: Option<String>) -> Option<std::path::PathBuf> {
    arg.or(env).filter(|p| !p.is_empty()).map(Into::into)
}
