//! Startup sequence: connect, identify the vehicle, subscribe, forward.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use vis_relay_cache::SampleCache;
use vis_relay_client::{DataAccessor, DataHandle, DataSubscription, VisClient};
use vis_relay_forwarder::{Forwarder, History, HttpSink, Target, ValueSource};

use crate::config::{PayloadShape, RelayConfig};

/// Runs the relay until Ctrl-C or, under the `terminate` policy, the first
/// failed cycle.
pub async fn run(config: RelayConfig) -> anyhow::Result<()> {
    let client = VisClient::connect(&config.vis_url)
        .await
        .with_context(|| format!("failed to connect to {}", config.vis_url))?;

    let settings = config.forward_settings();
    let vin = fetch_vin(&client, &config.vin_path, settings.read_timeout).await?;
    info!(vin = %vin, "vehicle identified");

    let mut subscriptions = Vec::with_capacity(config.routes.len());
    let mut targets = Vec::with_capacity(config.routes.len());
    for route in &config.routes {
        let sub = DataSubscription::new(&route.path)?;
        client.register(&sub);

        let source: Arc<dyn ValueSource> = match route.shape {
            PayloadShape::Latest => Arc::new(sub.clone()),
            PayloadShape::History => Arc::new(History::new(
                sub.clone(),
                SampleCache::new(config.cache_size)?,
            )),
        };

        client.send_subscribe(&sub).await?;
        targets.push(Target::new(
            &route.name,
            route.field(),
            config.endpoint_url(route)?,
            source,
        ));
        subscriptions.push(sub);
    }

    let sink = Arc::new(HttpSink::new(config.request_timeout())?);
    let forwarder = Forwarder::new(vin, targets, sink, settings);

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("SIGINT received");
                cancel.cancel();
            }
        })
    };

    let result = forwarder.run(cancel).await;
    watcher.abort();

    for sub in &subscriptions {
        if let Err(e) = client.send_unsubscribe(sub).await {
            debug!(path = %sub.path(), "unsubscribe skipped: {e}");
        }
    }
    client.close().await;

    result.context("forwarding stopped on error")
}

/// Reads the VIN attribute once; startup fails if it does not arrive in time.
async fn fetch_vin(client: &VisClient, path: &str, timeout: Duration) -> anyhow::Result<String> {
    let accessor = DataAccessor::new(path)?;
    client.register(&accessor);
    client.send_get(&accessor).await?;
    let value = accessor
        .get_value(timeout)
        .await
        .context("vehicle identification not received")?;
    Ok(vin_to_string(value))
}

fn vin_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn vin_string_used_verbatim() {
        assert_eq!(vin_to_string(json!("WVWZZZ1JZXW000001")), "WVWZZZ1JZXW000001");
    }

    #[test]
    fn non_string_vin_uses_json_text() {
        assert_eq!(vin_to_string(json!(12345)), "12345");
        assert_eq!(vin_to_string(Value::Null), "null");
    }
}
