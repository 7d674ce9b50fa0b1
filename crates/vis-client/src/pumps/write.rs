use std::time::Duration;

use futures_util::SinkExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{error, trace};

use super::Outbound;

/// Encodes queued requests onto the socket and sends keepalive pings every
/// `ping_period`. Sends a close frame on exit.
pub(crate) async fn write_pump<S>(
    mut write: S,
    mut rx: mpsc::Receiver<Outbound>,
    cancel: CancellationToken,
    ping_period: Duration,
) where
    S: SinkExt<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    let mut ping = tokio::time::interval(ping_period);
    ping.tick().await;

    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ping.tick() => tungstenite::Message::Ping(vec![].into()),
            out = rx.recv() => match out {
                Some(Outbound::Request(msg)) => match serde_json::to_string(&msg) {
                    Ok(json) => {
                        trace!(action = ?msg.action, request_id = ?msg.request_id, "sending request");
                        tungstenite::Message::Text(json.into())
                    }
                    Err(e) => {
                        error!("failed to encode request: {e}");
                        continue;
                    }
                },
                Some(Outbound::Frame(frame)) => frame,
                None => break,
            },
        };

        if let Err(e) = write.send(frame).await {
            error!("WebSocket write error: {e}");
            break;
        }
    }

    let _ = write.send(tungstenite::Message::Close(None)).await;
}
