use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use vis_relay_protocol::constants::WS_PONG_WAIT;

use super::Outbound;
use crate::router::Router;

/// Reads frames from the socket and hands text frames to the router.
///
/// Any incoming frame resets the read deadline; if nothing arrives within
/// [`WS_PONG_WAIT`] the connection is treated as dead. On exit the shared
/// token is cancelled so the write pump stops too.
pub(crate) async fn read_pump<S>(
    mut read: S,
    router: Arc<Router>,
    write_tx: mpsc::Sender<Outbound>,
    cancel: CancellationToken,
) where
    S: StreamExt<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    let deadline = tokio::time::sleep(WS_PONG_WAIT);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            () = &mut deadline => {
                warn!("no traffic from VIS server within {WS_PONG_WAIT:?}, closing");
                break;
            }

            frame = read.next() => {
                match frame {
                    Some(Ok(frame)) => {
                        deadline.as_mut().reset(tokio::time::Instant::now() + WS_PONG_WAIT);

                        match frame {
                            tungstenite::Message::Text(text) => router.dispatch(&text).await,
                            tungstenite::Message::Ping(data) => {
                                trace!("received ping, sending pong");
                                let pong = Outbound::Frame(tungstenite::Message::Pong(data));
                                let _ = write_tx.send(pong).await;
                            }
                            tungstenite::Message::Close(frame) => {
                                debug!(?frame, "received close frame");
                                break;
                            }
                            _ => {}
                        }
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket read error: {e}");
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    cancel.cancel();
    info!("VIS connection closed");
}
