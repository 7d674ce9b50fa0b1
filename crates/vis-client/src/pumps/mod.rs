//! Socket pumps spawned by [`VisClient::connect`](crate::VisClient::connect).

pub(crate) mod read;
pub(crate) mod write;

use tokio_tungstenite::tungstenite;
use vis_relay_protocol::Message;

/// Item queued for the write pump.
#[derive(Debug)]
pub(crate) enum Outbound {
    /// VIS request, encoded as a JSON text frame.
    Request(Message),
    /// Control frame passed through untouched (pong replies).
    Frame(tungstenite::Message),
}
