//! WebSocket client for a VIS server.
//!
//! Requests are fire-and-forget: `send_get` / `send_subscribe` queue a frame
//! tagged with a fresh UUID `requestId` and return. The read pump routes the
//! response (and later notifications) back to the handle, where callers
//! pick it up with `get_value`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use vis_relay_protocol::constants::{WS_MAX_MESSAGE_SIZE, WS_PING_PERIOD, WS_WRITE_QUEUE};
use vis_relay_protocol::path::is_wildcard;
use vis_relay_protocol::{Action, Message};

use crate::error::ClientError;
use crate::handle::{DataAccessor, DataHandle, DataSlot, DataSubscription, lock, slot_of};
use crate::pumps::Outbound;
use crate::router::Router;

/// Connection to one VIS server.
///
/// Dropping the client stops its pumps, so the socket is released on every
/// exit path. Use [`VisClient::close`] for an orderly close frame.
pub struct VisClient {
    write_tx: mpsc::Sender<Outbound>,
    router: Arc<Router>,
    registered: Mutex<HashSet<String>>,
    _read_handle: tokio::task::JoinHandle<()>,
    _write_handle: tokio::task::JoinHandle<()>,
    cancel: CancellationToken,
}

impl VisClient {
    /// Opens the WebSocket and starts the read and write pumps.
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let mut ws_config = tungstenite::protocol::WebSocketConfig::default();
        ws_config.max_message_size = Some(WS_MAX_MESSAGE_SIZE);
        ws_config.max_frame_size = Some(WS_MAX_MESSAGE_SIZE);
        let (ws_stream, _) =
            tokio_tungstenite::connect_async_with_config(url, Some(ws_config), false).await?;
        let (write, read) = ws_stream.split();

        let (write_tx, write_rx) = mpsc::channel::<Outbound>(WS_WRITE_QUEUE);
        let router = Arc::new(Router::default());
        let cancel = CancellationToken::new();

        let write_handle = tokio::spawn(crate::pumps::write::write_pump(
            write,
            write_rx,
            cancel.clone(),
            WS_PING_PERIOD,
        ));
        let read_handle = tokio::spawn(crate::pumps::read::read_pump(
            read,
            router.clone(),
            write_tx.clone(),
            cancel.clone(),
        ));

        info!(url, "connected to VIS server");

        Ok(Self {
            write_tx,
            router,
            registered: Mutex::new(HashSet::new()),
            _read_handle: read_handle,
            _write_handle: write_handle,
            cancel,
        })
    }

    /// Associates a handle with this connection.
    ///
    /// Only registered handles may issue requests through this client. Once
    /// the connection closes, reads on the handle fail with
    /// [`ClientError::Closed`].
    pub fn register<H: DataHandle>(&self, handle: &H) {
        let slot = slot_of(handle);
        lock(&self.registered).insert(slot.id().to_string());
        slot.attach(self.cancel.clone());
        debug!(path = %slot.path(), "registered data handle");
    }

    /// Requests a one-shot read of the accessor's attribute.
    pub async fn send_get(&self, accessor: &DataAccessor) -> Result<(), ClientError> {
        let slot = self.registered_slot(accessor)?;
        let id = uuid::Uuid::new_v4().to_string();
        let msg = Message::get(&id, slot.path());
        self.send_request(id, Action::Get, slot, msg).await
    }

    /// Requests a standing subscription for the handle's path or pattern.
    pub async fn send_subscribe(&self, subscription: &DataSubscription) -> Result<(), ClientError> {
        let slot = self.registered_slot(subscription)?;
        let id = uuid::Uuid::new_v4().to_string();
        let msg = Message::subscribe(&id, slot.path());
        debug!(path = %slot.path(), wildcard = is_wildcard(slot.path()), "subscribing");
        self.send_request(id, Action::Subscribe, slot, msg).await
    }

    /// Cancels an acknowledged subscription. Notifications already in
    /// flight for it are dropped.
    pub async fn send_unsubscribe(
        &self,
        subscription: &DataSubscription,
    ) -> Result<(), ClientError> {
        let slot = self.registered_slot(subscription)?;
        let sub_id = slot
            .take_subscription_id()
            .ok_or_else(|| ClientError::NotSubscribed(slot.path().to_string()))?;
        self.router.drop_subscription(&sub_id).await;

        let id = uuid::Uuid::new_v4().to_string();
        let msg = Message::unsubscribe(&id, sub_id);
        self.send_request(id, Action::Unsubscribe, slot, msg).await
    }

    /// Whether the connection has been closed, by either side.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Gracefully closes the connection.
    pub async fn close(&self) {
        self.cancel.cancel();
        let _ = self
            .write_tx
            .send(Outbound::Frame(tungstenite::Message::Close(None)))
            .await;
    }

    fn registered_slot<H: DataHandle>(&self, handle: &H) -> Result<Arc<DataSlot>, ClientError> {
        let slot = slot_of(handle);
        if lock(&self.registered).contains(slot.id()) {
            Ok(slot.clone())
        } else {
            Err(ClientError::NotRegistered(slot.path().to_string()))
        }
    }

    async fn send_request(
        &self,
        request_id: String,
        action: Action,
        slot: Arc<DataSlot>,
        msg: Message,
    ) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }

        self.router.track(request_id.clone(), action, slot).await;

        if self.write_tx.send(Outbound::Request(msg)).await.is_err() {
            self.router.forget(&request_id).await;
            return Err(ClientError::Closed);
        }
        Ok(())
    }
}

impl Drop for VisClient {
    fn drop(&mut self) {
        self.cancel.cancel();
        self._read_handle.abort();
        self._write_handle.abort();
    }
}
