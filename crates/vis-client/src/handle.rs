//! Data handles: the objects a caller registers, requests through, and
//! reads values from.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use vis_relay_protocol::validate_path;

use crate::error::ClientError;

/// Observer invoked with the raw JSON update each time a value is delivered.
///
/// Runs on the client's read task; keep it short and non-blocking.
pub type DataCallback = Box<dyn Fn(&Value) + Send + Sync>;

/// Shared state behind a handle. The router delivers into it, the caller
/// reads from it.
pub struct DataSlot {
    id: String,
    path: String,
    latest: watch::Sender<Option<Value>>,
    callbacks: Mutex<Vec<DataCallback>>,
    subscription_id: Mutex<Option<String>>,
    /// Cancelled when the owning client's connection goes away.
    connection: Mutex<Option<CancellationToken>>,
}

impl DataSlot {
    fn new(path: &str) -> Result<Arc<Self>, ClientError> {
        validate_path(path)?;
        let (latest, _) = watch::channel(None);
        Ok(Arc::new(Self {
            id: uuid::Uuid::new_v4().to_string(),
            path: path.to_string(),
            latest,
            callbacks: Mutex::new(Vec::new()),
            subscription_id: Mutex::new(None),
            connection: Mutex::new(None),
        }))
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    /// Stores the update's `value` (or `null` when absent) as the latest
    /// value, wakes waiting readers, then runs observers.
    pub(crate) fn deliver(&self, update: &Value) {
        let value = update.get("value").cloned().unwrap_or_default();
        self.latest.send_replace(Some(value));
        trace!(path = %self.path, "value delivered");

        for cb in lock(&self.callbacks).iter() {
            cb(update);
        }
    }

    pub(crate) fn set_subscription_id(&self, id: Option<String>) {
        *lock(&self.subscription_id) = id;
    }

    pub(crate) fn subscription_id(&self) -> Option<String> {
        lock(&self.subscription_id).clone()
    }

    pub(crate) fn take_subscription_id(&self) -> Option<String> {
        lock(&self.subscription_id).take()
    }

    /// Ties the slot to a connection; reads fail once `connection` is
    /// cancelled.
    pub(crate) fn attach(&self, connection: CancellationToken) {
        *lock(&self.connection) = Some(connection);
    }

    fn ensure_connected(&self) -> Result<(), ClientError> {
        match &*lock(&self.connection) {
            Some(token) if token.is_cancelled() => Err(ClientError::Closed),
            _ => Ok(()),
        }
    }

    fn add_callback(&self, cb: DataCallback) {
        lock(&self.callbacks).push(cb);
    }

    async fn get_value(&self, timeout: Duration) -> Result<Value, ClientError> {
        let connection = lock(&self.connection).clone();
        let lost = async {
            match &connection {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };

        let mut rx = self.latest.subscribe();
        let next = async {
            rx.wait_for(Option::is_some)
                .await
                .map(|v| (*v).clone().unwrap_or_default())
                .map_err(|_| ClientError::Closed)
        };

        // A dead connection wins over a stale value.
        let result = tokio::time::timeout(timeout, async {
            tokio::select! {
                biased;
                () = lost => Err(ClientError::Closed),
                r = next => r,
            }
        })
        .await;

        match result {
            Ok(r) => r,
            Err(_) => Err(ClientError::Timeout {
                path: self.path.clone(),
                after: timeout,
            }),
        }
    }
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

mod sealed {
    pub trait Sealed {
        fn slot(&self) -> &std::sync::Arc<super::DataSlot>;
    }
}

pub(crate) fn slot_of<H: DataHandle>(handle: &H) -> &Arc<DataSlot> {
    sealed::Sealed::slot(handle)
}

/// A handle that can be registered with a [`VisClient`](crate::VisClient).
pub trait DataHandle: sealed::Sealed {
    /// Signal or attribute path this handle reads.
    fn path(&self) -> &str {
        self.slot().path()
    }

    /// Fails with [`ClientError::Closed`] once the client this handle is
    /// registered with has lost its connection.
    fn ensure_connected(&self) -> Result<(), ClientError> {
        self.slot().ensure_connected()
    }
}

/// One-shot reader for a single attribute path.
#[derive(Clone)]
pub struct DataAccessor {
    slot: Arc<DataSlot>,
}

impl DataAccessor {
    pub fn new(path: &str) -> Result<Self, ClientError> {
        Ok(Self {
            slot: DataSlot::new(path)?,
        })
    }

    /// Returns the value delivered by the last `get`, waiting up to
    /// `timeout` if none has arrived yet.
    pub async fn get_value(&self, timeout: Duration) -> Result<Value, ClientError> {
        self.slot.get_value(timeout).await
    }
}

impl sealed::Sealed for DataAccessor {
    fn slot(&self) -> &Arc<DataSlot> {
        &self.slot
    }
}

impl DataHandle for DataAccessor {}

/// Standing subscription to a signal path or wildcard pattern.
#[derive(Clone)]
pub struct DataSubscription {
    slot: Arc<DataSlot>,
}

impl DataSubscription {
    pub fn new(path: &str) -> Result<Self, ClientError> {
        Ok(Self {
            slot: DataSlot::new(path)?,
        })
    }

    /// Returns the most recently pushed value, waiting up to `timeout` for
    /// the first notification if nothing has arrived yet.
    pub async fn get_value(&self, timeout: Duration) -> Result<Value, ClientError> {
        self.slot.get_value(timeout).await
    }

    /// Registers an observer for every pushed update.
    pub fn on_data(&self, cb: DataCallback) {
        self.slot.add_callback(cb);
    }

    /// Server-assigned id, once the subscribe request was acknowledged.
    pub fn subscription_id(&self) -> Option<String> {
        self.slot.subscription_id()
    }
}

impl sealed::Sealed for DataSubscription {
    fn slot(&self) -> &Arc<DataSlot> {
        &self.slot
    }
}

impl DataHandle for DataSubscription {}
