use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::buffer::RingBuffer;

/// Number of samples kept when no capacity is configured.
pub const DEFAULT_CAPACITY: usize = 10;

const DEFAULT_NON_ZERO: NonZeroUsize = NonZeroUsize::new(DEFAULT_CAPACITY).unwrap();

/// Errors from cache construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("sample cache capacity must be at least 1")]
    ZeroCapacity,
}

/// One observed update: wall-clock UNIX time in seconds and the value.
///
/// `value` is `None` (serialized as `null`) when the update carried no
/// `value` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub value: Option<Value>,
}

/// Thread-safe window over the most recent samples of one signal.
///
/// Clones share the same storage, so one clone can live inside the client's
/// data callback while another is polled by the forwarding loop.
#[derive(Debug, Clone)]
pub struct SampleCache {
    inner: Arc<Mutex<RingBuffer<Sample>>>,
}

impl SampleCache {
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(CacheError::ZeroCapacity)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(RingBuffer::new(capacity))),
        })
    }

    /// Records a raw update stamped with the current time.
    pub fn observe(&self, update: &Value) {
        self.observe_at(update, now_secs());
    }

    /// Records a raw update with an explicit timestamp.
    pub fn observe_at(&self, update: &Value, time: f64) {
        let sample = Sample {
            time,
            value: update.get("value").cloned(),
        };
        if sample.value.is_none() {
            tracing::trace!("update without value field, recording null sample");
        }
        self.lock().push(sample);
    }

    /// Copy of the cached samples, oldest first.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.lock().to_vec()
    }

    pub fn latest(&self) -> Option<Sample> {
        self.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    // Every critical section is a single push or copy, so a poisoned lock
    // still holds a consistent buffer.
    fn lock(&self) -> MutexGuard<'_, RingBuffer<Sample>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for SampleCache {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RingBuffer::new(DEFAULT_NON_ZERO))),
        }
    }
}

fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
