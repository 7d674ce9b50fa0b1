//! Where each target's value comes from.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::Value;
use vis_relay_cache::SampleCache;
use vis_relay_client::{DataAccessor, DataHandle, DataSubscription};

use crate::error::ForwardError;

pub type ReadFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, ForwardError>> + Send + 'a>>;

/// A readable value for one target.
///
/// Implemented for the client's data handles (latest value, waiting up to
/// `timeout` for the first one) and for [`SampleCache`] (immediate snapshot;
/// the timeout is unused).
pub trait ValueSource: Send + Sync {
    fn read(&self, timeout: Duration) -> ReadFuture<'_>;

    /// Short label for logs.
    fn describe(&self) -> String;
}

impl ValueSource for DataSubscription {
    fn read(&self, timeout: Duration) -> ReadFuture<'_> {
        Box::pin(async move { Ok(self.get_value(timeout).await?) })
    }

    fn describe(&self) -> String {
        format!("subscription {}", self.path())
    }
}

impl ValueSource for DataAccessor {
    fn read(&self, timeout: Duration) -> ReadFuture<'_> {
        Box::pin(async move { Ok(self.get_value(timeout).await?) })
    }

    fn describe(&self) -> String {
        format!("attribute {}", self.path())
    }
}

impl ValueSource for SampleCache {
    fn read(&self, _timeout: Duration) -> ReadFuture<'_> {
        let samples = self.snapshot();
        Box::pin(async move { Ok(serde_json::to_value(samples)?) })
    }

    fn describe(&self) -> String {
        format!("history {}/{}", self.len(), self.capacity())
    }
}

/// Recent history of a live subscription.
///
/// The cache is filled by the subscription's data callback. Reads fail once
/// the subscription's connection is gone rather than replaying a frozen
/// window.
pub struct History {
    feed: DataSubscription,
    cache: SampleCache,
}

impl History {
    /// Starts recording every update of `feed` into `cache`.
    pub fn new(feed: DataSubscription, cache: SampleCache) -> Self {
        let writer = cache.clone();
        feed.on_data(Box::new(move |update| writer.observe(update)));
        Self { feed, cache }
    }
}

impl ValueSource for History {
    fn read(&self, timeout: Duration) -> ReadFuture<'_> {
        Box::pin(async move {
            self.feed.ensure_connected()?;
            self.cache.read(timeout).await
        })
    }

    fn describe(&self) -> String {
        format!("{} of {}", self.cache.describe(), self.feed.path())
    }
}
