//! Consumer side of a VIS WebSocket connection.
//!
//! [`VisClient`] owns the socket and its pumps. Data is read through
//! handles: a [`DataAccessor`] for one-shot attribute reads and a
//! [`DataSubscription`] for pushed signal updates. Both expose the latest
//! delivered value through [`get_value`](DataSubscription::get_value);
//! subscriptions can also notify observers via `on_data`. Once the
//! connection is gone, reads on registered handles fail with
//! [`ClientError::Closed`] instead of returning the last value.

pub mod error;
mod handle;
mod pumps;
mod router;
pub mod ws_client;

pub use error::ClientError;
pub use handle::{DataAccessor, DataCallback, DataHandle, DataSubscription};
pub use ws_client::VisClient;
