//! Telemetry forwarding loop.
//!
//! Each cycle reads every [`Target`]'s [`ValueSource`] in declaration
//! order, wraps the value as `{"vin": …, "<field>": …}` and POSTs it through
//! a [`WebhookSink`]. What happens after a failed cycle is decided by the
//! configured [`ErrorPolicy`].

pub mod error;
pub mod forward_loop;
pub mod payload;
pub mod source;
pub mod types;
pub mod webhook;

pub use error::{ErrorKind, ForwardError};
pub use forward_loop::Forwarder;
pub use source::{History, ValueSource};
pub use types::{ErrorPolicy, ForwardSettings, Target};
pub use webhook::{HttpSink, WebhookSink};
