//! Wire types shared by the VIS client and the relay.
//!
//! Only the subset of VIS actions the relay needs is modelled: one-shot
//! `get`, standing `subscribe` / `unsubscribe`, and server-pushed
//! `subscription` notifications.

pub mod constants;
pub mod envelope;
pub mod path;

pub use constants::Action;
pub use envelope::{Message, VisErrorBody};
pub use path::{PathError, validate_path};
