//! Bounded sample history for a single VIS signal.
//!
//! A [`SampleCache`] keeps the last K updates delivered for one
//! subscription. It is fed from the client's data callback and read by the
//! forwarding loop, possibly from different tasks.

mod buffer;
pub mod cache;

pub use buffer::RingBuffer;
pub use cache::{CacheError, DEFAULT_CAPACITY, Sample, SampleCache};
