//! Fanout connection management and ordered drain for the weather broadcast
//! feed.
//!
//! One producer thread per fanout server reads frames off a TCP connection,
//! keys them, and feeds the shared
//! [`ReorderBuffer`](wxblend_buffer::ReorderBuffer); a single consumer
//! thread drains the buffer in key order into an output sink. Connections
//! that drop are retried for as long as the feed runs.

pub mod error;
pub mod fanout;
pub mod sink;

pub use error::{IngestError, Result};
pub use fanout::{spawn_readers, FanoutClient, FanoutConfig};
pub use sink::{drain, open_sink};
