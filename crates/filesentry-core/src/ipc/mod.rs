//! Inter-process communication between the privileged monitoring agent and
//! the downstream consumer.
//!
//! Messages are newline-delimited JSON frames sent one-way over a Unix
//! domain socket. Delivery is fire-and-forget: at-most-once, no
//! acknowledgment, no ordering guarantee across consumer restarts.

pub mod protocol;

pub use protocol::{EventSink, MonitorMessage};
