//! # filesentry-sensor
//!
//! The subscription and decode/dispatch pipeline of the filesentry agent.
//!
//! Raw records arrive from the OS security-event source through a delivery
//! callback, borrowed and valid only for that call. The pipeline decodes
//! each record into an owned [`filesentry_core::event::FileEvent`], applies
//! the path exclusion filter, and hands survivors to an
//! [`filesentry_core::ipc::EventSink`]. Nothing on that path may block
//! unboundedly or let an error escape back into the source's delivery loop.

pub mod decode;
pub mod dispatch;
pub mod eslogger;
pub mod filter;
pub mod source;
pub mod subscription;

pub use decode::{decode, DecodeError};
pub use dispatch::Dispatcher;
pub use filter::ExclusionSet;
pub use source::{
    ConnectError, DispatchSink, EventSource, FileHandle, RawFileEvent, SubscribeError,
};
pub use subscription::{Connection, SessionError, SubscriptionManager};
