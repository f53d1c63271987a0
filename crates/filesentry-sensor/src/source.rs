//! The event-source boundary.
//!
//! The privileged security-event subsystem is external to this crate; what
//! lives here is its interface: the raw record types it delivers and the
//! [`EventSource`] trait the rest of the pipeline is written against.
//!
//! Raw records borrow memory owned by the source. The lifetime parameter on
//! [`RawFileEvent`] ties every byte to the delivery callback's frame, so
//! retaining any part of a record past the callback's return does not
//! compile.

use thiserror::Error;

use filesentry_core::event::FileEventKind;

/// Borrowed view of a file record as delivered by the event source.
///
/// The path is a raw byte string with no encoding guarantee. Device and
/// inode identify the file at the OS level; sources that do not report them
/// leave them zero.
#[derive(Debug, Clone, Copy)]
pub struct FileHandle<'a> {
    /// Raw path bytes. Not guaranteed to be valid UTF-8.
    pub path: &'a [u8],
    /// Device number, or 0 if unreported.
    pub device: i64,
    /// Inode number, or 0 if unreported.
    pub inode: u64,
}

impl<'a> FileHandle<'a> {
    /// Handle from path bytes alone, with no OS identity.
    pub fn from_path(path: &'a [u8]) -> Self {
        Self {
            path,
            device: 0,
            inode: 0,
        }
    }
}

/// One raw, kind-tagged record from the event source.
///
/// Payload shape depends on the kind: creations carry the destination
/// directory and filename separately, renames carry the source file plus
/// the destination directory and filename, everything else carries a single
/// target file.
#[derive(Debug, Clone, Copy)]
pub enum RawFileEvent<'a> {
    /// File created at `dir`/`filename`.
    Create {
        dir: FileHandle<'a>,
        filename: &'a [u8],
    },
    /// File written.
    Write { target: FileHandle<'a> },
    /// File deleted.
    Unlink { target: FileHandle<'a> },
    /// File moved from `source` to `dest_dir`/`dest_filename`.
    Rename {
        source: FileHandle<'a>,
        dest_dir: FileHandle<'a>,
        dest_filename: &'a [u8],
    },
    /// File descriptor closed.
    Close { target: FileHandle<'a> },
}

impl RawFileEvent<'_> {
    /// The normalized kind this record decodes to.
    pub fn kind(&self) -> FileEventKind {
        match self {
            RawFileEvent::Create { .. } => FileEventKind::Create,
            RawFileEvent::Write { .. } => FileEventKind::Write,
            RawFileEvent::Unlink { .. } => FileEventKind::Unlink,
            RawFileEvent::Rename { .. } => FileEventKind::Rename,
            RawFileEvent::Close { .. } => FileEventKind::Close,
        }
    }
}

/// The delivery callback registered with the source at connect time.
///
/// Invoked once per delivered record. Implementations must return promptly,
/// must not panic, and must not retain references into the record.
pub type DispatchSink = Box<dyn for<'a> Fn(&RawFileEvent<'a>) + Send + Sync>;

/// Failure to establish a connection to the event source.
///
/// Both variants are environmental, not transient: retrying cannot fix a
/// missing privilege grant or an absent source. Callers treat them as fatal
/// to the monitoring session.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The process lacks the privilege grant the source requires.
    #[error("not entitled to open the security-event source")]
    NotEntitled,
    /// The source is missing or refused the client for another reason.
    #[error("security-event source unavailable: {0}")]
    SourceUnavailable(String),
}

/// Failure to register the event-kind subscription.
#[derive(Debug, Error)]
pub enum SubscribeError {
    /// The source rejected the requested kind set.
    #[error("event source rejected subscription: {0}")]
    Rejected(String),
}

/// A security-event source the agent can register with.
///
/// Exactly one live client per process; the handle returned by [`connect`]
/// is exclusively owned and must be passed back to [`release`] exactly
/// once. [`Connection`](crate::subscription::Connection) enforces that
/// structurally.
///
/// [`connect`]: EventSource::connect
/// [`release`]: EventSource::release
pub trait EventSource: Send + Sync {
    /// The source's native client handle.
    type Client: Send;

    /// Open a client, registering `sink` as the delivery callback.
    fn connect(&self, sink: DispatchSink) -> Result<Self::Client, ConnectError>;

    /// Register interest in exactly the given event kinds. Delivery may
    /// begin as soon as this returns.
    fn subscribe(
        &self,
        client: &Self::Client,
        kinds: &[FileEventKind],
    ) -> Result<(), SubscribeError>;

    /// Tear down the client. Called at most once per handle; the type
    /// system guarantees the handle cannot be released again.
    fn release(&self, client: Self::Client);
}
