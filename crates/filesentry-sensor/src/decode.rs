//! Decoding raw source records into normalized events.
//!
//! `decode` is pure: the only inputs are the borrowed record and the caller
//! supplied clock reading, the only output is an owned [`FileEvent`] with
//! no ties to source memory.
//!
//! Path handling mirrors the event source's own semantics: bytes are
//! interpreted strictly as UTF-8 and joined with a single separator, with
//! no resolution of `..`, symlinks, or duplicate separators.

use chrono::{DateTime, Utc};
use thiserror::Error;

use filesentry_core::event::FileEvent;

use crate::source::RawFileEvent;

/// Per-event decode failure. The event is dropped; never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A path component was not valid UTF-8.
    #[error("path bytes are not valid UTF-8")]
    InvalidPath,
}

/// Interpret raw path bytes as UTF-8 text.
pub fn resolve_path(raw: &[u8]) -> Result<&str, DecodeError> {
    std::str::from_utf8(raw).map_err(|_| DecodeError::InvalidPath)
}

/// Join a directory and a filename with a single separator.
pub fn join_path(dir: &str, name: &str) -> String {
    format!("{dir}/{name}")
}

/// Decode one raw record into an owned, normalized event.
///
/// `now` becomes the event timestamp; the source's own timestamp field is
/// never trusted.
pub fn decode(record: &RawFileEvent<'_>, now: DateTime<Utc>) -> Result<FileEvent, DecodeError> {
    let path = match record {
        RawFileEvent::Create { dir, filename } => {
            let dir = resolve_path(dir.path)?;
            let name = resolve_path(filename)?;
            join_path(dir, name)
        }
        RawFileEvent::Write { target }
        | RawFileEvent::Unlink { target }
        | RawFileEvent::Close { target } => resolve_path(target.path)?.to_string(),
        RawFileEvent::Rename {
            source,
            dest_dir,
            dest_filename,
        } => {
            let source = resolve_path(source.path)?;
            let dir = resolve_path(dest_dir.path)?;
            let name = resolve_path(dest_filename)?;
            format!("{source} -> {}", join_path(dir, name))
        }
    };

    Ok(FileEvent {
        kind: record.kind(),
        path,
        timestamp: now,
    })
}
