//! Parsing of eslogger NDJSON output.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::source::{FileHandle, RawFileEvent};

/// Maximum JSON line length we will attempt to parse (1 MiB).
/// Lines exceeding this are rejected to prevent memory abuse.
const MAX_LINE_LENGTH: usize = 1_048_576;

/// Top-level record emitted by eslogger in JSON format.
#[derive(Debug, Clone, Deserialize)]
struct EsloggerRecord {
    /// The ES event type, e.g. "create", "rename".
    event_type: String,
    /// Event-specific payload (varies by event_type).
    event: serde_json::Value,
}

/// A file record inside an eslogger payload.
#[derive(Debug, Clone, Deserialize)]
struct RawFile {
    path: String,
    #[serde(default)]
    device: i64,
    #[serde(default)]
    inode: u64,
}

/// Destination of a `create` or `rename`: directory plus filename token.
#[derive(Debug, Clone, Deserialize)]
struct Destination {
    dir: RawFile,
    filename: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateData {
    destination: Destination,
}

#[derive(Debug, Clone, Deserialize)]
struct TargetData {
    target: RawFile,
}

#[derive(Debug, Clone, Deserialize)]
struct RenameData {
    source: RawFile,
    destination: Destination,
}

/// An owned file record backing a borrowed [`FileHandle`].
#[derive(Debug, Clone)]
pub struct OwnedFile {
    pub path: String,
    pub device: i64,
    pub inode: u64,
}

impl From<RawFile> for OwnedFile {
    fn from(file: RawFile) -> Self {
        Self {
            path: file.path,
            device: file.device,
            inode: file.inode,
        }
    }
}

impl OwnedFile {
    fn handle(&self) -> FileHandle<'_> {
        FileHandle {
            path: self.path.as_bytes(),
            device: self.device,
            inode: self.inode,
        }
    }
}

/// One parsed eslogger event, owning its strings.
///
/// The raw view produced by [`as_raw`](ParsedEvent::as_raw) borrows from
/// this value, so the borrowed record handed to the delivery callback is
/// valid exactly until the parsed event is dropped -- which the reader
/// loop does immediately after the callback returns.
#[derive(Debug, Clone)]
pub enum ParsedEvent {
    Create {
        dir: OwnedFile,
        filename: String,
    },
    Write {
        target: OwnedFile,
    },
    Unlink {
        target: OwnedFile,
    },
    Rename {
        source: OwnedFile,
        dest_dir: OwnedFile,
        dest_filename: String,
    },
    Close {
        target: OwnedFile,
    },
}

impl ParsedEvent {
    /// Borrowed raw-record view for the delivery callback.
    pub fn as_raw(&self) -> RawFileEvent<'_> {
        match self {
            ParsedEvent::Create { dir, filename } => RawFileEvent::Create {
                dir: dir.handle(),
                filename: filename.as_bytes(),
            },
            ParsedEvent::Write { target } => RawFileEvent::Write {
                target: target.handle(),
            },
            ParsedEvent::Unlink { target } => RawFileEvent::Unlink {
                target: target.handle(),
            },
            ParsedEvent::Rename {
                source,
                dest_dir,
                dest_filename,
            } => RawFileEvent::Rename {
                source: source.handle(),
                dest_dir: dest_dir.handle(),
                dest_filename: dest_filename.as_bytes(),
            },
            ParsedEvent::Close { target } => RawFileEvent::Close {
                target: target.handle(),
            },
        }
    }
}

/// Parse a single JSON line from eslogger output.
///
/// Returns `Ok(None)` for event types outside the subscribed set (the
/// source may deliver kinds we never asked for; they are not an error).
/// Malformed JSON, payloads of the wrong shape, and oversized lines are
/// errors; the caller drops the line either way.
pub fn parse_line(line: &str) -> Result<Option<ParsedEvent>> {
    if line.len() > MAX_LINE_LENGTH {
        anyhow::bail!(
            "eslogger JSON line exceeds maximum length ({} > {MAX_LINE_LENGTH})",
            line.len()
        );
    }

    let record: EsloggerRecord =
        serde_json::from_str(line).context("failed to parse eslogger JSON line")?;

    let parsed = match record.event_type.as_str() {
        "create" => {
            let data: CreateData = serde_json::from_value(record.event)
                .context("malformed create payload")?;
            ParsedEvent::Create {
                dir: data.destination.dir.into(),
                filename: data.destination.filename,
            }
        }
        "write" => {
            let data: TargetData =
                serde_json::from_value(record.event).context("malformed write payload")?;
            ParsedEvent::Write {
                target: data.target.into(),
            }
        }
        "unlink" => {
            let data: TargetData =
                serde_json::from_value(record.event).context("malformed unlink payload")?;
            ParsedEvent::Unlink {
                target: data.target.into(),
            }
        }
        "rename" => {
            let data: RenameData =
                serde_json::from_value(record.event).context("malformed rename payload")?;
            ParsedEvent::Rename {
                source: data.source.into(),
                dest_dir: data.destination.dir.into(),
                dest_filename: data.destination.filename,
            }
        }
        "close" => {
            let data: TargetData =
                serde_json::from_value(record.event).context("malformed close payload")?;
            ParsedEvent::Close {
                target: data.target.into(),
            }
        }
        _ => return Ok(None),
    };

    Ok(Some(parsed))
}
