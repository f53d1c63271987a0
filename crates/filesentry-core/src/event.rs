//! Normalized filesystem event types.
//!
//! A [`FileEvent`] is the owned, decoded representation of one observed
//! filesystem operation. It is the only value that crosses the process
//! boundary to the consumer and the only one whose lifetime is independent
//! of the delivery callback that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The filesystem operations the agent subscribes to.
///
/// Closed set, fixed at subscription time. Event kinds the source delivers
/// outside this set never reach the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileEventKind {
    /// File creation.
    #[serde(rename = "CREATE")]
    Create,
    /// File write.
    #[serde(rename = "WRITE")]
    Write,
    /// File deletion. The wire name is `DELETE`.
    #[serde(rename = "DELETE")]
    Unlink,
    /// File rename.
    #[serde(rename = "RENAME")]
    Rename,
    /// File close.
    #[serde(rename = "CLOSE")]
    Close,
}

/// The fixed subscription set. `subscribe` is always called with exactly
/// these five kinds.
pub const SUBSCRIBED_KINDS: [FileEventKind; 5] = [
    FileEventKind::Create,
    FileEventKind::Write,
    FileEventKind::Unlink,
    FileEventKind::Rename,
    FileEventKind::Close,
];

impl FileEventKind {
    /// Wire/log name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            FileEventKind::Create => "CREATE",
            FileEventKind::Write => "WRITE",
            FileEventKind::Unlink => "DELETE",
            FileEventKind::Rename => "RENAME",
            FileEventKind::Close => "CLOSE",
        }
    }
}

impl std::fmt::Display for FileEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized, owned filesystem event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEvent {
    /// Kind of operation observed.
    pub kind: FileEventKind,
    /// Absolute path the operation touched. For renames this is the
    /// composite `"<source> -> <destination>"` string.
    pub path: String,
    /// When the event was decoded (wall clock, not a source timestamp).
    pub timestamp: DateTime<Utc>,
}

impl FileEvent {
    /// Seconds since the Unix epoch, as carried on the IPC wire.
    pub fn unix_timestamp(&self) -> f64 {
        self.timestamp.timestamp_micros() as f64 / 1_000_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_consumer_vocabulary() {
        assert_eq!(FileEventKind::Create.as_str(), "CREATE");
        assert_eq!(FileEventKind::Write.as_str(), "WRITE");
        assert_eq!(FileEventKind::Unlink.as_str(), "DELETE");
        assert_eq!(FileEventKind::Rename.as_str(), "RENAME");
        assert_eq!(FileEventKind::Close.as_str(), "CLOSE");
    }

    #[test]
    fn kind_serializes_to_wire_name() {
        let json = serde_json::to_string(&FileEventKind::Unlink).unwrap();
        assert_eq!(json, "\"DELETE\"");
        let back: FileEventKind = serde_json::from_str("\"DELETE\"").unwrap();
        assert_eq!(back, FileEventKind::Unlink);
    }

    #[test]
    fn subscription_set_is_the_five_file_kinds() {
        assert_eq!(SUBSCRIBED_KINDS.len(), 5);
        for kind in [
            FileEventKind::Create,
            FileEventKind::Write,
            FileEventKind::Unlink,
            FileEventKind::Rename,
            FileEventKind::Close,
        ] {
            assert!(SUBSCRIBED_KINDS.contains(&kind));
        }
    }

    #[test]
    fn unix_timestamp_preserves_subsecond_precision() {
        let ts = DateTime::parse_from_rfc3339("2026-01-15T10:30:00.250Z")
            .unwrap()
            .with_timezone(&Utc);
        let event = FileEvent {
            kind: FileEventKind::Write,
            path: "/Users/me/file.txt".to_string(),
            timestamp: ts,
        };
        let secs = event.unix_timestamp();
        assert!((secs - (ts.timestamp() as f64 + 0.25)).abs() < 1e-6);
    }
}
