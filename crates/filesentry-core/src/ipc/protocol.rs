//! IPC protocol definitions for agent-consumer communication.
//!
//! The agent sends [`MonitorMessage`] frames to the consumer. The consumer
//! never replies; a consumer that is absent or restarting simply misses
//! events.

use serde::{Deserialize, Serialize};

use crate::event::{FileEvent, FileEventKind};

/// A message sent from the monitoring agent to the consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MonitorMessage {
    /// One observed filesystem event.
    FileEvent {
        /// Operation kind (`CREATE`, `WRITE`, `DELETE`, `RENAME`, `CLOSE`).
        kind: FileEventKind,
        /// Affected path; composite `"<source> -> <dest>"` for renames.
        path: String,
        /// Seconds since the Unix epoch at decode time.
        timestamp: f64,
    },
}

impl From<&FileEvent> for MonitorMessage {
    fn from(event: &FileEvent) -> Self {
        MonitorMessage::FileEvent {
            kind: event.kind,
            path: event.path.clone(),
            timestamp: event.unix_timestamp(),
        }
    }
}

/// Seam between the dispatch pipeline and whatever carries events out of
/// the process.
///
/// `send` is deliberately infallible at the signature level: the delivery
/// callback that calls it must never observe an error, so implementations
/// absorb transport failures internally (drop, count, log) and return.
pub trait EventSink: Send + Sync {
    /// Attempt delivery of one event. Must be bounded in time and must not
    /// panic.
    fn send(&self, event: &FileEvent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn file_event_message_round_trips() {
        let msg = MonitorMessage::FileEvent {
            kind: FileEventKind::Write,
            path: "/Users/me/file.txt".to_string(),
            timestamp: 1_768_471_800.25,
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: MonitorMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn message_carries_wire_kind_names() {
        let msg = MonitorMessage::FileEvent {
            kind: FileEventKind::Unlink,
            path: "/tmp/gone".to_string(),
            timestamp: 0.0,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"DELETE\""), "got: {json}");
    }

    #[test]
    fn message_from_event_uses_epoch_seconds() {
        let event = FileEvent {
            kind: FileEventKind::Close,
            path: "/Users/me/notes.md".to_string(),
            timestamp: Utc::now(),
        };
        let MonitorMessage::FileEvent {
            kind,
            path,
            timestamp,
        } = MonitorMessage::from(&event);
        assert_eq!(kind, FileEventKind::Close);
        assert_eq!(path, event.path);
        assert!((timestamp - event.unix_timestamp()).abs() < f64::EPSILON);
    }
}
