//! Integration tests for the eslogger-backed event source, using a mock
//! eslogger script in place of the real binary.
#![cfg(unix)]

use filesentry_sensor::eslogger::EsloggerSource;
use filesentry_sensor::source::{ConnectError, EventSource};

#[test]
fn connect_fails_without_the_binary() {
    let source = EsloggerSource::with_binary("/does/not/exist/eslogger");
    let err = source.connect(Box::new(|_| {})).unwrap_err();
    assert!(matches!(err, ConnectError::SourceUnavailable(_)));
}

// The remaining tests spawn the mock script as a real child process; on
// macOS `connect` additionally requires root, so they run elsewhere.
#[cfg(not(target_os = "macos"))]
mod with_mock_binary {
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use std::sync::mpsc;
    use std::time::Duration;

    use filesentry_core::event::{FileEventKind, SUBSCRIBED_KINDS};
    use filesentry_sensor::eslogger::EsloggerSource;
    use filesentry_sensor::source::{EventSource, RawFileEvent};

    /// Write an executable script that plays eslogger: emits the given
    /// lines on stdout, then exits.
    fn mock_eslogger(dir: &std::path::Path, lines: &[&str]) -> PathBuf {
        let path = dir.join("eslogger");
        let mut script = String::from("#!/bin/sh\n");
        for line in lines {
            script.push_str("echo '");
            script.push_str(line);
            script.push_str("'\n");
        }
        std::fs::write(&path, script).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn streams_subscribed_events_through_the_callback() {
        let dir = tempfile::tempdir().unwrap();
        let binary = mock_eslogger(
            dir.path(),
            &[
                r#"{"event_type":"write","event":{"target":{"path":"/Users/me/file.txt"}}}"#,
                // Kind outside the subscription set: skipped, not an error
                r#"{"event_type":"exec","event":{"target_path":"/bin/ls"}}"#,
                // Malformed line: dropped
                r#"this is not json"#,
                r#"{"event_type":"rename","event":{"source":{"path":"/a/b.txt"},"destination":{"dir":{"path":"/a"},"filename":"c.txt"}}}"#,
            ],
        );

        let (tx, rx) = mpsc::channel::<(FileEventKind, String)>();
        let source = EsloggerSource::with_binary(&binary);
        let client = source
            .connect(Box::new(move |record: &RawFileEvent<'_>| {
                let path = match record {
                    RawFileEvent::Write { target } => {
                        String::from_utf8_lossy(target.path).into_owned()
                    }
                    RawFileEvent::Rename { source, .. } => {
                        String::from_utf8_lossy(source.path).into_owned()
                    }
                    _ => String::new(),
                };
                let _ = tx.send((record.kind(), path));
            }))
            .expect("connect should succeed with mock binary");

        source
            .subscribe(&client, &SUBSCRIBED_KINDS)
            .expect("subscribe should spawn the mock");

        let first = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("first event should arrive");
        assert_eq!(first.0, FileEventKind::Write);
        assert_eq!(first.1, "/Users/me/file.txt");

        let second = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("second event should arrive");
        assert_eq!(second.0, FileEventKind::Rename);
        assert_eq!(second.1, "/a/b.txt");

        // exec and the malformed line never produce a callback
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());

        source.release(client);
    }

    #[test]
    fn double_subscribe_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let binary = mock_eslogger(dir.path(), &[]);

        let source = EsloggerSource::with_binary(&binary);
        let client = source.connect(Box::new(|_| {})).unwrap();

        source.subscribe(&client, &SUBSCRIBED_KINDS).unwrap();
        assert!(source.subscribe(&client, &SUBSCRIBED_KINDS).is_err());

        source.release(client);
    }

    #[test]
    fn release_after_child_exit_is_clean() {
        let dir = tempfile::tempdir().unwrap();
        let binary = mock_eslogger(dir.path(), &[]);

        let source = EsloggerSource::with_binary(&binary);
        let client = source.connect(Box::new(|_| {})).unwrap();
        source.subscribe(&client, &SUBSCRIBED_KINDS).unwrap();

        // The script exits immediately; give it a moment, then release.
        std::thread::sleep(Duration::from_millis(100));
        source.release(client);
    }
}
