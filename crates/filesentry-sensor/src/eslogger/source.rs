//! The eslogger child process as an [`EventSource`].
//!
//! `connect` validates the environment, `subscribe` spawns the child with
//! the requested event names and starts the reader thread, `release`
//! terminates the child (SIGTERM, then SIGKILL after a grace period) and
//! joins the reader. There is no crash recovery: connection and
//! subscription failures are environmental and fatal to the session, and a
//! child that dies mid-session is reported, not restarted.

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{debug, info, trace, warn};

use filesentry_core::event::FileEventKind;
use filesentry_core::rate_limit::{DropLogLimiter, RateLimitResult};

use crate::eslogger::record::parse_line;
use crate::source::{ConnectError, DispatchSink, EventSource, SubscribeError};

/// Default location of the eslogger binary (macOS 13+).
const DEFAULT_BINARY: &str = "/usr/bin/eslogger";

/// Grace period between SIGTERM and SIGKILL when releasing the child.
const KILL_GRACE: Duration = Duration::from_secs(3);

/// Event source backed by an `eslogger` subprocess.
pub struct EsloggerSource {
    binary: PathBuf,
}

impl EsloggerSource {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_BINARY),
        }
    }

    /// Use an alternate binary (test harnesses).
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for EsloggerSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Client handle for a (possibly not yet subscribed) eslogger session.
pub struct EsloggerClient {
    binary: PathBuf,
    sink: Arc<DispatchSink>,
    running: Mutex<Option<RunningChild>>,
}

struct RunningChild {
    child: Child,
    reader: JoinHandle<()>,
}

impl std::fmt::Debug for EsloggerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EsloggerClient")
            .field("binary", &self.binary)
            .finish_non_exhaustive()
    }
}

impl EventSource for EsloggerSource {
    type Client = EsloggerClient;

    fn connect(&self, sink: DispatchSink) -> Result<Self::Client, ConnectError> {
        if !self.binary.exists() {
            return Err(ConnectError::SourceUnavailable(format!(
                "{} not found (requires macOS 13.0 or later)",
                self.binary.display()
            )));
        }

        // eslogger needs the Endpoint Security entitlement, which in
        // practice means running as root.
        #[cfg(target_os = "macos")]
        if !nix::unistd::Uid::effective().is_root() {
            return Err(ConnectError::NotEntitled);
        }

        Ok(EsloggerClient {
            binary: self.binary.clone(),
            sink: Arc::new(sink),
            running: Mutex::new(None),
        })
    }

    fn subscribe(
        &self,
        client: &Self::Client,
        kinds: &[FileEventKind],
    ) -> Result<(), SubscribeError> {
        let mut running = client
            .running
            .lock()
            .map_err(|_| SubscribeError::Rejected("client state poisoned".to_string()))?;
        if running.is_some() {
            return Err(SubscribeError::Rejected(
                "already subscribed".to_string(),
            ));
        }

        let mut cmd = Command::new(&client.binary);
        for kind in kinds {
            cmd.arg(es_event_name(*kind));
        }
        cmd.arg("--format").arg("json");
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::null());

        let mut child = cmd.spawn().map_err(|err| {
            SubscribeError::Rejected(format!(
                "failed to spawn {}: {err}",
                client.binary.display()
            ))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            SubscribeError::Rejected("eslogger stdout not captured".to_string())
        })?;

        let sink = Arc::clone(&client.sink);
        let reader = std::thread::Builder::new()
            .name("filesentry-es-reader".to_string())
            .spawn(move || read_loop(stdout, sink))
            .map_err(|err| SubscribeError::Rejected(format!("failed to spawn reader: {err}")))?;

        debug!(
            pid = child.id(),
            kinds = kinds.len(),
            "eslogger process spawned"
        );
        *running = Some(RunningChild { child, reader });
        Ok(())
    }

    fn release(&self, client: Self::Client) {
        let Ok(mut guard) = client.running.lock() else {
            return;
        };
        let Some(mut running) = guard.take() else {
            return;
        };
        drop(guard);

        graceful_kill(running.child.id() as i32);
        let _ = running.child.wait();
        let _ = running.reader.join();
        info!("eslogger session released");
    }
}

/// eslogger command-line name for an event kind.
fn es_event_name(kind: FileEventKind) -> &'static str {
    match kind {
        FileEventKind::Create => "create",
        FileEventKind::Write => "write",
        FileEventKind::Unlink => "unlink",
        FileEventKind::Rename => "rename",
        FileEventKind::Close => "close",
    }
}

/// Read NDJSON lines until EOF, invoking the delivery callback per record.
///
/// The parsed event is dropped as soon as the callback returns, so the
/// borrowed record never outlives the invocation.
fn read_loop(stdout: ChildStdout, sink: Arc<DispatchSink>) {
    let reader = BufReader::new(stdout);
    let mut parse_diagnostics = DropLogLimiter::default();

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "error reading eslogger stdout");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(&line) {
            Ok(Some(parsed)) => {
                (sink)(&parsed.as_raw());
            }
            Ok(None) => {
                trace!("skipping event kind outside the subscription set");
            }
            Err(err) => match parse_diagnostics.check("parse") {
                RateLimitResult::Allowed => {
                    warn!(error = %err, "failed to parse eslogger line");
                }
                RateLimitResult::NewlySuppressed => {
                    warn!("parse diagnostics over cap, suppressing further lines");
                }
                RateLimitResult::Suppressed => {}
            },
        }
    }

    // EOF: the child exited or was released. Delivery stops here; the
    // operator restarts the agent if this was unexpected.
    info!("eslogger event stream ended");
}

/// Send SIGTERM to a process, then SIGKILL if it is still alive after the
/// grace period.
fn graceful_kill(pid: i32) {
    let nix_pid = Pid::from_raw(pid);
    if signal::kill(nix_pid, Signal::SIGTERM).is_ok() {
        debug!(pid, "sent SIGTERM to eslogger child");
        std::thread::spawn(move || {
            std::thread::sleep(KILL_GRACE);
            let _ = signal::kill(nix_pid, Signal::SIGKILL);
        });
    }
}
