//! filesentry daemon orchestration logic.
//!
//! The [`Monitor`] ties together the event-source subscription, the
//! dispatch pipeline, the forwarder, and signal handling into a single
//! process that runs until told to stop.

pub mod activation;
pub mod forwarder;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use filesentry_core::config::MonitorConfig;
use filesentry_core::ipc::EventSink;
use filesentry_sensor::eslogger::EsloggerSource;
use filesentry_sensor::source::ConnectError;
use filesentry_sensor::subscription::SessionError;
use filesentry_sensor::{Dispatcher, ExclusionSet, SubscriptionManager};

use forwarder::{Forwarder, UnixTransport};

/// The monitoring agent: one event-source session for the process lifetime.
pub struct Monitor {
    config: MonitorConfig,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    /// Run the monitoring session until SIGTERM/SIGINT.
    ///
    /// Connection and subscription failures are environmental and fatal:
    /// they are reported and surfaced, never retried. Shutdown releases the
    /// source connection exactly once, after the signal, so the handle
    /// outlives any in-flight delivery callback.
    pub async fn run(self) -> Result<()> {
        let transport = UnixTransport::from_config(&self.config.forwarder);
        let forwarder = Arc::new(Forwarder::new(transport));

        let dispatcher = Arc::new(Dispatcher::with_diagnostics(
            ExclusionSet::from(&self.config.filter),
            Arc::clone(&forwarder) as Arc<dyn EventSink>,
            &self.config.diagnostics,
        ));

        let source = Arc::new(EsloggerSource::new());
        let manager = SubscriptionManager::new(source);

        let connection = match manager.start(dispatcher.dispatch_sink()) {
            Ok(connection) => connection,
            Err(SessionError::Connect(ConnectError::NotEntitled)) => {
                error!("not entitled to open the security-event source");
                eprintln!("{}", activation::approval_instructions());
                anyhow::bail!("monitoring session could not start: not entitled");
            }
            Err(err) => {
                return Err(anyhow::Error::from(err).context("starting monitoring session"));
            }
        };

        let pid_path = pid_file_path();
        write_pid_file(&pid_path)?;

        info!(
            socket = %self.config.forwarder.socket_path.display(),
            exclusions = self.config.filter.excluded_prefixes.len(),
            "filesentry monitoring started"
        );

        wait_for_shutdown_signal().await?;

        // Release after the signal: the connection outlives the last
        // possible callback invocation.
        manager.shutdown(connection);

        let stats = forwarder.stats();
        info!(
            sent = stats.sent,
            dropped_no_peer = stats.dropped_no_peer,
            dropped_send_error = stats.dropped_send_error,
            "forwarder totals"
        );

        remove_pid_file(&pid_path);
        info!("filesentry shut down");
        Ok(())
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("installing SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
        _ = sigint.recv() => info!("SIGINT received, shutting down"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("Ctrl-C received, shutting down");
    Ok(())
}

/// Path for the daemon PID file.
fn pid_file_path() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".local/share/filesentry/filesentry.pid")
    } else {
        PathBuf::from("/tmp/filesentry.pid")
    }
}

/// Write the current PID to the PID file.
fn write_pid_file(path: &PathBuf) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let pid = std::process::id();
    std::fs::write(path, pid.to_string())
        .with_context(|| format!("writing PID file: {}", path.display()))?;
    info!(pid = pid, path = %path.display(), "wrote PID file");
    Ok(())
}

/// Remove the PID file on clean shutdown.
fn remove_pid_file(path: &PathBuf) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!(error = %e, "failed to remove PID file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_file_creation_and_cleanup() {
        let dir = tempfile::TempDir::new().unwrap();
        let pid_path = dir.path().join("test.pid");
        write_pid_file(&pid_path).unwrap();
        assert!(pid_path.exists());
        let contents = std::fs::read_to_string(&pid_path).unwrap();
        assert_eq!(contents, std::process::id().to_string());
        remove_pid_file(&pid_path);
        assert!(!pid_path.exists());
    }

    #[test]
    fn remove_missing_pid_file_is_a_noop() {
        let dir = tempfile::TempDir::new().unwrap();
        remove_pid_file(&dir.path().join("never-written.pid"));
    }

    #[test]
    fn monitor_builds_from_default_config() {
        let _monitor = Monitor::new(MonitorConfig::default());
    }
}
