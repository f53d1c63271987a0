//! filesentry daemon binary entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use filesentry_core::config::MonitorConfig;
use filesentry_daemon::activation::{self, ActivationStatus};
use filesentry_daemon::Monitor;

/// filesentry - filesystem activity monitor for the OS security-event layer.
#[derive(Parser, Debug)]
#[command(name = "filesentry", version, about)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, default_value = "~/.config/filesentry/config.toml")]
    config: String,

    /// Override the consumer socket path.
    #[arg(long)]
    socket: Option<String>,

    /// Activation outcome reported by the host installer
    /// (completed | will_complete_after_reboot | needs_user_approval | failed:<reason>).
    #[arg(long)]
    activation_status: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter =
        EnvFilter::try_from_env("FILESENTRY_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if let Some(raw) = &args.activation_status {
        let status: ActivationStatus = raw.parse().context("parsing --activation-status")?;
        match status {
            ActivationStatus::Completed => {
                tracing::info!("system extension activation completed");
            }
            ActivationStatus::WillCompleteAfterReboot => {
                tracing::warn!("activation completes after reboot; start filesentry again then");
                return Ok(());
            }
            ActivationStatus::NeedsUserApproval => {
                tracing::warn!("activation awaiting user approval");
                eprintln!("{}", activation::approval_instructions());
                return Ok(());
            }
            ActivationStatus::Failed(reason) => {
                anyhow::bail!("system extension activation failed: {reason}");
            }
        }
    }

    let config_path = expand_tilde(&args.config);
    tracing::info!(config = %config_path.display(), "filesentry starting");

    let mut config = MonitorConfig::load(&config_path).context("loading configuration")?;
    if let Some(ref socket) = args.socket {
        config.forwarder.socket_path = expand_tilde(socket);
    }

    let monitor = Monitor::new(config);
    monitor.run().await
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
        return PathBuf::from("/tmp").join(rest);
    }
    PathBuf::from(path)
}
