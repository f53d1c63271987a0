//! Application settings and TOML configuration parsing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level filesentry configuration, loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Event forwarding (IPC client) settings.
    #[serde(default)]
    pub forwarder: ForwarderConfig,

    /// Path exclusion settings.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Diagnostic logging settings.
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

/// Settings for the IPC client that relays events to the consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwarderConfig {
    /// Unix domain socket the consumer listens on.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// Upper bound, in milliseconds, on a single connect or send attempt.
    /// The delivery callback is never allowed to wait longer than this.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

/// Settings for the path exclusion filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Path prefixes whose events are dropped. Ordinary prefix match,
    /// case-sensitive, no glob semantics.
    #[serde(default = "default_excluded_prefixes")]
    pub excluded_prefixes: Vec<String>,
}

/// Settings for per-event drop diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Whether dropped events (decode failures, filter exclusions, dead
    /// peer) produce a log line at all.
    #[serde(default = "default_true")]
    pub log_dropped_events: bool,

    /// Cap on drop-diagnostic lines per minute, per drop reason. Protects
    /// the log from event storms.
    #[serde(default = "default_max_drop_logs")]
    pub max_drop_logs_per_minute: u32,
}

fn default_socket_path() -> PathBuf {
    PathBuf::from("/var/run/filesentry/events.sock")
}

fn default_send_timeout_ms() -> u64 {
    250
}

fn default_excluded_prefixes() -> Vec<String> {
    vec![
        "/System/".to_string(),
        "/Library/Caches/".to_string(),
        "/private/tmp/".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

fn default_max_drop_logs() -> u32 {
    60
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            excluded_prefixes: default_excluded_prefixes(),
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            log_dropped_events: default_true(),
            max_drop_logs_per_minute: default_max_drop_logs(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from a TOML file. A missing file yields the
    /// defaults; a malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file: {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing config file: {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = MonitorConfig::default();
        assert_eq!(
            config.forwarder.socket_path,
            PathBuf::from("/var/run/filesentry/events.sock")
        );
        assert_eq!(config.forwarder.send_timeout_ms, 250);
        assert_eq!(
            config.filter.excluded_prefixes,
            vec!["/System/", "/Library/Caches/", "/private/tmp/"]
        );
        assert!(config.diagnostics.log_dropped_events);
        assert_eq!(config.diagnostics.max_drop_logs_per_minute, 60);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config: MonitorConfig = toml::from_str("").unwrap();
        assert_eq!(config.forwarder.send_timeout_ms, 250);
        assert_eq!(config.filter.excluded_prefixes.len(), 3);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let toml_str = r#"
[forwarder]
socket_path = "/tmp/test.sock"

[filter]
excluded_prefixes = ["/nix/"]
"#;
        let config: MonitorConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.forwarder.socket_path, PathBuf::from("/tmp/test.sock"));
        // send_timeout_ms not specified, keeps default
        assert_eq!(config.forwarder.send_timeout_ms, 250);
        assert_eq!(config.filter.excluded_prefixes, vec!["/nix/"]);
        assert!(config.diagnostics.log_dropped_events);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = MonitorConfig::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.forwarder.send_timeout_ms, 250);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[forwarder\nsocket_path = ").unwrap();
        assert!(MonitorConfig::load(&path).is_err());
    }
}
