//! Path exclusion filter.
//!
//! Drops events under noisy system prefixes before they reach the
//! forwarder. Plain case-sensitive prefix match, no glob semantics; the
//! set is immutable for the lifetime of a monitoring session.

use filesentry_core::config::FilterConfig;

/// An ordered set of excluded path prefixes.
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    prefixes: Vec<String>,
}

impl ExclusionSet {
    /// Build a set from explicit prefixes.
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    /// Returns `true` if events for `path` should be forwarded, `false` if
    /// the path falls under any excluded prefix.
    pub fn is_monitored(&self, path: &str) -> bool {
        !self
            .prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// The configured prefixes, in order.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self::from(&FilterConfig::default())
    }
}

impl From<&FilterConfig> for ExclusionSet {
    fn from(config: &FilterConfig) -> Self {
        Self::new(config.excluded_prefixes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_excludes_system_prefixes() {
        let set = ExclusionSet::default();
        assert!(!set.is_monitored("/System/Library/foo"));
        assert!(!set.is_monitored("/Library/Caches/com.example/blob"));
        assert!(!set.is_monitored("/private/tmp/scratch"));
    }

    #[test]
    fn default_monitors_user_paths() {
        let set = ExclusionSet::default();
        assert!(set.is_monitored("/Users/me/doc.txt"));
        assert!(set.is_monitored("/opt/local/bin/tool"));
    }

    #[test]
    fn match_is_prefix_only_and_case_sensitive() {
        let set = ExclusionSet::default();
        // "/System" without the trailing slash is not under "/System/"
        assert!(set.is_monitored("/SystemVolume/foo"));
        assert!(set.is_monitored("/system/Library/foo"));
        // A path containing the prefix mid-string is monitored
        assert!(set.is_monitored("/Users/me/System/foo"));
    }

    #[test]
    fn empty_set_monitors_everything() {
        let set = ExclusionSet::new(Vec::new());
        assert!(set.is_monitored("/System/Library/foo"));
    }

    #[test]
    fn custom_prefixes_from_config() {
        let config = FilterConfig {
            excluded_prefixes: vec!["/nix/store/".to_string()],
        };
        let set = ExclusionSet::from(&config);
        assert!(!set.is_monitored("/nix/store/abc-pkg/bin/x"));
        assert!(set.is_monitored("/System/Library/foo"));
        assert_eq!(set.prefixes(), ["/nix/store/"]);
    }
}
