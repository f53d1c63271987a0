//! Rate limiting for drop diagnostics.
//!
//! Every dropped event (decode failure, filter exclusion, dead peer) may
//! produce a diagnostic log line. During an event storm those lines can
//! themselves become a resource problem, so they are capped per reason per
//! time window.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Result of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Emit the diagnostic.
    Allowed,
    /// This check crossed the cap; emit one suppression notice, then stay
    /// quiet.
    NewlySuppressed,
    /// Already over the cap for the current window.
    Suppressed,
}

/// Windowed per-reason cap on drop-diagnostic log lines.
///
/// Unlike a session-wide block, the counter resets when the window expires:
/// once a storm passes, diagnostics resume.
pub struct DropLogLimiter {
    /// reason -> (count, window_start)
    counters: HashMap<&'static str, (u32, Instant)>,
    /// Maximum lines allowed per window, per reason.
    max_per_window: u32,
    /// Window length.
    window: Duration,
}

impl DropLogLimiter {
    /// Create a limiter allowing `max_per_window` lines per `window`.
    pub fn new(max_per_window: u32, window: Duration) -> Self {
        Self {
            counters: HashMap::new(),
            max_per_window,
            window,
        }
    }

    /// Limiter configured from a per-minute cap.
    pub fn per_minute(max: u32) -> Self {
        Self::new(max, Duration::from_secs(60))
    }

    /// Check whether a diagnostic for `reason` may be emitted now.
    pub fn check(&mut self, reason: &'static str) -> RateLimitResult {
        let now = Instant::now();
        let entry = self.counters.entry(reason).or_insert((0, now));

        if now.duration_since(entry.1) >= self.window {
            entry.0 = 0;
            entry.1 = now;
        }

        entry.0 += 1;

        if entry.0 <= self.max_per_window {
            RateLimitResult::Allowed
        } else if entry.0 == self.max_per_window + 1 {
            RateLimitResult::NewlySuppressed
        } else {
            RateLimitResult::Suppressed
        }
    }
}

impl Default for DropLogLimiter {
    fn default() -> Self {
        Self::per_minute(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_under_cap() {
        let mut limiter = DropLogLimiter::new(3, Duration::from_secs(60));
        assert_eq!(limiter.check("decode"), RateLimitResult::Allowed);
        assert_eq!(limiter.check("decode"), RateLimitResult::Allowed);
        assert_eq!(limiter.check("decode"), RateLimitResult::Allowed);
    }

    #[test]
    fn suppresses_over_cap_with_single_notice() {
        let mut limiter = DropLogLimiter::new(2, Duration::from_secs(60));
        assert_eq!(limiter.check("decode"), RateLimitResult::Allowed);
        assert_eq!(limiter.check("decode"), RateLimitResult::Allowed);
        assert_eq!(limiter.check("decode"), RateLimitResult::NewlySuppressed);
        assert_eq!(limiter.check("decode"), RateLimitResult::Suppressed);
        assert_eq!(limiter.check("decode"), RateLimitResult::Suppressed);
    }

    #[test]
    fn reasons_are_independent() {
        let mut limiter = DropLogLimiter::new(1, Duration::from_secs(60));
        assert_eq!(limiter.check("decode"), RateLimitResult::Allowed);
        assert_eq!(limiter.check("peer"), RateLimitResult::Allowed);
        assert_eq!(limiter.check("decode"), RateLimitResult::NewlySuppressed);
        assert_eq!(limiter.check("peer"), RateLimitResult::NewlySuppressed);
    }

    #[test]
    fn window_expiry_resumes_logging() {
        let mut limiter = DropLogLimiter::new(1, Duration::from_millis(40));
        assert_eq!(limiter.check("decode"), RateLimitResult::Allowed);
        assert_eq!(limiter.check("decode"), RateLimitResult::NewlySuppressed);
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(limiter.check("decode"), RateLimitResult::Allowed);
    }
}
