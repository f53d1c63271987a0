//! The delivery callback.
//!
//! [`Dispatcher::dispatch`] is the single entry point the event source
//! invokes for every delivered record. It decodes, filters, and forwards.
//! The contract at this boundary is strict: the function returns nothing,
//! never panics, and never blocks beyond the sink's own bounded send
//! attempt -- a failure escaping into the source's delivery loop would
//! corrupt it. All fallible work is wrapped and discarded internally.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, trace};

use filesentry_core::config::DiagnosticsConfig;
use filesentry_core::ipc::EventSink;
use filesentry_core::rate_limit::{DropLogLimiter, RateLimitResult};

use crate::decode::decode;
use crate::filter::ExclusionSet;
use crate::source::{DispatchSink, RawFileEvent};

/// Decode/filter/forward pipeline behind the delivery callback.
pub struct Dispatcher {
    exclusions: ExclusionSet,
    sink: Arc<dyn EventSink>,
    drop_logs: Mutex<DropLogLimiter>,
    log_drops: bool,
}

impl Dispatcher {
    /// Dispatcher with default diagnostics settings.
    pub fn new(exclusions: ExclusionSet, sink: Arc<dyn EventSink>) -> Self {
        Self::with_diagnostics(exclusions, sink, &DiagnosticsConfig::default())
    }

    /// Dispatcher with explicit diagnostics settings.
    pub fn with_diagnostics(
        exclusions: ExclusionSet,
        sink: Arc<dyn EventSink>,
        diagnostics: &DiagnosticsConfig,
    ) -> Self {
        Self {
            exclusions,
            sink,
            drop_logs: Mutex::new(DropLogLimiter::per_minute(
                diagnostics.max_drop_logs_per_minute,
            )),
            log_drops: diagnostics.log_dropped_events,
        }
    }

    /// Handle one delivered record.
    ///
    /// Decode failures and filter exclusions drop the event with a
    /// rate-limited diagnostic; a forwarded event is handed to the sink,
    /// which absorbs any transport failure itself. Nothing here returns or
    /// raises an error.
    pub fn dispatch(&self, record: &RawFileEvent<'_>) {
        let event = match decode(record, Utc::now()) {
            Ok(event) => event,
            Err(err) => {
                self.note_drop("undecodable", &format!("{}: {err}", record.kind()));
                return;
            }
        };

        if !self.exclusions.is_monitored(&event.path) {
            trace!(kind = %event.kind, path = %event.path, "event excluded by path filter");
            return;
        }

        self.sink.send(&event);
    }

    /// The callback handed to [`EventSource::connect`].
    ///
    /// [`EventSource::connect`]: crate::source::EventSource::connect
    pub fn dispatch_sink(self: &Arc<Self>) -> DispatchSink {
        let dispatcher = Arc::clone(self);
        Box::new(move |record| dispatcher.dispatch(record))
    }

    fn note_drop(&self, reason: &'static str, detail: &str) {
        if !self.log_drops {
            return;
        }
        let Ok(mut limiter) = self.drop_logs.lock() else {
            return;
        };
        match limiter.check(reason) {
            RateLimitResult::Allowed => {
                debug!(reason, detail, "event dropped");
            }
            RateLimitResult::NewlySuppressed => {
                debug!(reason, "drop diagnostics over cap, suppressing further lines");
            }
            RateLimitResult::Suppressed => {}
        }
    }
}
