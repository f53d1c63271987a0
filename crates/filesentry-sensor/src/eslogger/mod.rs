//! macOS Endpoint Security (`eslogger`) event source.
//!
//! Realizes the [`EventSource`](crate::source::EventSource) boundary over
//! the `eslogger` command-line tool, which streams Endpoint Security
//! notifications as NDJSON. Each stdout line is parsed into an owned
//! record whose backing storage lives exactly as long as the delivery
//! callback invocation it feeds.

pub mod record;
pub mod source;

pub use record::{parse_line, ParsedEvent};
pub use source::{EsloggerClient, EsloggerSource};
