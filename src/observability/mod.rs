//! Observability module providing structured logging.
//!
//! Logs go to stderr so that command output on stdout (e.g. `list --json`)
//! stays machine-readable.

mod tracing_init;

pub use tracing_init::*;
