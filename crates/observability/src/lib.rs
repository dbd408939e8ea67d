//! Tracing and logging setup shared by every entry point.

/// Subscriber installation (filters, output format).
pub mod logging;

pub use logging::{DEFAULT_DIRECTIVE, init, init_for_tests, init_with_default};
