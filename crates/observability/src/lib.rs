//! Tracing/logging setup shared by the binaries and test harnesses.

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use crate::tracing::DEFAULT_FILTER;

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init_with_default_filter(DEFAULT_FILTER);
}
