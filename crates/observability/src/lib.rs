//! Tracing and logging setup shared by binaries and tests.

/// Initialize process-wide logging from the environment.
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() -> anyhow::Result<()> {
    tracing::init_with(&tracing::ObservabilityConfig::from_env()?);
    Ok(())
}

/// Subscriber configuration (format, filters).
pub mod tracing;

pub use self::tracing::{ObservabilityConfig, LogFormat};
