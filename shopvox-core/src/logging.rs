use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// Defaults to `info`, overridable through `RUST_LOG`. Logs go to stderr:
/// stdout carries responses. Calling this more than once is harmless.
pub fn initialize_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
