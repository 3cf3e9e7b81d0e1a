//! Tracing subscriber setup shared by the server and the CLI.

use tracing_subscriber::EnvFilter;

/// Installs a `RUST_LOG`-filtered subscriber writing to stderr, so CLI reports
/// on stdout stay clean. Later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
