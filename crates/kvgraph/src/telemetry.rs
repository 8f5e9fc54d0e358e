//! Tracing setup for processes embedding the graph.

use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber filtered by `RUST_LOG`
/// (default `kvgraph=info`).
///
/// Returns `false` if a global subscriber was already installed, which
/// happens routinely when several tests call this.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "kvgraph=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
