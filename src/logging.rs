//! Tracing subscriber setup for binaries embedding the bridge

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber writing to stderr, once per process
///
/// `RUST_LOG` takes precedence over `default_level`.
pub fn init_tracing(default_level: &str) {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_level))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init()
            .ok();
    });
}
