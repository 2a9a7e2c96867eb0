//! Process-wide `tracing` subscriber for the binaries.

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise `info` for everything. `log` records (actix's
/// access logger) are forwarded into the same subscriber.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
