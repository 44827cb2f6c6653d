//! Subscriber setup for the `gateflag` binary.

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global `tracing` subscriber writing to stderr.
///
/// `RUST_LOG` wins unless `verbose` is set; the default level is `info`.
pub fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json { builder.json().try_init() } else { builder.try_init() };
}
