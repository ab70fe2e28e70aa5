//! Diagnostic logging setup for the command-line tool

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for a verbosity setting
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "asn_collector=debug"
    } else {
        "asn_collector=warn"
    }
}

/// Install a compact stderr logger
///
/// `RUST_LOG` takes precedence over the verbosity flag. Stdout stays
/// reserved for progress lines.
pub fn init_cli_logger(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}
