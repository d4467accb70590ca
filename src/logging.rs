//! Log output setup for applications and tests using this crate.

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Install a formatting subscriber on stderr.
///
/// `RUST_LOG` takes precedence; otherwise `debug` selects DEBUG and the
/// default is INFO. Returns `false` when a global subscriber already exists.
pub fn init(debug: bool) -> bool {
    let log_level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
