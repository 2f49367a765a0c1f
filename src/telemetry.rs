//! Tracing setup.
//!
//! `RUST_LOG` wins over the configured level so operators can raise the
//! verbosity of a single target (e.g. `auth_proxy::sql=trace`).

use tracing_subscriber::EnvFilter;

/// Installs a global `fmt` subscriber filtered by `RUST_LOG` or `level`.
///
/// Only the first call installs anything; later calls leave the existing
/// subscriber in place.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}
