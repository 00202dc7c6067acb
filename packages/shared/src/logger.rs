//! Logging setup utilities for the LU-Connect binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// `crates` lists the crate targets that should log at `default_log_level`
/// (e.g. the library crate and the binary). The filter can be overridden
/// with the `RUST_LOG` environment variable.
///
/// # Examples
///
/// ```no_run
/// use luconnect_shared::logger::setup_logger;
///
/// setup_logger(&["luconnect_server", "luconnect_server_bin"], "debug");
/// ```
pub fn setup_logger(crates: &[&str], default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(crates, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build an `EnvFilter` directive such as `a=info,b=info,tower_http=info`.
fn default_filter(crates: &[&str], default_log_level: &str) -> String {
    crates
        .iter()
        .chain(std::iter::once(&"tower_http"))
        .map(|name| format!("{}={}", name.replace('-', "_"), default_log_level))
        .collect::<Vec<_>>()
        .join(",")
}
