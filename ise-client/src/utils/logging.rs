use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset: per-frame detail for this crate, warnings elsewhere
pub const DEFAULT_FILTER: &str = "ise_client=debug,warn";

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides [`DEFAULT_FILTER`]. Session logs carry the state
/// name, frame counts and service codes as structured fields; signed URLs
/// are logged without their query string.
///
/// Safe to call more than once (tests, demo and host application may all
/// call it); only the first call installs a subscriber.
///
/// # Example
///
/// ```no_run
/// use ise_client::utils::logging::init_logging;
///
/// init_logging();
/// ```
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init();

    match installed {
        Ok(()) => tracing::info!(filter = DEFAULT_FILTER, "Assessment client logging ready"),
        Err(_) => tracing::debug!("Subscriber already installed, keeping it"),
    }
}
