//! Logging setup
//!
//! `RUST_LOG` overrides the default filter. Debug builds log pretty,
//! human-readable lines; release builds emit one JSON object per event.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
#[must_use]
pub const fn default_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "debug,shop_dashboard=trace"
    } else {
        "info"
    }
}

/// Install the global tracing subscriber
///
/// # Example
///
/// ```rust,no_run
/// # fn main() -> anyhow::Result<()> {
/// shop_dashboard::observability::init()?;
/// tracing::info!("Service starting");
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter()));

    #[cfg(debug_assertions)]
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().pretty())
        .try_init()?;

    #[cfg(not(debug_assertions))]
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()?;

    Ok(())
}
