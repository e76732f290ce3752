//! Structured logging configuration.
//!
//! The game library logs through the `log` facade. The subscriber installed
//! here bridges those records into `tracing`, so library and server output
//! share one filter and one format.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,tower_http=warn,hyper=warn";

/// Initialize structured logging
///
/// Log levels are configurable via the RUST_LOG env var.
///
/// # Example
///
/// ```no_run
/// use sb_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // Console layer for development
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a connection lifecycle event with structured data
///
/// # Arguments
///
/// * `event_type` - `opened`, `closed`, `stalled` and so on
/// * `connection` - Connection id, once one has been assigned
/// * `seat` - Seat the connection held, if any
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use sb_server::logging::log_connection_event;
///
/// log_connection_event("closed", None, Some(2), "Client went away");
/// ```
pub fn log_connection_event(
    event_type: &str,
    connection: Option<&str>,
    seat: Option<usize>,
    message: &str,
) {
    if event_type == "stalled" {
        tracing::warn!(
            event_type = event_type,
            connection = connection,
            seat = seat,
            "CONNECTION: {}",
            message
        );
    } else {
        tracing::debug!(
            event_type = event_type,
            connection = connection,
            seat = seat,
            "CONNECTION: {}",
            message
        );
    }
}
