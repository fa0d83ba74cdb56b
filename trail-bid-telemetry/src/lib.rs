use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer};

#[derive(thiserror::Error, Debug)]
pub enum TelemetryError {
    #[error("failed to install log subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Filter used when `RUST_LOG` is not set.
#[must_use]
pub const fn default_directives(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn,trail_bid_engine=info,trail_bid_ingest=info,trail_bid_cli=info",
        1 => "warn,trail_bid_engine=debug,trail_bid_ingest=debug,trail_bid_cli=debug",
        _ => "info,trail_bid_engine=trace,trail_bid_ingest=trace,trail_bid_cli=trace",
    }
}

/// Installs the global subscriber: a `fmt` layer on stderr, filtered by
/// `RUST_LOG` or else by `verbosity`. Call once, from the binary.
pub fn setup_logging(verbosity: u8) -> Result<(), TelemetryError> {
    let stderr_log = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(
            stderr_log.with_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| default_directives(verbosity).into()),
            ),
        )
        .try_init()?;
    Ok(())
}
