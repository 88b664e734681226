use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
pub use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_LOG_LEVEL: &str =
    "info,builder_desk_backend=debug,builder_desk_database=debug,hyper=info,h2=info";

/// Installs the global subscriber. `RUST_LOG` replaces the default directives.
pub fn setup_telemetry() -> Result<(), TryInitError> {
    let stdout_log = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(
            stdout_log.with_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into()),
            ),
        )
        .try_init()?;

    info!("telemetry initialized");
    Ok(())
}
