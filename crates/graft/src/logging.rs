use tracing_log::LogTracer;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `log` records from graft-core are bridged through `LogTracer`. `RUST_LOG`
/// overrides `default_level` when set. Output goes to stderr so command
/// output on stdout stays machine-readable.
pub fn init(default_level: &str) -> Result<(), String> {
    LogTracer::init().map_err(|e| format!("Failed to bridge log records: {}", e))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| format!("Invalid log level '{}': {}", default_level, e))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| format!("Failed to initialize logging: {}", e))
}
