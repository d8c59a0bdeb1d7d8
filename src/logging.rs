use eyre::{
    Context as _,
    Result,
};
use ledger_telemetry_config::Config;
use std::sync::Mutex;
use tracing_subscriber::{
    fmt,
    prelude::*,
    EnvFilter,
};

lazy_static::lazy_static! {
    static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME"));
}

/// Logs to stderr and to a file in the data directory. `RUST_LOG` overrides
/// the default filter.
pub fn log_init(config: &Config) -> Result<()> {
    let directory = config.data_dir();
    std::fs::create_dir_all(directory).context("Failed to create directory")?;
    let log_path = directory.join(LOG_FILE.clone());
    let log_file = std::fs::File::create(&log_path)
        .wrap_err_with(|| format!("Failed to create log file {}", log_path.display()))?;

    let level = if config.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "ledger_telemetry={level},ledger_telemetry_core={level},ledger_telemetry_config={level},reqwest=warn"
        ))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_error::ErrorLayer::default())
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(fmt::layer().with_writer(Mutex::new(log_file)).with_ansi(false))
        .try_init()
        .context("Failed to initialize tracing subscriber")
}
