use clap::Parser;
use color_eyre::Result;
use ledger_telemetry::{
    init_errors,
    logging,
    App,
    Args,
    Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_errors()?;
    let config = Config::new(Args::parse())?;
    logging::log_init(&config)?;
    App::new(config)?.run().await
}
