use crate::{
    get_config_dir,
    get_data_dir,
    ReportFormat,
};
use clap::Parser;
use std::{
    path::PathBuf,
    time::Duration,
};

/// Ledger node telemetry poller
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    /// Base URL of the node (or of the proxy forwarding to it).
    #[clap(long, env = "LEDGER_TELEMETRY_NODE_URL", value_name = "URL")]
    pub node_url: Option<String>,

    /// Time between poll cycles (e.g. "5s", "500ms", "1m").
    #[clap(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Per request timeout (e.g. "10s").
    #[clap(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Number of blocks requested from the history endpoint.
    #[clap(long, value_name = "N")]
    pub history_limit: Option<u32>,

    /// Output for each update: table, json or log.
    #[clap(long, value_name = "FORMAT")]
    pub format: Option<ReportFormat>,

    /// Write the final view as JSON to this file on exit.
    #[clap(long, value_name = "FILE")]
    pub output_file: Option<PathBuf>,

    /// Run a single cycle, print it and exit.
    #[clap(long, action)]
    pub once: bool,

    /// Enables debug logging.
    #[clap(short, long, action)]
    pub verbose: bool,
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(node_url) = &self.node_url {
                cache.insert("node_url".to_string(), node_url.clone().into());
            }
            if let Some(interval) = &self.interval {
                cache.insert("poll_interval_ms".to_string(), (interval.as_millis() as u64).into());
            }
            if let Some(timeout) = &self.timeout {
                cache.insert("request_timeout_ms".to_string(), (timeout.as_millis() as u64).into());
            }
            if let Some(history_limit) = self.history_limit {
                cache.insert("history_limit".to_string(), (history_limit as u64).into());
            }
            if let Some(format) = self.format {
                cache.insert("report_format".to_string(), format.to_string().into());
            }
            if let Some(output_file) = &self.output_file {
                cache.insert("output_file".to_string(), output_file.display().to_string().into());
            }
            if self.once {
                cache.insert("once".to_string(), true.into());
            }
            if self.verbose {
                cache.insert("verbose".to_string(), true.into());
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let author = clap::crate_authors!();
    let config_dir_path = get_config_dir().display().to_string();
    let data_dir_path = get_data_dir().display().to_string();

    format!(
        "{}

Authors: {author}

Config directory: {config_dir_path}
Data directory: {data_dir_path}",
        env!("CARGO_PKG_VERSION")
    )
}
