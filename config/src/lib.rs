mod app_config;
mod args;
mod report_format;

use app_config::AppConfig;
pub use app_config::{
    get_config_dir,
    get_data_dir,
};
pub use args::Args;
use color_eyre::Result;
use eyre::{
    ensure,
    Context as _,
};
pub use report_format::ReportFormat;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten, skip_serializing)]
    pub app_config: AppConfig,
    pub node_url: url::Url,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub history_limit: u32,
    pub chart_window: usize,
    pub network_window: usize,
    pub log_capacity: usize,
    #[serde(default)]
    pub report_format: ReportFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    #[serde(default)]
    pub once: bool,
    #[serde(default)]
    pub verbose: bool,
}

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

impl Default for Config {
    fn default() -> Self {
        serde_yml::from_str(DEFAULT_CONFIG).expect("Failed to parse default config")
    }
}

impl Config {
    /// Layers, lowest priority first: built-in defaults, `config.yaml` in the
    /// config directory, `LEDGER_TELEMETRY_*` environment variables, CLI args.
    pub fn new(args: Args) -> Result<Self> {
        Self::load(args, &get_config_dir(), &get_data_dir())
    }

    fn load(args: Args, config_dir: &Path, data_dir: &Path) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("data_dir", data_dir.display().to_string())?
            .set_default("config_dir", config_dir.display().to_string())?
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml));

        let config_files = [("config.yaml", config::FileFormat::Yaml)];

        for (file, format) in &config_files {
            let source = config::File::from(config_dir.join(file))
                .format(*format)
                .required(false);
            builder = builder.add_source(source);
        }

        builder = builder
            .add_source(config::Environment::with_prefix(&app_config::PROJECT_NAME).try_parsing(true))
            .add_source(args);

        let cfg: Self = builder
            .build()?
            .try_deserialize()
            .context("Failed to read configuration")?;
        cfg.validate()?;

        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.poll_interval_ms > 0, "poll_interval_ms must be greater than zero");
        ensure!(self.request_timeout_ms > 0, "request_timeout_ms must be greater than zero");
        ensure!(self.history_limit > 0, "history_limit must be greater than zero");
        ensure!(self.chart_window > 0, "chart_window must be greater than zero");
        ensure!(self.network_window > 1, "network_window needs at least two blocks");
        ensure!(self.log_capacity > 0, "log_capacity must be greater than zero");
        ensure!(
            matches!(self.node_url.scheme(), "http" | "https"),
            "node_url must be an http(s) URL, got {}",
            self.node_url
        );
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn data_dir(&self) -> &Path {
        &self.app_config.data_dir
    }

    pub fn config_dir(&self) -> &Path {
        &self.app_config.config_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use temp_dir::TempDir;

    fn load(args: Args, config_yaml: Option<&str>) -> Result<Config> {
        let dir = TempDir::new().unwrap();
        if let Some(yaml) = config_yaml {
            std::fs::write(dir.path().join("config.yaml"), yaml).unwrap();
        }
        Config::load(args, dir.path(), dir.path())
    }

    #[test]
    fn defaults() {
        let config = load(Args::default(), None).unwrap();
        assert_eq!(config.node_url.as_str(), "http://localhost:3000/");
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.history_limit, 50);
        assert_eq!((config.chart_window, config.network_window), (20, 10));
        assert_eq!(config.log_capacity, 100);
        assert_eq!(config.report_format, ReportFormat::Table);
        assert!(!config.once);
    }

    #[test]
    fn config_file_overrides_defaults() {
        let config = load(Args::default(), Some("poll_interval_ms: 2000\nreport_format: json\n")).unwrap();
        assert_eq!(config.poll_interval_ms, 2000);
        assert_eq!(config.report_format, ReportFormat::Json);
    }

    #[test]
    fn args_override_config_file() {
        let args = Args {
            node_url: Some("https://proxy.example/ledger".to_string()),
            interval: Some(Duration::from_millis(750)),
            once: true,
            ..Default::default()
        };
        let config = load(args, Some("poll_interval_ms: 2000\n")).unwrap();
        assert_eq!(config.node_url.as_str(), "https://proxy.example/ledger");
        assert_eq!(config.poll_interval_ms, 750);
        assert!(config.once);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = load(Args::default(), Some("poll_interval_ms: 0\n")).unwrap_err();
        assert!(err.to_string().contains("poll_interval_ms"));
    }

    #[test]
    fn non_http_url_is_rejected() {
        let args = Args {
            node_url: Some("ftp://node".to_string()),
            ..Default::default()
        };
        assert!(load(args, None).is_err());
    }

    #[test]
    fn default_matches_embedded_yaml() {
        let config = Config::default();
        assert_eq!(config.poll_interval_ms, 5000);
        assert_eq!(config.output_file, None);
    }
}
