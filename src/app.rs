use crate::report::Reporter;
use color_eyre::Result;
use eyre::Context as _;
use ledger_telemetry_config::Config;
use ledger_telemetry_core::{
    HttpFetcher,
    PollingScheduler,
    SchedulerOptions,
    SourceKind,
    TelemetryView,
    Windows,
};
use std::sync::Arc;

pub struct App {
    config: Config,
    scheduler: PollingScheduler,
    reporter: Reporter,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.node_url.clone(), config.request_timeout(), config.history_limit)
            .context("Failed to build HTTP client")?;
        let options = SchedulerOptions {
            sources: SourceKind::all(),
            windows: Windows {
                chart: config.chart_window,
                network: config.network_window,
            },
            log_capacity: config.log_capacity,
            interval: config.poll_interval(),
        };
        let scheduler = PollingScheduler::spawn(Arc::new(fetcher), options);

        Ok(Self {
            reporter: Reporter::new(config.report_format),
            config,
            scheduler,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        debug!(
            config_dir = %self.config.config_dir().display(),
            data_dir = %self.config.data_dir().display(),
            interval_ms = self.config.poll_interval_ms,
            timeout_ms = self.config.request_timeout_ms,
            history_limit = self.config.history_limit,
            format = %self.config.report_format,
            "Loaded config"
        );
        info!(node_url = %self.config.node_url, "Polling ledger node");
        let mut updates = self.scheduler.subscribe();

        if self.config.once {
            self.scheduler.trigger_now()?;
            loop {
                let Some(view) = updates.changed().await else {
                    eyre::bail!("Polling task stopped unexpectedly");
                };
                self.show(&view)?;
                if view.cycles_completed > 0 {
                    return self.export(&view);
                }
            }
        }

        self.scheduler.start(self.config.poll_interval())?;
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                result = &mut ctrl_c => {
                    result.context("Failed to listen for Ctrl-C")?;
                    info!("Stopping");
                    self.scheduler.stop()?;
                    break;
                }
                view = updates.changed() => {
                    let Some(view) = view else {
                        eyre::bail!("Polling task stopped unexpectedly");
                    };
                    self.show(&view)?;
                }
            }
        }

        self.export(&self.scheduler.current())
    }

    fn show(&mut self, view: &TelemetryView) -> Result<()> {
        if let Some(text) = self.reporter.render(view)? {
            println!("{text}");
        }
        Ok(())
    }

    fn export(&self, view: &TelemetryView) -> Result<()> {
        let Some(path) = &self.config.output_file else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(view)?;
        std::fs::write(path, json).wrap_err_with(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Wrote telemetry export");
        Ok(())
    }
}
