//! Periodic polling of the node.
//!
//! [`PollingScheduler`] is a handle to a single task that owns the
//! diagnostic log and the write side of the store. Commands are sent to the
//! task over a channel, so every mutation of the published view happens in
//! one place.
//!
//! Overlapping cycles are never run: a tick or manual trigger that arrives
//! while the previous cycle is still in flight is skipped and reported as a
//! warning. `stop` bumps the epoch; cycles of an older epoch still run to
//! completion but their results are dropped.

use crate::{
    cycle::{
        run_cycle,
        CycleReport,
    },
    error::SchedulerError,
    log::{
        DiagnosticLog,
        Severity,
        DEFAULT_LOG_CAPACITY,
    },
    metrics::Windows,
    source::{
        SourceFetcher,
        SourceKind,
    },
    store::{
        SnapshotStore,
        StoreReader,
        TelemetryView,
    },
};
use futures::{
    future::BoxFuture,
    stream::FuturesUnordered,
    StreamExt as _,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    sync::Arc,
    time::Duration,
};
use strum::Display;
use tokio::{
    sync::mpsc::{
        unbounded_channel,
        UnboundedReceiver,
        UnboundedSender,
    },
    time::{
        interval_at,
        Instant,
        Interval,
        MissedTickBehavior,
    },
};
use tokio_util::sync::{
    CancellationToken,
    DropGuard,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    #[default]
    Idle,
    Running,
}

#[derive(Debug, Clone, Display)]
pub enum SchedulerMessage {
    Start(Duration),
    Stop,
    SetInterval(Duration),
    TriggerNow,
    ClearLog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
enum Trigger {
    Start,
    Timer,
    Manual,
}

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub sources: Vec<SourceKind>,
    pub windows: Windows,
    pub log_capacity: usize,
    pub interval: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            sources: SourceKind::all(),
            windows: Windows::default(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Handle to the polling task. Dropping the last clone cancels the task.
#[derive(Debug, Clone)]
pub struct PollingScheduler {
    sender: UnboundedSender<SchedulerMessage>,
    reader: StoreReader,
    _task_guard: Arc<DropGuard>,
}

impl PollingScheduler {
    /// Spawns the polling task in the `Idle` state.
    pub fn spawn(fetcher: Arc<dyn SourceFetcher>, options: SchedulerOptions) -> Self {
        let (sender, receiver) = unbounded_channel();
        let token = CancellationToken::new();
        let task_guard = token.clone().drop_guard();

        let poller = Poller::new(fetcher, options);
        let reader = poller.store.reader();

        tokio::task::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {},
                _ = poller.run(receiver) => {},
            }
            debug!("Polling task stopped");
        });

        Self {
            sender,
            reader,
            _task_guard: Arc::new(task_guard),
        }
    }

    pub fn start(&self, interval: Duration) -> Result<(), SchedulerError> {
        self.send(SchedulerMessage::Start(non_zero(interval)?))
    }

    pub fn stop(&self) -> Result<(), SchedulerError> {
        self.send(SchedulerMessage::Stop)
    }

    pub fn set_interval(&self, interval: Duration) -> Result<(), SchedulerError> {
        self.send(SchedulerMessage::SetInterval(non_zero(interval)?))
    }

    pub fn trigger_now(&self) -> Result<(), SchedulerError> {
        self.send(SchedulerMessage::TriggerNow)
    }

    pub fn clear_log(&self) -> Result<(), SchedulerError> {
        self.send(SchedulerMessage::ClearLog)
    }

    pub fn current(&self) -> Arc<TelemetryView> {
        self.reader.current()
    }

    pub fn subscribe(&self) -> StoreReader {
        self.reader.clone()
    }

    fn send(&self, message: SchedulerMessage) -> Result<(), SchedulerError> {
        self.sender.send(message).map_err(|_| SchedulerError::Closed)
    }
}

fn non_zero(interval: Duration) -> Result<Duration, SchedulerError> {
    if interval.is_zero() {
        Err(SchedulerError::ZeroInterval)
    } else {
        Ok(interval)
    }
}

/// State owned by the polling task.
struct Poller {
    fetcher: Arc<dyn SourceFetcher>,
    sources: Arc<[SourceKind]>,
    windows: Windows,
    log: DiagnosticLog,
    store: SnapshotStore,
    state: SchedulerState,
    interval: Duration,
    timer: Option<Interval>,
    epoch: u64,
    sequence: u64,
    /// A cycle of the current epoch is in flight.
    busy: bool,
    in_flight: FuturesUnordered<BoxFuture<'static, (u64, CycleReport)>>,
}

impl Poller {
    fn new(fetcher: Arc<dyn SourceFetcher>, options: SchedulerOptions) -> Self {
        let store = SnapshotStore::new(TelemetryView {
            interval_ms: options.interval.as_millis() as u64,
            ..Default::default()
        });
        Self {
            fetcher,
            sources: options.sources.into(),
            windows: options.windows,
            log: DiagnosticLog::new(options.log_capacity),
            store,
            state: SchedulerState::Idle,
            interval: options.interval,
            timer: None,
            epoch: 0,
            sequence: 0,
            busy: false,
            in_flight: FuturesUnordered::new(),
        }
    }

    async fn run(mut self, mut receiver: UnboundedReceiver<SchedulerMessage>) {
        loop {
            tokio::select! {
                message = receiver.recv() => match message {
                    Some(message) => self.handle(message),
                    None => break,
                },
                Some((epoch, report)) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.complete(epoch, report);
                }
                _ = tick(&mut self.timer) => self.launch(Trigger::Timer),
            }
        }
    }

    fn handle(&mut self, message: SchedulerMessage) {
        debug!(%message, state = %self.state, "Scheduler message");
        match message {
            SchedulerMessage::Start(interval) => {
                if self.state == SchedulerState::Running {
                    debug!("Start ignored, already running");
                    return;
                }
                self.state = SchedulerState::Running;
                self.interval = interval;
                self.new_epoch();
                self.log.append(
                    format!("Polling started, every {}", humanize(interval)),
                    Severity::Info,
                );
                self.launch(Trigger::Start);
                self.reset_timer();
            }
            SchedulerMessage::Stop => {
                if self.state == SchedulerState::Idle {
                    debug!("Stop ignored, not running");
                    return;
                }
                self.state = SchedulerState::Idle;
                self.timer = None;
                self.new_epoch();
                self.log.append("Polling stopped", Severity::Info);
            }
            SchedulerMessage::SetInterval(interval) => {
                self.interval = interval;
                if self.state == SchedulerState::Running {
                    self.reset_timer();
                }
                self.log.append(
                    format!("Poll interval changed to {}", humanize(interval)),
                    Severity::Info,
                );
            }
            SchedulerMessage::TriggerNow => {
                self.log.append("Manual refresh requested", Severity::Info);
                self.launch(Trigger::Manual);
            }
            SchedulerMessage::ClearLog => self.log.clear(),
        }
        self.publish_lifecycle();
    }

    fn new_epoch(&mut self) {
        self.epoch += 1;
        self.busy = false;
    }

    /// Replaces the timer; the old one is dropped so it can never fire again.
    fn reset_timer(&mut self) {
        let mut timer = interval_at(Instant::now() + self.interval, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.timer = Some(timer);
    }

    fn launch(&mut self, trigger: Trigger) {
        if self.busy {
            self.log.append(
                format!("Skipped {trigger} refresh, previous cycle still in flight"),
                Severity::Warning,
            );
            if trigger == Trigger::Timer {
                self.publish_lifecycle();
            }
            return;
        }

        self.busy = true;
        self.sequence += 1;
        let (epoch, sequence) = (self.epoch, self.sequence);
        let fetcher = self.fetcher.clone();
        let sources = self.sources.clone();
        debug!(epoch, sequence, %trigger, "Launching cycle");

        self.in_flight.push(Box::pin(async move {
            let report = run_cycle(fetcher.as_ref(), &sources, sequence).await;
            (epoch, report)
        }));
    }

    fn complete(&mut self, epoch: u64, report: CycleReport) {
        if epoch != self.epoch {
            debug!(epoch, current = self.epoch, sequence = report.sequence, "Discarding stale cycle");
            return;
        }
        self.busy = false;

        for (message, severity) in report.diagnostics() {
            self.log.append(message, severity);
        }

        let mut view = self.store.current().with_cycle(&report, self.windows);
        view.log = self.log.list(None);
        view.scheduler = self.state;
        view.interval_ms = self.interval.as_millis() as u64;
        info!(
            sequence = report.sequence,
            status = %report.status(),
            height = ?view.snapshot.as_ref().map(|s| s.height),
            "Cycle applied"
        );
        self.store.replace(view);
    }

    /// Publishes log and scheduler changes without touching cycle data.
    fn publish_lifecycle(&self) {
        let mut view = (*self.store.current()).clone();
        view.log = self.log.list(None);
        view.scheduler = self.state;
        view.interval_ms = self.interval.as_millis() as u64;
        self.store.replace(view);
    }
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn humanize(interval: Duration) -> String {
    if interval.subsec_millis() == 0 {
        format!("{}s", interval.as_secs())
    } else {
        format!("{}ms", interval.as_millis())
    }
}
