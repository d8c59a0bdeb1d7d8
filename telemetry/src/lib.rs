//! # Ledger Telemetry Core
//!
//! Polls a ledger node's REST API and turns what it answers into data that a
//! dashboard can draw:
//!
//! - **`normalizer`**: raw payloads into canonical records with defaults
//! - **`metrics`**: chart and network series over a trailing window
//! - **`log`**: bounded, classified diagnostic log
//! - **`scheduler`**: start/stop/interval/trigger lifecycle of the polling task
//! - **`store`**: the consistent view consumers read from
//!
//! ```no_run
//! # async fn run() -> eyre::Result<()> {
//! use ledger_telemetry_core::{HttpFetcher, PollingScheduler, SchedulerOptions};
//! use std::{sync::Arc, time::Duration};
//!
//! let fetcher = HttpFetcher::new("http://localhost:3000".parse()?, Duration::from_secs(10), 50)?;
//! let scheduler = PollingScheduler::spawn(Arc::new(fetcher), SchedulerOptions::default());
//! scheduler.start(Duration::from_secs(5))?;
//! let mut updates = scheduler.subscribe();
//! while let Some(view) = updates.changed().await {
//!     println!("height: {:?}", view.snapshot.as_ref().map(|s| s.height));
//! }
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate tracing;

pub mod cycle;
pub mod error;
pub mod log;
pub mod metrics;
pub mod model;
pub mod normalizer;
pub mod scheduler;
pub mod source;
pub mod store;

pub use cycle::{
    CycleReport,
    CycleStatus,
};
pub use error::{
    SchedulerError,
    SourceError,
};
pub use log::{
    DiagnosticLog,
    LogEntry,
    Severity,
};
pub use metrics::Windows;
pub use model::*;
pub use scheduler::{
    PollingScheduler,
    SchedulerOptions,
    SchedulerState,
};
pub use source::{
    HttpFetcher,
    SourceFetcher,
    SourceKind,
};
pub use store::{
    StoreReader,
    TelemetryView,
};
