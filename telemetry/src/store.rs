//! The single place consumers read telemetry from.
//!
//! A [`TelemetryView`] is immutable once published. The polling task builds
//! the next view from the current one and swaps it in with one write, so a
//! reader always sees a snapshot together with the series derived in the
//! same cycle.

use crate::{
    cycle::{
        CycleReport,
        CycleStatus,
        SourceData,
    },
    log::LogEntry,
    metrics::{
        self,
        Windows,
    },
    model::{
        ApiCounters,
        ChartPoint,
        NetworkInfo,
        NetworkPoint,
        NetworkSummary,
        Peer,
        Snapshot,
    },
    scheduler::SchedulerState,
    source::SourceKind,
};
use chrono::{
    DateTime,
    Utc,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleSummary {
    pub sequence: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: CycleStatus,
    pub failed_sources: Vec<SourceKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetryView {
    pub snapshot: Option<Snapshot>,
    pub chart: Vec<ChartPoint>,
    pub network: Vec<NetworkPoint>,
    pub summary: NetworkSummary,
    pub peers: Vec<Peer>,
    pub network_info: Option<NetworkInfo>,
    pub api_counters: Option<ApiCounters>,
    pub log: Vec<LogEntry>,
    pub scheduler: SchedulerState,
    pub interval_ms: u64,
    pub last_cycle: Option<CycleSummary>,
    /// Set while the latest cycle lost both critical sources.
    pub last_error: Option<String>,
    pub cycles_completed: u64,
}

impl TelemetryView {
    /// The view that results from applying `report` on top of `self`.
    ///
    /// Snapshot and derived series are only replaced when both stats and
    /// history answered, so they always describe the same cycle. Other
    /// sources replace their own field when they answered and keep the
    /// previous value otherwise.
    pub fn with_cycle(&self, report: &CycleReport, windows: Windows) -> TelemetryView {
        let mut next = self.clone();

        if let (Some(SourceData::Stats(snapshot)), Some(SourceData::History(history))) =
            (report.data(SourceKind::Stats), report.data(SourceKind::History))
        {
            next.snapshot = Some(snapshot.clone());
            next.chart = metrics::derive_chart(history, windows.chart);
            next.network = metrics::derive_network(history, windows.network);
            next.summary = metrics::summarize_network(&next.network, &next.chart);
        }
        if let Some(SourceData::Peers(peers)) = report.data(SourceKind::Peers) {
            next.peers = peers.clone();
        }
        if let Some(SourceData::NetworkInfo(info)) = report.data(SourceKind::NetworkInfo) {
            next.network_info = Some(info.clone());
        }
        if let Some(SourceData::ApiCounters(counters)) = report.data(SourceKind::ApiCounters) {
            next.api_counters = Some(counters.clone());
        }

        let status = report.status();
        next.last_error = match status {
            CycleStatus::Failed => Some(
                report
                    .failures()
                    .filter(|(source, _)| source.is_critical())
                    .map(|(_, err)| err.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            CycleStatus::Complete | CycleStatus::Degraded => None,
        };
        next.last_cycle = Some(CycleSummary {
            sequence: report.sequence,
            started_at: report.started_at,
            finished_at: report.finished_at,
            status,
            failed_sources: report.failures().map(|(source, _)| source).collect(),
        });
        next.cycles_completed += 1;
        next
    }

    pub fn is_stale(&self) -> bool {
        self.last_error.is_some()
    }
}

/// Write side of the store. Owned by the polling task.
#[derive(Debug)]
pub struct SnapshotStore {
    sender: watch::Sender<Arc<TelemetryView>>,
}

/// Read side of the store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StoreReader {
    receiver: watch::Receiver<Arc<TelemetryView>>,
}

impl SnapshotStore {
    pub fn new(initial: TelemetryView) -> Self {
        let (sender, _) = watch::channel(Arc::new(initial));
        Self { sender }
    }

    pub fn current(&self) -> Arc<TelemetryView> {
        self.sender.borrow().clone()
    }

    pub fn replace(&self, view: TelemetryView) {
        self.sender.send_replace(Arc::new(view));
    }

    pub fn reader(&self) -> StoreReader {
        StoreReader {
            receiver: self.sender.subscribe(),
        }
    }
}

impl StoreReader {
    pub fn current(&self) -> Arc<TelemetryView> {
        self.receiver.borrow().clone()
    }

    /// Waits for the next published view. Returns `None` once the writer is gone.
    pub async fn changed(&mut self) -> Option<Arc<TelemetryView>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cycle::{
            run_cycle,
            tests::FakeFetcher,
        },
        model::HistoryRecord,
    };
    use pretty_assertions::assert_eq;

    async fn report(fetcher: &FakeFetcher) -> CycleReport {
        run_cycle(fetcher, &SourceKind::all(), 1).await
    }

    #[tokio::test]
    async fn complete_cycle_fills_every_field() {
        let view = TelemetryView::default().with_cycle(&report(&FakeFetcher::healthy()).await, Windows::default());

        assert_eq!(view.snapshot.as_ref().map(|s| s.height), Some(3));
        assert_eq!(view.chart.iter().map(|p| p.index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(view.network.len(), 2);
        assert_eq!(view.summary.average_block_time, 10.0);
        assert_eq!(view.peers.len(), 1);
        assert_eq!(view.network_info.as_ref().map(|i| i.protocol_version.as_str()), Some("1.0"));
        assert_eq!(view.api_counters.as_ref().map(|c| c.total_requests), Some(5));
        assert_eq!(view.last_error, None);
        assert_eq!(view.cycles_completed, 1);
    }

    #[tokio::test]
    async fn failed_history_keeps_previous_snapshot_and_series() {
        let previous = TelemetryView {
            snapshot: Some(Snapshot {
                height: 1,
                difficulty: 7.0,
                mempool_size: 0,
                total_blocks: 1,
                fetched_at: Utc::now(),
            }),
            chart: metrics::derive_chart(&[HistoryRecord::default()], 20),
            ..Default::default()
        };
        let fetcher = FakeFetcher::healthy();
        fetcher.fail(SourceKind::History, 503);

        let view = previous.with_cycle(&report(&fetcher).await, Windows::default());
        assert_eq!(view.snapshot, previous.snapshot);
        assert_eq!(view.chart, previous.chart);
        assert_eq!(view.peers.len(), 1);
        assert_eq!(view.last_error, None);
        assert_eq!(
            view.last_cycle.as_ref().map(|c| (c.status, c.failed_sources.clone())),
            Some((CycleStatus::Degraded, vec![SourceKind::History]))
        );
    }

    #[tokio::test]
    async fn failed_stats_keeps_series_with_previous_snapshot() {
        let previous = TelemetryView::default().with_cycle(&report(&FakeFetcher::healthy()).await, Windows::default());
        let fetcher = FakeFetcher::healthy();
        fetcher.fail(SourceKind::Stats, 500);
        fetcher.answer(
            SourceKind::History,
            serde_json::json!({ "blocks": [
                { "index": 9, "timestamp": 1_700_000_090_000u64, "difficulty": 300, "transactions": [{}, {}, {}] },
                { "index": 8, "timestamp": 1_700_000_085_000u64, "difficulty": 300 },
            ] }),
        );

        let view = previous.with_cycle(&report(&fetcher).await, Windows::default());
        assert_eq!(view.snapshot, previous.snapshot);
        assert_eq!(view.chart, previous.chart);
        assert_eq!(view.network, previous.network);
        assert_eq!(view.summary, previous.summary);
        assert_eq!(view.last_error, None);
        assert_eq!(
            view.last_cycle.as_ref().map(|c| (c.status, c.failed_sources.clone())),
            Some((CycleStatus::Degraded, vec![SourceKind::Stats]))
        );
    }

    #[tokio::test]
    async fn failed_cycle_sets_error_indicator_until_next_success() {
        let fetcher = FakeFetcher::healthy();
        let first = TelemetryView::default().with_cycle(&report(&fetcher).await, Windows::default());

        fetcher.fail(SourceKind::Stats, 500);
        fetcher.fail(SourceKind::History, 500);
        let failed = first.with_cycle(&report(&fetcher).await, Windows::default());
        assert!(failed.is_stale());
        assert_eq!(failed.snapshot, first.snapshot);
        assert_eq!(failed.network, first.network);

        let healthy = FakeFetcher::healthy();
        let recovered = failed.with_cycle(&report(&healthy).await, Windows::default());
        assert!(!recovered.is_stale());
        assert_eq!(recovered.cycles_completed, 3);
    }

    #[tokio::test]
    async fn failed_non_critical_sources_keep_prior_values() {
        let first = TelemetryView::default().with_cycle(&report(&FakeFetcher::healthy()).await, Windows::default());
        let fetcher = FakeFetcher::healthy();
        fetcher.fail(SourceKind::Peers, 500);
        fetcher.fail(SourceKind::ApiCounters, 500);
        fetcher.answer(SourceKind::Stats, serde_json::json!({ "height": 4 }));

        let next = first.with_cycle(&report(&fetcher).await, Windows::default());
        assert_eq!(next.snapshot.as_ref().map(|s| s.height), Some(4));
        assert_eq!(next.peers, first.peers);
        assert_eq!(next.api_counters, first.api_counters);
        assert_eq!(next.last_error, None);
    }

    #[tokio::test]
    async fn readers_see_whole_views() {
        let store = SnapshotStore::new(TelemetryView::default());
        let mut reader = store.reader();
        assert_eq!(reader.current().cycles_completed, 0);

        let next = store.current().with_cycle(&report(&FakeFetcher::healthy()).await, Windows::default());
        store.replace(next);

        let seen = reader.changed().await.unwrap();
        assert_eq!(seen.cycles_completed, 1);
        assert!(seen.snapshot.is_some() && !seen.chart.is_empty());

        drop(store);
        assert!(reader.changed().await.is_none());
    }
}
