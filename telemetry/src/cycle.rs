//! One fetch cycle: every source requested concurrently, each outcome typed
//! and kept independently.

use crate::{
    error::SourceError,
    log::Severity,
    model::{
        ApiCounters,
        HistoryPage,
        HistoryRecord,
        NetworkInfo,
        Peer,
        PeerList,
        Snapshot,
    },
    normalizer,
    source::{
        SourceFetcher,
        SourceKind,
    },
};
use chrono::{
    DateTime,
    Utc,
};
use futures::future::join_all;
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use std::time::{
    Duration,
    Instant,
};
use strum::Display;
use tracing::instrument;

/// Decoded payload of a source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceData {
    Stats(Snapshot),
    History(Vec<HistoryRecord>),
    NetworkInfo(NetworkInfo),
    Peers(Vec<Peer>),
    ApiCounters(ApiCounters),
}

#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub source: SourceKind,
    pub result: Result<SourceData, SourceError>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CycleStatus {
    /// Every source answered.
    Complete,
    /// Some sources failed but at least one critical source answered.
    Degraded,
    /// Both critical sources failed.
    Failed,
}

/// Aggregate of all source outcomes of one cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub sequence: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<SourceOutcome>,
}

impl CycleReport {
    pub fn outcome(&self, source: SourceKind) -> Option<&SourceOutcome> {
        self.outcomes.iter().find(|o| o.source == source)
    }

    pub fn data(&self, source: SourceKind) -> Option<&SourceData> {
        self.outcome(source).and_then(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (SourceKind, &SourceError)> + '_ {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|err| (o.source, err)))
    }

    pub fn succeeded(&self) -> impl Iterator<Item = SourceKind> + '_ {
        self.outcomes.iter().filter(|o| o.result.is_ok()).map(|o| o.source)
    }

    /// A source that was not requested does not count as failed.
    pub fn status(&self) -> CycleStatus {
        let critical_failed = self.failures().filter(|(source, _)| source.is_critical()).count();
        let critical_requested = self.outcomes.iter().filter(|o| o.source.is_critical()).count();

        if critical_requested > 0 && critical_failed == critical_requested {
            CycleStatus::Failed
        } else if self.failures().next().is_some() {
            CycleStatus::Degraded
        } else {
            CycleStatus::Complete
        }
    }

    /// Diagnostic entries describing this cycle: one `error` per failed
    /// source, then one `success` naming the sources that answered.
    pub fn diagnostics(&self) -> Vec<(String, Severity)> {
        let mut entries = self
            .failures()
            .map(|(source, err)| (format!("Failed to fetch {}: {err}", source.label()), Severity::Error))
            .collect::<Vec<_>>();

        let succeeded = self.succeeded().map(|s| s.label()).collect::<Vec<_>>();
        if !succeeded.is_empty() {
            entries.push((format!("Fetched {}", succeeded.join(", ")), Severity::Success));
        }
        entries
    }
}

/// Fetch all `sources` concurrently and wait until every request settled.
#[instrument(level = "debug", skip(fetcher, sources), fields(sources = sources.len()))]
pub async fn run_cycle(fetcher: &dyn SourceFetcher, sources: &[SourceKind], sequence: u64) -> CycleReport {
    let started_at = Utc::now();

    let outcomes = join_all(sources.iter().map(|&source| async move {
        let start = Instant::now();
        let result = fetcher.fetch(source).await.and_then(|raw| decode(source, raw));
        let elapsed = start.elapsed();
        match &result {
            Ok(_) => debug!(%source, ?elapsed, "source fetched"),
            Err(err) => debug!(%source, kind = err.kind(), "source failed: {err}"),
        }
        SourceOutcome {
            source,
            result,
            elapsed,
        }
    }))
    .await;

    CycleReport {
        sequence,
        started_at,
        finished_at: Utc::now(),
        outcomes,
    }
}

fn decode(source: SourceKind, raw: Value) -> Result<SourceData, SourceError> {
    let parse_error = |reason: String| SourceError::Parse {
        url: source.path().to_string(),
        reason,
    };

    Ok(match source {
        SourceKind::Stats => {
            if !raw.is_object() {
                return Err(parse_error(format!("expected an object, got {raw}")));
            }
            SourceData::Stats(normalizer::normalize(&raw, Utc::now()))
        }
        SourceKind::History => {
            let page: HistoryPage = serde_json::from_value(raw).map_err(|err| parse_error(err.to_string()))?;
            SourceData::History(page.blocks)
        }
        SourceKind::NetworkInfo => SourceData::NetworkInfo(normalizer::normalize_network_info(&raw)),
        SourceKind::Peers => {
            let list: PeerList = serde_json::from_value(raw).map_err(|err| parse_error(err.to_string()))?;
            SourceData::Peers(list.peers.iter().map(normalizer::normalize_peer).collect())
        }
        SourceKind::ApiCounters => SourceData::ApiCounters(normalizer::normalize_api_counters(&raw)),
    })
}
