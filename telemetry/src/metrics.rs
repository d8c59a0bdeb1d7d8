//! Chart-ready series derived from a page of history records.
//!
//! History arrives newest first. Both derivations take the trailing window
//! of the most recent records and turn it into chronological order before
//! computing anything, so the first point is always the oldest block.

use crate::model::{
    ChartPoint,
    HistoryRecord,
    NetworkPoint,
    NetworkSummary,
};

pub const CHART_WINDOW: usize = 20;
pub const NETWORK_WINDOW: usize = 10;

/// Lower bound for the block time used as the rate denominator, in seconds.
pub const MIN_BLOCK_TIME_SECS: f64 = 0.1;

/// Trailing window sizes of the two derived series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Windows {
    pub chart: usize,
    pub network: usize,
}

impl Default for Windows {
    fn default() -> Self {
        Self {
            chart: CHART_WINDOW,
            network: NETWORK_WINDOW,
        }
    }
}

/// The `window` most recent records, oldest first.
fn chronological_window(history: &[HistoryRecord], window: usize) -> impl Iterator<Item = &HistoryRecord> {
    history.iter().take(window).rev()
}

/// Difficulty, transaction count and reward per block of the trailing window.
pub fn derive_chart(history: &[HistoryRecord], window: usize) -> Vec<ChartPoint> {
    chronological_window(history, window)
        .enumerate()
        .map(|(order, record)| ChartPoint {
            index: record.index,
            difficulty: finite_or_zero(record.difficulty),
            tx_count: record.transactions.len(),
            reward: finite_or_zero(record.reward),
            order,
        })
        .collect()
}

/// Block time and derived rate for every block of the trailing window that
/// has a chronological predecessor inside the window.
///
/// Returns an empty series for fewer than two records.
pub fn derive_network(history: &[HistoryRecord], window: usize) -> Vec<NetworkPoint> {
    let records = chronological_window(history, window).collect::<Vec<_>>();
    records
        .windows(2)
        .map(|pair| {
            let (previous, record) = (pair[0], pair[1]);
            let block_time = block_time_secs(previous, record);
            NetworkPoint {
                index: record.index,
                block_time,
                rate: rate(record.difficulty, block_time),
            }
        })
        .collect()
}

/// Seconds between two blocks, clamped at zero. A missing timestamp on
/// either side yields zero.
pub fn block_time_secs(previous: &HistoryRecord, record: &HistoryRecord) -> f64 {
    match (previous.timestamp, record.timestamp) {
        (Some(previous), Some(current)) => {
            let millis = (current - previous).num_milliseconds();
            (millis as f64 / 1000.0).max(0.0)
        }
        _ => 0.0,
    }
}

/// `difficulty * 1000 / max(block_time, 0.1)`, always finite and non-negative.
pub fn rate(difficulty: f64, block_time: f64) -> f64 {
    let difficulty = finite_or_zero(difficulty).max(0.0);
    let block_time = finite_or_zero(block_time).max(MIN_BLOCK_TIME_SECS);
    difficulty * 1000.0 / block_time
}

/// Averages shown next to the network chart.
pub fn summarize_network(network: &[NetworkPoint], chart: &[ChartPoint]) -> NetworkSummary {
    let average = |values: &mut dyn Iterator<Item = f64>| {
        let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
        if n == 0 {
            0.0
        } else {
            sum / n as f64
        }
    };

    NetworkSummary {
        average_block_time: average(&mut network.iter().map(|p| p.block_time)),
        average_rate: average(&mut network.iter().map(|p| p.rate)),
        latest_rate: network.last().map(|p| p.rate).unwrap_or(0.0),
        transactions_in_window: chart.iter().map(|p| p.tx_count).sum(),
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Transaction;
    use chrono::{
        DateTime,
        Duration,
        TimeZone,
        Utc,
    };
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> Option<DateTime<Utc>> {
        Some(Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap())
    }

    /// `len` records, newest first, 10 seconds apart.
    fn history(len: u64) -> Vec<HistoryRecord> {
        (0..len)
            .rev()
            .map(|index| HistoryRecord {
                index,
                difficulty: 100.0,
                reward: 50.0,
                timestamp: at(index as i64 * 10),
                transactions: vec![Transaction::default(); index as usize % 3],
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn chart_length_is_capped_by_window() {
        for len in [0, 1, 5, 20, 21, 50] {
            let chart = derive_chart(&history(len), CHART_WINDOW);
            assert_eq!(chart.len(), (len as usize).min(CHART_WINDOW), "len {len}");
        }
    }

    #[test]
    fn chart_is_chronological_and_uses_most_recent_records() {
        let chart = derive_chart(&history(50), CHART_WINDOW);
        let indices = chart.iter().map(|p| p.index).collect::<Vec<_>>();
        assert_eq!(indices, (30..50).collect::<Vec<_>>());
        assert!(chart.iter().enumerate().all(|(i, p)| p.order == i));
    }

    #[test]
    fn chart_counts_transactions_and_defaults_reward() {
        let records = vec![
            HistoryRecord {
                index: 2,
                transactions: vec![Transaction::default(); 3],
                ..Default::default()
            },
            HistoryRecord {
                index: 1,
                reward: f64::NAN,
                ..Default::default()
            },
        ];
        let chart = derive_chart(&records, CHART_WINDOW);
        assert_eq!(
            chart,
            vec![
                ChartPoint {
                    index: 1,
                    difficulty: 0.0,
                    tx_count: 0,
                    reward: 0.0,
                    order: 0,
                },
                ChartPoint {
                    index: 2,
                    difficulty: 0.0,
                    tx_count: 3,
                    reward: 0.0,
                    order: 1,
                },
            ]
        );
    }

    #[test]
    fn network_needs_two_records() {
        assert!(derive_network(&history(0), NETWORK_WINDOW).is_empty());
        assert!(derive_network(&history(1), NETWORK_WINDOW).is_empty());
        assert_eq!(derive_network(&history(2), NETWORK_WINDOW).len(), 1);
    }

    #[test]
    fn network_length_never_exceeds_window() {
        for len in [2, 5, 10, 11, 50] {
            let network = derive_network(&history(len), NETWORK_WINDOW);
            assert_eq!(network.len(), (len as usize).min(NETWORK_WINDOW) - 1, "len {len}");
        }
    }

    #[test]
    fn ten_seconds_at_difficulty_hundred() {
        let network = derive_network(&history(2), NETWORK_WINDOW);
        assert_eq!(
            network,
            vec![NetworkPoint {
                index: 1,
                block_time: 10.0,
                rate: 10_000.0,
            }]
        );
    }

    #[test]
    fn zero_block_time_uses_floor() {
        let same = at(0);
        let records = vec![
            HistoryRecord {
                index: 1,
                difficulty: 500.0,
                timestamp: same,
                ..Default::default()
            },
            HistoryRecord {
                index: 0,
                difficulty: 500.0,
                timestamp: same,
                ..Default::default()
            },
        ];
        let network = derive_network(&records, NETWORK_WINDOW);
        assert_eq!(network[0].block_time, 0.0);
        assert_eq!(network[0].rate, 5_000_000.0);
    }

    #[test]
    fn out_of_order_timestamps_are_clamped() {
        let records = vec![
            HistoryRecord {
                index: 1,
                difficulty: 10.0,
                timestamp: at(0),
                ..Default::default()
            },
            HistoryRecord {
                index: 0,
                difficulty: 10.0,
                timestamp: at(30),
                ..Default::default()
            },
        ];
        let network = derive_network(&records, NETWORK_WINDOW);
        assert_eq!(network[0].block_time, 0.0);
        assert!(network[0].rate.is_finite());
    }

    #[test]
    fn missing_timestamp_yields_zero_block_time() {
        let mut records = history(3);
        records[1].timestamp = None;
        let network = derive_network(&records, NETWORK_WINDOW);
        assert_eq!(network.len(), 2);
        assert!(network.iter().all(|p| p.block_time == 0.0));
        assert!(network.iter().all(|p| p.rate.is_finite() && p.rate >= 0.0));
    }

    #[test]
    fn sub_second_block_times_keep_millisecond_precision() {
        let base = at(0).unwrap();
        let records = vec![
            HistoryRecord {
                index: 1,
                difficulty: 1.0,
                timestamp: Some(base + Duration::milliseconds(500)),
                ..Default::default()
            },
            HistoryRecord {
                index: 0,
                difficulty: 1.0,
                timestamp: Some(base),
                ..Default::default()
            },
        ];
        let network = derive_network(&records, NETWORK_WINDOW);
        assert_eq!(network[0].block_time, 0.5);
        assert_eq!(network[0].rate, 2000.0);
    }

    #[test]
    fn rate_is_never_negative_or_nan() {
        assert_eq!(rate(-3.0, 1.0), 0.0);
        assert_eq!(rate(f64::NAN, 1.0), 0.0);
        assert_eq!(rate(1.0, f64::INFINITY), 10_000.0);
        assert_eq!(rate(1.0, -4.0), 10_000.0);
    }

    #[test]
    fn summary_of_empty_series_is_zero() {
        assert_eq!(summarize_network(&[], &[]), NetworkSummary::default());
    }

    #[test]
    fn summary_averages_window() {
        let records = history(5);
        let network = derive_network(&records, NETWORK_WINDOW);
        let chart = derive_chart(&records, CHART_WINDOW);
        let summary = summarize_network(&network, &chart);
        assert_eq!(summary.average_block_time, 10.0);
        assert_eq!(summary.average_rate, 10_000.0);
        assert_eq!(summary.latest_rate, 10_000.0);
        // indices 0..5 carry index % 3 transactions: 0 + 1 + 2 + 0 + 1
        assert_eq!(summary.transactions_in_window, 4);
    }
}
