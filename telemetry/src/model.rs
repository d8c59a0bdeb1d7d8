//! Records exchanged between the upstream node, the deriving components and
//! the store.

use crate::normalizer::{
    as_amount,
    as_count,
    as_timestamp,
};
use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;

/// Normalized point-in-time summary of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub height: u64,
    pub difficulty: f64,
    pub mempool_size: u64,
    pub total_blocks: u64,
    pub fetched_at: DateTime<Utc>,
}

/// One block as returned by `/api/blockchain/blocks`.
///
/// Decoding never fails: a field that is missing, `null` or of the wrong
/// type takes its default, and an unusable timestamp becomes `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct HistoryRecord {
    pub index: u64,
    pub hash: String,
    pub previous_hash: String,
    #[serde(serialize_with = "chrono::serde::ts_milliseconds_option::serialize")]
    pub timestamp: Option<DateTime<Utc>>,
    pub difficulty: f64,
    pub nonce: u64,
    pub reward: f64,
    pub transactions: Vec<Transaction>,
}

impl From<Value> for HistoryRecord {
    fn from(value: Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
        Self {
            index: as_count(value.get("index")),
            hash: text("hash"),
            previous_hash: text("previous_hash"),
            timestamp: as_timestamp(value.get("timestamp")),
            difficulty: as_amount(value.get("difficulty")),
            nonce: as_count(value.get("nonce")),
            reward: as_amount(value.get("reward")),
            transactions: value
                .get("transactions")
                .and_then(Value::as_array)
                .map(|txs| txs.iter().cloned().map(Transaction::from).collect())
                .unwrap_or_default(),
        }
    }
}

/// Page wrapper of the history endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryPage {
    #[serde(default)]
    pub blocks: Vec<HistoryRecord>,
}

/// A transaction inside a [`HistoryRecord`].
///
/// The node serializes transactions as externally tagged enums
/// (`{"Transfer": {...}}`, `{"Coinbase": {...}}`), older nodes as flat
/// objects. Anything is accepted; fields that cannot be found stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct Transaction {
    pub hash: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub amount: Option<f64>,
}

impl From<Value> for Transaction {
    fn from(value: Value) -> Self {
        // Unwrap a single-key tagged enum into its payload.
        let body = match &value {
            Value::Object(map) if map.len() == 1 => match map.values().next() {
                Some(inner @ Value::Object(_)) => inner,
                _ => &value,
            },
            _ => &value,
        };
        let Value::Object(map) = body else {
            return Self::default();
        };

        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(str::to_string)
        };

        Self {
            hash: text(&["hash", "tx_hash"]),
            from: text(&["from", "sender"]),
            to: text(&["to", "new_owner", "beneficiary_address"]),
            amount: ["amount", "reward_area"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_f64)),
        }
    }
}

/// One bar of the difficulty / transaction / reward chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub index: u64,
    pub difficulty: f64,
    pub tx_count: usize,
    pub reward: f64,
    pub order: usize,
}

/// Inter-block timing and the rate derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkPoint {
    pub index: u64,
    pub block_time: f64,
    pub rate: f64,
}

/// Aggregates over the derived series shown next to the charts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub average_block_time: f64,
    pub average_rate: f64,
    pub latest_rate: f64,
    pub transactions_in_window: usize,
}

/// Peer entry of `/api/network/peers`. The node does not promise a shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Peer {
    #[serde(alias = "node_id")]
    pub id: Option<String>,
    #[serde(alias = "addr")]
    pub address: Option<String>,
    pub height: Option<u64>,
    pub last_seen: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeerList {
    #[serde(default)]
    pub peers: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub protocol_version: String,
    pub peer_count: u64,
}

/// Request counters of the node's API layer (`/stats`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiCounters {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub uptime_seconds: u64,
    pub blocks_mined: u64,
    pub mining_starts: u64,
    pub mining_stops: u64,
    pub transactions_submitted: u64,
    pub is_mining: bool,
}
