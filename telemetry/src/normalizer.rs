//! Turns raw upstream payloads into canonical records.
//!
//! Nothing in here fails: a key that is missing, has the wrong JSON type or
//! holds a negative / non-finite number is replaced by its default.

use crate::model::{
    ApiCounters,
    NetworkInfo,
    Peer,
    Snapshot,
};
use chrono::{
    DateTime,
    Utc,
};
use serde_json::Value;

/// Map a `/api/blockchain/stats` payload to a [`Snapshot`].
pub fn normalize(raw: &Value, fetched_at: DateTime<Utc>) -> Snapshot {
    Snapshot {
        height: count(raw, "height"),
        difficulty: amount(raw, "difficulty"),
        mempool_size: count(raw, "mempool_size"),
        total_blocks: count(raw, "total_blocks"),
        fetched_at,
    }
}

/// Map a `/stats` payload to [`ApiCounters`].
pub fn normalize_api_counters(raw: &Value) -> ApiCounters {
    ApiCounters {
        total_requests: count(raw, "total_requests"),
        successful_requests: count(raw, "successful_requests"),
        failed_requests: count(raw, "failed_requests"),
        uptime_seconds: count(raw, "uptime_seconds"),
        blocks_mined: count(raw, "blocks_mined"),
        mining_starts: count(raw, "mining_starts"),
        mining_stops: count(raw, "mining_stops"),
        transactions_submitted: count(raw, "transactions_submitted"),
        is_mining: raw.get("is_mining").and_then(Value::as_bool).unwrap_or(false),
    }
}

/// Map a `/api/network/info` payload to [`NetworkInfo`].
///
/// `peer_count` falls back to the length of an embedded `peers` array.
pub fn normalize_network_info(raw: &Value) -> NetworkInfo {
    let peer_count = match raw.get("peer_count") {
        Some(_) => count(raw, "peer_count"),
        None => raw
            .get("peers")
            .and_then(Value::as_array)
            .map(|peers| peers.len() as u64)
            .unwrap_or(0),
    };
    NetworkInfo {
        protocol_version: raw
            .get("protocol_version")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        peer_count,
    }
}

/// Peers arrive either as objects or as bare `host:port` strings.
pub fn normalize_peer(raw: &Value) -> Peer {
    match raw {
        Value::String(address) => Peer {
            address: Some(address.clone()),
            ..Default::default()
        },
        Value::Object(_) => serde_json::from_value(raw.clone()).unwrap_or_else(|_| Peer {
            id: raw.get("id").and_then(Value::as_str).map(str::to_string),
            address: raw.get("address").and_then(Value::as_str).map(str::to_string),
            height: raw.get("height").and_then(Value::as_u64),
            last_seen: raw.get("last_seen").and_then(Value::as_u64),
        }),
        _ => Peer::default(),
    }
}

fn count(raw: &Value, key: &str) -> u64 {
    as_count(raw.get(key))
}

fn amount(raw: &Value, key: &str) -> f64 {
    as_amount(raw.get(key))
}

/// A non-negative integer; finite non-negative floats are truncated.
pub(crate) fn as_count(value: Option<&Value>) -> u64 {
    value
        .and_then(|value| {
            value
                .as_u64()
                .or_else(|| value.as_f64().filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64))
        })
        .unwrap_or(0)
}

/// A finite non-negative number.
pub(crate) fn as_amount(value: Option<&Value>) -> f64 {
    value
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(0.0)
}

/// Unix milliseconds as an integer, a float or an RFC 3339 string.
pub(crate) fn as_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::Number(number) => {
            let millis = number
                .as_i64()
                .or_else(|| number.as_f64().filter(|v| v.is_finite()).map(|v| v as i64))?;
            DateTime::from_timestamp_millis(millis)
        }
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
            .or_else(|| text.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn missing_fields_default_to_zero() {
        let now = Utc::now();
        let snapshot = normalize(&json!({ "height": 120, "difficulty": 42 }), now);
        assert_eq!(
            snapshot,
            Snapshot {
                height: 120,
                difficulty: 42.0,
                mempool_size: 0,
                total_blocks: 0,
                fetched_at: now,
            }
        );
    }

    #[test]
    fn reads_snake_case_upstream_keys_and_ignores_extras() {
        let now = Utc::now();
        let snapshot = normalize(
            &json!({
                "height": 9,
                "difficulty": 3,
                "mempool_size": 4,
                "total_blocks": 10,
                "chain_id": "main",
            }),
            now,
        );
        assert_eq!(snapshot.mempool_size, 4);
        assert_eq!(snapshot.total_blocks, 10);
    }

    #[test]
    fn wrong_types_and_negatives_are_treated_as_absent() {
        let snapshot = normalize(
            &json!({ "height": "12", "difficulty": -5.0, "mempool_size": null, "total_blocks": 2.9 }),
            Utc::now(),
        );
        assert_eq!(snapshot.height, 0);
        assert_eq!(snapshot.difficulty, 0.0);
        assert_eq!(snapshot.mempool_size, 0);
        assert_eq!(snapshot.total_blocks, 2);
    }

    #[test]
    fn non_object_payload_yields_defaults() {
        let snapshot = normalize(&json!([1, 2, 3]), Utc::now());
        assert_eq!(snapshot.height, 0);
        assert_eq!(snapshot.difficulty, 0.0);
    }

    #[test]
    fn api_counters() {
        let counters = normalize_api_counters(&json!({
            "total_requests": 10,
            "successful_requests": 8,
            "uptime_seconds": 60,
            "blocks_mined": 2,
            "mining_starts": 3,
            "mining_stops": 1,
            "transactions_submitted": 14,
            "is_mining": true,
        }));
        assert_eq!(
            counters,
            ApiCounters {
                total_requests: 10,
                successful_requests: 8,
                failed_requests: 0,
                uptime_seconds: 60,
                blocks_mined: 2,
                mining_starts: 3,
                mining_stops: 1,
                transactions_submitted: 14,
                is_mining: true,
            }
        );
    }

    #[test]
    fn network_info_counts_embedded_peers() {
        let info = normalize_network_info(&json!({ "protocol_version": "1.0", "peers": ["a", "b"] }));
        assert_eq!(info.protocol_version, "1.0");
        assert_eq!(info.peer_count, 2);
    }

    #[test]
    fn peers_from_strings_and_objects() {
        assert_eq!(normalize_peer(&json!("10.0.0.1:3000")).address.as_deref(), Some("10.0.0.1:3000"));
        let peer = normalize_peer(&json!({ "node_id": "n1", "addr": "10.0.0.2:3000", "height": 5 }));
        assert_eq!(peer.id.as_deref(), Some("n1"));
        assert_eq!(peer.address.as_deref(), Some("10.0.0.2:3000"));
        assert_eq!(peer.height, Some(5));
        assert_eq!(normalize_peer(&json!(42)), Peer::default());
    }
}
