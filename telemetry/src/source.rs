//! Upstream REST sources and the HTTP client that reads them.

use crate::error::SourceError;
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use std::{
    future::Future,
    pin::Pin,
    time::Duration,
};
use strum::{
    Display,
    EnumIter,
    IntoEnumIterator as _,
};
use url::Url;

pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Stats,
    History,
    NetworkInfo,
    Peers,
    ApiCounters,
}

impl SourceKind {
    pub fn all() -> Vec<SourceKind> {
        SourceKind::iter().collect()
    }

    /// Path relative to the node URL.
    pub fn path(&self) -> &'static str {
        match self {
            SourceKind::Stats => "api/blockchain/stats",
            SourceKind::History => "api/blockchain/blocks",
            SourceKind::NetworkInfo => "api/network/info",
            SourceKind::Peers => "api/network/peers",
            SourceKind::ApiCounters => "stats",
        }
    }

    /// Stats and history feed the snapshot and the derived series.
    pub fn is_critical(&self) -> bool {
        matches!(self, SourceKind::Stats | SourceKind::History)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Stats => "ledger stats",
            SourceKind::History => "block history",
            SourceKind::NetworkInfo => "network info",
            SourceKind::Peers => "peer list",
            SourceKind::ApiCounters => "API counters",
        }
    }
}

/// Anything that can produce the raw JSON body of a source.
pub trait SourceFetcher: Send + Sync {
    fn fetch(&self, source: SourceKind) -> Pin<Box<dyn Future<Output = Result<Value, SourceError>> + Send + '_>>;
}

/// Reads sources from a node over HTTP.
///
/// The client keeps a cookie store so session cookies set by a forwarding
/// proxy are sent back on every request.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base: Url,
    history_limit: u32,
}

impl HttpFetcher {
    pub fn new(node_url: Url, request_timeout: Duration, history_limit: u32) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(request_timeout)
            .build()?;
        Ok(Self::with_client(client, node_url, history_limit))
    }

    pub fn with_client(client: reqwest::Client, mut node_url: Url, history_limit: u32) -> Self {
        // Without a trailing slash `join` would replace the last path segment.
        if !node_url.path().ends_with('/') {
            let path = format!("{}/", node_url.path());
            node_url.set_path(&path);
        }
        Self {
            client,
            base: node_url,
            history_limit,
        }
    }

    pub fn endpoint(&self, source: SourceKind) -> Result<Url, SourceError> {
        let mut url = self.base.join(source.path()).map_err(|err| SourceError::Transport {
            url: format!("{}{}", self.base, source.path()),
            reason: err.to_string(),
        })?;
        if source == SourceKind::History {
            url.query_pairs_mut()
                .append_pair("limit", &self.history_limit.to_string());
        }
        Ok(url)
    }

    async fn fetch_json(&self, source: SourceKind) -> Result<Value, SourceError> {
        let url = self.endpoint(source)?;
        trace!(%url, %source, "fetching source");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Protocol {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|err| SourceError::Parse {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }
}

impl SourceFetcher for HttpFetcher {
    fn fetch(&self, source: SourceKind) -> Pin<Box<dyn Future<Output = Result<Value, SourceError>> + Send + '_>> {
        Box::pin(self.fetch_json(source))
    }
}
