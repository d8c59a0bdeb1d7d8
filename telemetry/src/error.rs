/// Why a single upstream source produced no data in a cycle.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("{url} answered with HTTP {status}")]
    Protocol { url: String, status: u16 },
    #[error("unexpected response from {url}: {reason}")]
    Parse { url: String, reason: String },
}

impl SourceError {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Transport { .. } => "transport",
            SourceError::Protocol { .. } => "protocol",
            SourceError::Parse { .. } => "parse",
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string()).unwrap_or_default();
        if let Some(status) = err.status() {
            SourceError::Protocol {
                url,
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            SourceError::Parse {
                url,
                reason: err.to_string(),
            }
        } else {
            let reason = if err.is_timeout() {
                "timed out".to_string()
            } else {
                err.to_string()
            };
            SourceError::Transport { url, reason }
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("the polling task has shut down")]
    Closed,
    #[error("the poll interval must be greater than zero")]
    ZeroInterval,
}
