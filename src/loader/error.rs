use chrono::{DateTime, Utc};

/// Errors surfaced to callers of the loader.
///
/// Store failures never show up here: they are logged and treated as cache misses.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("invalid range: end {end} is before start {start}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: FetchFailure },
    #[error("enrichment failed for {url}: {source}")]
    Enrich {
        url: String,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum FetchFailure {
    #[error("request error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("http {0}")]
    Status(u16),
    #[error("malformed body: {0}")]
    Decode(String),
}

impl LoaderError {
    pub(crate) fn fetch(url: &str, reason: impl Into<FetchFailure>) -> Self {
        Self::Fetch {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }
}
