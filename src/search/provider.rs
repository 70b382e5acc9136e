use std::fmt;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::geo::Point;

/// Errors that can occur while running a place search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchError {
    /// Provider misconfigured (missing URL, bad credentials). Not retryable.
    Config(String),
    /// Network-level failure (timeout, DNS, connection refused).
    Network(String),
    /// The search endpoint returned an error response.
    Api { status: u16, message: String },
    /// Failed to parse the endpoint's response.
    Parse(String),
    /// The request was superseded. Never shown to the user.
    Cancelled,
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::Config(msg) => write!(f, "config error: {msg}"),
            SearchError::Network(msg) => write!(f, "network error: {msg}"),
            SearchError::Api { status, message } => {
                write!(f, "search error (HTTP {status}): {message}")
            }
            SearchError::Parse(msg) => write!(f, "parse error: {msg}"),
            SearchError::Cancelled => write!(f, "search cancelled"),
        }
    }
}

impl std::error::Error for SearchError {}

/// One text search, scoped to a city.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    pub city: String,
    pub restrict_to_city: bool,
}

/// A place returned by the search endpoint. `point` is in the regional
/// (tile provider) frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub name: String,
    pub address: String,
    pub point: Point,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Returns the name of the provider.
    fn name(&self) -> &str;

    /// Runs a search. Implementations return `Err(SearchError::Cancelled)`
    /// as soon as `cancel` fires; callers never surface that result.
    async fn search(
        &self,
        query: SearchQuery,
        cancel: CancellationToken,
    ) -> Result<Vec<SearchResult>, SearchError>;
}
