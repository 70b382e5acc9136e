pub mod provider;
pub mod providers;

pub use provider::{SearchError, SearchProvider, SearchQuery, SearchResult};
pub use providers::PlaceSearchProvider;
