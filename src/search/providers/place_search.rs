//! Place search over the map service's HTTP endpoint.
//!
//! The endpoint fronts the regional POI text search:
//!
//! ```text
//! POST {base_url}/places
//! {"query": "...", "city": "丽水", "citylimit": true}
//!
//! 200 {"results": [{"place_id", "name", "formatted_address",
//!                   "geometry": {"location": {"lat", "lng"}}, ...}],
//!      "status": "OK"}
//! 4xx/5xx {"error": "..."}
//! ```

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::core::geo::Point;
use crate::search::{SearchError, SearchProvider, SearchQuery, SearchResult};

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Serialize, Debug)]
struct PlacesRequest<'a> {
    query: &'a str,
    city: &'a str,
    citylimit: bool,
}

#[derive(Deserialize, Debug)]
struct PlacesResponse {
    #[serde(default)]
    results: Vec<PlaceResult>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize, Debug)]
struct PlaceResult {
    place_id: String,
    name: String,
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    vicinity: Option<String>,
    geometry: PlaceGeometry,
}

#[derive(Deserialize, Debug)]
struct PlaceGeometry {
    location: LatLng,
}

#[derive(Deserialize, Debug)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    error: String,
}

impl From<PlaceResult> for SearchResult {
    fn from(place: PlaceResult) -> Self {
        let address = place
            .vicinity
            .filter(|v| !v.is_empty())
            .or(place.formatted_address)
            .unwrap_or_default();
        SearchResult {
            id: place.place_id,
            name: place.name,
            address,
            point: Point::new(place.geometry.location.lng, place.geometry.location.lat),
        }
    }
}

// ============================================================================
// Provider Implementation
// ============================================================================

pub struct PlaceSearchProvider {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl PlaceSearchProvider {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, SearchError> {
        let body = PlacesRequest {
            query: &query.query,
            city: &query.city,
            citylimit: query.restrict_to_city,
        };

        let mut request = self.client.post(format!("{}/places", self.base_url)).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        debug!("Place search response status: {}", response.status());

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            warn!("Place search API error: {} - {}", status, message);
            return Err(SearchError::Api { status, message });
        }

        let text = response
            .text()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;
        let parsed: PlacesResponse =
            serde_json::from_str(&text).map_err(|e| SearchError::Parse(e.to_string()))?;

        info!(
            "Place search '{}' returned {} results (status={:?})",
            query.query,
            parsed.results.len(),
            parsed.status
        );
        Ok(parsed.results.into_iter().map(SearchResult::from).collect())
    }
}

#[async_trait]
impl SearchProvider for PlaceSearchProvider {
    fn name(&self) -> &str {
        "places"
    }

    async fn search(
        &self,
        query: SearchQuery,
        cancel: CancellationToken,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if self.base_url.is_empty() {
            return Err(SearchError::Config("search base URL is empty".to_string()));
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Place search '{}' cancelled", query.query);
                Err(SearchError::Cancelled)
            }
            result = self.fetch(&query) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_result_prefers_vicinity() {
        let json = r#"{
            "place_id": "B0FFG",
            "name": "丽水学院",
            "formatted_address": "浙江省丽水市莲都区学院路1号",
            "vicinity": "学院路1号",
            "geometry": {"location": {"lat": 28.45, "lng": 119.92}}
        }"#;
        let place: PlaceResult = serde_json::from_str(json).unwrap();
        let result = SearchResult::from(place);
        assert_eq!(result.id, "B0FFG");
        assert_eq!(result.address, "学院路1号");
        assert_eq!(result.point, Point::new(119.92, 28.45));
    }

    #[test]
    fn test_place_result_falls_back_to_formatted_address() {
        let json = r#"{
            "place_id": "x",
            "name": "n",
            "formatted_address": "full address",
            "vicinity": "",
            "geometry": {"location": {"lat": 1.0, "lng": 2.0}}
        }"#;
        let place: PlaceResult = serde_json::from_str(json).unwrap();
        assert_eq!(SearchResult::from(place).address, "full address");
    }

    #[test]
    fn test_request_body_shape() {
        let body = PlacesRequest {
            query: "公园",
            city: "丽水",
            citylimit: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"query": "公园", "city": "丽水", "citylimit": true})
        );
    }

    #[test]
    fn test_pre_cancelled_search_never_hits_network() {
        let provider = PlaceSearchProvider::new("http://127.0.0.1:9".to_string(), None);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let query = SearchQuery {
            query: "a".to_string(),
            city: "c".to_string(),
            restrict_to_city: true,
        };
        let result = tokio_test::block_on(provider.search(query, cancel));
        assert_eq!(result, Err(SearchError::Cancelled));
    }
}
