//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::action::SurfaceCommand;
use crate::core::geo::Point;
use crate::core::history::MemoryStore;
use crate::core::marker::{CIRCLE_OPACITY, FeatureCollection};
use crate::core::state::App;
use crate::runtime::Navigator;
use crate::search::{SearchError, SearchProvider, SearchQuery, SearchResult};
use crate::surface::MapSurface;

/// Remembers every command it is given.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub commands: Vec<SurfaceCommand>,
}

impl RecordingSurface {
    pub fn jumps(&self) -> Vec<(Point, u8)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                SurfaceCommand::JumpTo { center, zoom } => Some((*center, *zoom)),
                _ => None,
            })
            .collect()
    }

    /// `circle-opacity` values in the order they were set.
    pub fn opacities(&self) -> Vec<f64> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                SurfaceCommand::SetPaintProperty { key, value, .. } if key == CIRCLE_OPACITY => {
                    Some(*value)
                }
                _ => None,
            })
            .collect()
    }

    pub fn last_visibility(&self) -> Option<bool> {
        self.commands.iter().rev().find_map(|c| match c {
            SurfaceCommand::SetLayerVisibility { visible, .. } => Some(*visible),
            _ => None,
        })
    }
}

impl MapSurface for RecordingSurface {
    fn jump_to(&mut self, center: Point, zoom: u8) {
        self.commands.push(SurfaceCommand::JumpTo { center, zoom });
    }

    fn set_layer_visibility(&mut self, layer_id: &str, visible: bool) {
        self.commands.push(SurfaceCommand::SetLayerVisibility {
            layer_id: layer_id.to_string(),
            visible,
        });
    }

    fn set_paint_property(&mut self, layer_id: &str, key: &str, value: f64) {
        self.commands.push(SurfaceCommand::SetPaintProperty {
            layer_id: layer_id.to_string(),
            key: key.to_string(),
            value,
        });
    }

    fn set_source_data(&mut self, source_id: &str, data: &FeatureCollection) {
        self.commands.push(SurfaceCommand::SetSourceData {
            source_id: source_id.to_string(),
            data: data.clone(),
        });
    }
}

type Scripted = (Duration, Result<Vec<SearchResult>, SearchError>);

/// Answers each query text with a canned result after a fixed latency.
/// Unscripted queries answer `Ok(vec![])` immediately.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: HashMap<String, Scripted>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(
        mut self,
        query: &str,
        latency: Duration,
        result: Result<Vec<SearchResult>, SearchError>,
    ) -> Self {
        self.responses.insert(query.to_string(), (latency, result));
        self
    }

    /// Query texts in the order they were searched.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SearchProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn search(
        &self,
        query: SearchQuery,
        cancel: CancellationToken,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(query.query.clone());
        }
        let (latency, result) = self
            .responses
            .get(&query.query)
            .cloned()
            .unwrap_or((Duration::ZERO, Ok(Vec::new())));
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SearchError::Cancelled),
            _ = tokio::time::sleep(latency) => result,
        }
    }
}

pub fn place(name: &str, lon: f64, lat: f64) -> SearchResult {
    SearchResult {
        id: format!("place-{name}"),
        name: name.to_string(),
        address: format!("{name} address"),
        point: Point::new(lon, lat),
    }
}

/// A navigator over a recording surface and an in-memory store.
pub fn test_navigator(provider: Arc<dyn SearchProvider>) -> Navigator<RecordingSurface> {
    Navigator::new(
        App::new(),
        RecordingSurface::default(),
        provider,
        Box::new(MemoryStore::new()),
    )
}
