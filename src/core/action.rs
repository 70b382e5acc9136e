//! # Actions
//!
//! Everything that can happen to the navigator becomes an `Action`.
//! A table row is clicked? That's `Action::SetTableRequest(Some(geometry))`.
//! A timer fires? That's `Action::SlotClearElapsed { generation }`.
//!
//! The `update()` function takes the current state and an action,
//! mutates the state, and returns the effects the runtime must carry out.
//! No I/O happens here.
//!
//! ```text
//! State + Action  →  update()  →  New State + Vec<Effect>
//! ```
//!
//! Timer and search actions carry the generation they were scheduled
//! under. A generation that no longer matches the state is stale and the
//! action is dropped.

use std::time::Duration;

use log::debug;
use serde::Serialize;

use crate::core::arbiter;
use crate::core::controller;
use crate::core::geo::{Geometry, Point};
use crate::core::history::HistoryEntry;
use crate::core::marker::FeatureCollection;
use crate::core::state::{App, NavigationRequest, SlotKind};
use crate::search::{SearchError, SearchQuery, SearchResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // Request slots
    SetLayerRequest(Option<Geometry>),
    SetTableRequest(Option<Geometry>),
    SetAddressRequest(Option<Point>),
    SurfaceReady(bool),

    // Search box
    QueryChanged(String),
    Submit,
    ClearInput,
    SelectSuggestion(usize),
    SelectHistoryEntry(usize),
    ClearHistory,
    DismissNotice,

    // Timers and background work
    SlotClearElapsed { generation: u64 },
    MarkerFlashTick { generation: u64 },
    MarkerExpired { generation: u64 },
    DebounceElapsed { generation: u64 },
    SearchCompleted {
        generation: u64,
        result: Result<Vec<SearchResult>, SearchError>,
    },

    Quit,
}

/// A command for the rendering surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum SurfaceCommand {
    #[serde(rename_all = "camelCase")]
    JumpTo { center: Point, zoom: u8 },
    #[serde(rename_all = "camelCase")]
    SetLayerVisibility { layer_id: String, visible: bool },
    #[serde(rename_all = "camelCase")]
    SetPaintProperty {
        layer_id: String,
        key: String,
        value: f64,
    },
    #[serde(rename_all = "camelCase")]
    SetSourceData {
        source_id: String,
        data: FeatureCollection,
    },
}

/// Work the runtime performs on behalf of `update()`.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Surface(SurfaceCommand),
    ScheduleSlotClear { generation: u64, delay: Duration },
    CancelSlotClear,
    /// Post `MarkerFlashTick` every flash interval for the marker's lifetime.
    StartMarkerFlash { generation: u64 },
    ScheduleMarkerExpiry { generation: u64, delay: Duration },
    /// Cancels both the flash ticks and the expiry timer.
    StopMarkerFlash,
    ScheduleDebounce { generation: u64, delay: Duration },
    SpawnSearch { generation: u64, query: SearchQuery },
    CancelSearch,
    PersistHistory(Vec<HistoryEntry>),
    ClearHistoryStore,
    Quit,
}

pub fn update(app: &mut App, action: Action) -> Vec<Effect> {
    debug!("update: {:?}", action);
    match action {
        Action::SetLayerRequest(geometry) => {
            set_slot(app, SlotKind::Layer, geometry.map(NavigationRequest::LayerGeometry))
        }
        Action::SetTableRequest(geometry) => {
            set_slot(app, SlotKind::Table, geometry.map(NavigationRequest::TableRow))
        }
        Action::SetAddressRequest(point) => {
            set_slot(app, SlotKind::Address, point.map(NavigationRequest::Address))
        }
        Action::SurfaceReady(ready) => {
            let was_ready = app.arbiter.surface_ready;
            app.arbiter.surface_ready = ready;
            if ready && !was_ready {
                arbiter::evaluate(app)
            } else {
                Vec::new()
            }
        }

        Action::QueryChanged(text) => controller::query_changed(app, text),
        Action::Submit => controller::submit(app),
        Action::ClearInput => controller::clear_input(app),
        Action::SelectSuggestion(index) => controller::select_suggestion(app, index),
        Action::SelectHistoryEntry(index) => controller::select_history_entry(app, index),
        Action::ClearHistory => controller::clear_history(app),
        Action::DismissNotice => {
            app.search.notice = None;
            Vec::new()
        }

        Action::SlotClearElapsed { generation } => arbiter::slot_clear_elapsed(app, generation),
        Action::MarkerFlashTick { generation } => arbiter::marker_flash_tick(app, generation),
        Action::MarkerExpired { generation } => arbiter::marker_expired(app, generation),
        Action::DebounceElapsed { generation } => controller::debounce_elapsed(app, generation),
        Action::SearchCompleted { generation, result } => {
            controller::search_completed(app, generation, result)
        }

        Action::Quit => vec![Effect::Quit],
    }
}

/// Applies a slot setter and runs an arbitration tick if the slot changed.
pub(crate) fn set_slot(
    app: &mut App,
    kind: SlotKind,
    request: Option<NavigationRequest>,
) -> Vec<Effect> {
    let changed = match request {
        Some(request) => {
            app.slots.set(request);
            true
        }
        None => app.slots.clear(kind),
    };
    if changed {
        arbiter::evaluate(app)
    } else {
        Vec::new()
    }
}
