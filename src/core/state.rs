//! # Application State
//!
//! Core navigation state. No surface or network types live here; those
//! belong to the runtime.
//!
//! ```text
//! App
//! ├── slots: RequestSlots        // pending layer / table / address requests
//! ├── arbiter: Arbiter           // phase, readiness, deferred-clear bookkeeping
//! ├── marker: MarkerState        // the flashing highlight marker
//! └── search: SearchState        // query, debounce, suggestions, history
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use std::time::Duration;

use crate::core::config::ResolvedConfig;
use crate::core::geo::{Geometry, Point};
use crate::core::history::SearchHistory;
use crate::core::marker::MarkerState;
use crate::core::transform::Frame;
use crate::search::SearchResult;

/// Delay between a camera move and the reset of the slot that caused it.
pub const SLOT_CLEAR_DELAY: Duration = Duration::from_millis(1100);
/// Quiet period before an edited query is searched.
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(300);
/// Zoom used when jumping to an address.
pub const ADDRESS_ZOOM: u8 = 16;

pub const DEFAULT_CITY: &str = "丽水";

/// Request slots in priority order, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Layer,
    Table,
    Address,
}

impl SlotKind {
    pub const PRIORITY: [SlotKind; 3] = [SlotKind::Layer, SlotKind::Table, SlotKind::Address];

    fn index(self) -> usize {
        match self {
            SlotKind::Layer => 0,
            SlotKind::Table => 1,
            SlotKind::Address => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NavigationRequest {
    LayerGeometry(Geometry),
    /// Geometry already extracted from the table row's feature.
    TableRow(Geometry),
    Address(Point),
}

impl NavigationRequest {
    pub fn kind(&self) -> SlotKind {
        match self {
            NavigationRequest::LayerGeometry(_) => SlotKind::Layer,
            NavigationRequest::TableRow(_) => SlotKind::Table,
            NavigationRequest::Address(_) => SlotKind::Address,
        }
    }
}

/// One independently settable slot per request kind. Every change bumps
/// that slot's revision so deferred work can tell whether the request it
/// was scheduled for is still the one in the slot.
#[derive(Debug, Clone, Default)]
pub struct RequestSlots {
    layer: Option<Geometry>,
    table: Option<Geometry>,
    address: Option<Point>,
    revisions: [u64; 3],
}

impl RequestSlots {
    pub fn set(&mut self, request: NavigationRequest) {
        let kind = request.kind();
        match request {
            NavigationRequest::LayerGeometry(g) => self.layer = Some(g),
            NavigationRequest::TableRow(g) => self.table = Some(g),
            NavigationRequest::Address(p) => self.address = Some(p),
        }
        self.revisions[kind.index()] += 1;
    }

    /// Empties the slot. Returns false if it was already empty.
    pub fn clear(&mut self, kind: SlotKind) -> bool {
        let was_set = match kind {
            SlotKind::Layer => self.layer.take().is_some(),
            SlotKind::Table => self.table.take().is_some(),
            SlotKind::Address => self.address.take().is_some(),
        };
        if was_set {
            self.revisions[kind.index()] += 1;
        }
        was_set
    }

    pub fn get(&self, kind: SlotKind) -> Option<NavigationRequest> {
        match kind {
            SlotKind::Layer => self.layer.clone().map(NavigationRequest::LayerGeometry),
            SlotKind::Table => self.table.clone().map(NavigationRequest::TableRow),
            SlotKind::Address => self.address.map(NavigationRequest::Address),
        }
    }

    pub fn is_set(&self, kind: SlotKind) -> bool {
        match kind {
            SlotKind::Layer => self.layer.is_some(),
            SlotKind::Table => self.table.is_some(),
            SlotKind::Address => self.address.is_some(),
        }
    }

    pub fn revision(&self, kind: SlotKind) -> u64 {
        self.revisions[kind.index()]
    }

    /// The highest-priority non-empty slot.
    pub fn select(&self) -> Option<NavigationRequest> {
        SlotKind::PRIORITY.iter().find_map(|&kind| self.get(kind))
    }
}

/// Where the arbiter is in its cycle.
///
/// ```text
/// Idle ─► Pending(src) ─► Transitioning(src) ─► Cooldown(src) ─1.1s─► Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArbiterPhase {
    #[default]
    Idle,
    Pending(SlotKind),
    Transitioning(SlotKind),
    Cooldown(SlotKind),
}

/// The deferred clear scheduled by the last camera move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingClear {
    pub generation: u64,
    pub kind: SlotKind,
    /// Slot revision at the time of the move.
    pub revision: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Arbiter {
    pub phase: ArbiterPhase,
    pub surface_ready: bool,
    pub clear_generation: u64,
    pub pending_clear: Option<PendingClear>,
    /// Frame that layer and table geometry arrive in.
    pub geometry_frame: Frame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// A transient, user-visible message. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct SearchState {
    pub query: String,
    /// `query` as of the last time it was stable for `DEBOUNCE_DELAY`.
    pub debounced: String,
    pub debounce_generation: u64,
    pub request_generation: u64,
    /// Generation of the search whose result may still be applied.
    pub in_flight: Option<u64>,
    pub suggestions: Vec<SearchResult>,
    pub notice: Option<Notice>,
    pub history: SearchHistory,
    pub show_history: bool,
    pub city: String,
    pub restrict_to_city: bool,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            query: String::new(),
            debounced: String::new(),
            debounce_generation: 0,
            request_generation: 0,
            in_flight: None,
            suggestions: Vec::new(),
            notice: None,
            history: SearchHistory::default(),
            show_history: true,
            city: DEFAULT_CITY.to_string(),
            restrict_to_city: true,
        }
    }
}

impl SearchState {
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct App {
    pub slots: RequestSlots,
    pub arbiter: Arbiter,
    pub marker: MarkerState,
    pub search: SearchState,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ResolvedConfig) -> Self {
        let mut app = Self::new();
        app.arbiter.geometry_frame = config.geometry_frame;
        app.search.city = config.city.clone();
        app.search.restrict_to_city = config.city_limit;
        app
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_new_defaults() {
        let app = App::new();
        assert_eq!(app.arbiter.phase, ArbiterPhase::Idle);
        assert!(!app.arbiter.surface_ready);
        assert!(!app.marker.visible);
        assert_eq!(app.search.city, DEFAULT_CITY);
        assert!(app.search.show_history);
        assert!(!app.search.is_loading());
    }

    #[test]
    fn test_select_follows_priority() {
        let mut slots = RequestSlots::default();
        assert_eq!(slots.select(), None);

        slots.set(NavigationRequest::Address(Point::new(1.0, 1.0)));
        assert_eq!(slots.select().map(|r| r.kind()), Some(SlotKind::Address));

        slots.set(NavigationRequest::TableRow(Geometry::Point(Point::new(2.0, 2.0))));
        assert_eq!(slots.select().map(|r| r.kind()), Some(SlotKind::Table));

        slots.set(NavigationRequest::LayerGeometry(Geometry::Point(Point::new(3.0, 3.0))));
        assert_eq!(slots.select().map(|r| r.kind()), Some(SlotKind::Layer));
    }

    #[test]
    fn test_revisions_track_changes() {
        let mut slots = RequestSlots::default();
        assert!(!slots.clear(SlotKind::Table));
        assert_eq!(slots.revision(SlotKind::Table), 0);

        slots.set(NavigationRequest::TableRow(Geometry::Point(Point::new(0.0, 0.0))));
        assert_eq!(slots.revision(SlotKind::Table), 1);
        assert!(slots.clear(SlotKind::Table));
        assert_eq!(slots.revision(SlotKind::Table), 2);
        assert_eq!(slots.revision(SlotKind::Layer), 0);
        assert!(!slots.is_set(SlotKind::Table));
    }
}
