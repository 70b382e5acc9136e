//! # Search Controller
//!
//! Debounced, cancelable place search with a bounded history.
//!
//! ```text
//! QueryChanged ─300ms quiet─► DebounceElapsed ─► SpawnSearch(gen n)
//! Submit ───────────────────────────────────────► SpawnSearch(gen n+1), CancelSearch(gen n)
//! SearchCompleted(gen) ─► applied only if gen is still in flight
//! SelectSuggestion ─► history + address request for the arbiter
//! ```

use log::{debug, info, warn};

use crate::core::action::{Effect, set_slot};
use crate::core::state::{
    App, DEBOUNCE_DELAY, NavigationRequest, Notice, NoticeKind, SlotKind,
};
use crate::search::{SearchError, SearchQuery, SearchResult};

pub const NO_RESULTS_NOTICE: &str = "No matching places found";

pub(crate) fn query_changed(app: &mut App, text: String) -> Vec<Effect> {
    app.search.show_history = text.trim().is_empty();
    app.search.query = text;
    app.search.debounce_generation += 1;
    vec![Effect::ScheduleDebounce {
        generation: app.search.debounce_generation,
        delay: DEBOUNCE_DELAY,
    }]
}

pub(crate) fn debounce_elapsed(app: &mut App, generation: u64) -> Vec<Effect> {
    if generation != app.search.debounce_generation {
        debug!("Ignoring stale debounce (generation {})", generation);
        return Vec::new();
    }
    if app.search.query == app.search.debounced {
        return Vec::new();
    }
    app.search.debounced = app.search.query.clone();

    if app.search.debounced.trim().is_empty() {
        app.search.suggestions.clear();
        return cancel_in_flight(app);
    }
    let text = app.search.debounced.clone();
    issue_search(app, text)
}

/// Searches the current text now, whatever the debounce timer is doing.
pub(crate) fn submit(app: &mut App) -> Vec<Effect> {
    let text = app.search.query.clone();
    if text.trim().is_empty() {
        return Vec::new();
    }
    // The pending debounce would otherwise search the same text again.
    app.search.debounced = text.clone();
    issue_search(app, text)
}

pub(crate) fn clear_input(app: &mut App) -> Vec<Effect> {
    app.search.query.clear();
    app.search.debounced.clear();
    app.search.debounce_generation += 1;
    app.search.suggestions.clear();
    app.search.show_history = true;
    cancel_in_flight(app)
}

pub(crate) fn select_suggestion(app: &mut App, index: usize) -> Vec<Effect> {
    let Some(result) = app.search.suggestions.get(index).cloned() else {
        warn!("Suggestion index {} out of range", index);
        return Vec::new();
    };
    info!("Selected suggestion '{}' ({})", result.name, result.id);

    settle_query(app, &result.name);
    app.search.suggestions.clear();
    app.search.show_history = false;

    let mut effects = Vec::new();
    if app.search.history.record(&result.name) {
        effects.push(Effect::PersistHistory(app.search.history.entries().to_vec()));
    }
    effects.extend(set_slot(
        app,
        SlotKind::Address,
        Some(NavigationRequest::Address(result.point)),
    ));
    effects
}

pub(crate) fn select_history_entry(app: &mut App, index: usize) -> Vec<Effect> {
    let Some(text) = app.search.history.get(index).map(|e| e.text.clone()) else {
        warn!("History index {} out of range", index);
        return Vec::new();
    };
    settle_query(app, &text);
    app.search.show_history = false;
    issue_search(app, text)
}

pub(crate) fn clear_history(app: &mut App) -> Vec<Effect> {
    app.search.history.clear();
    vec![Effect::ClearHistoryStore]
}

pub(crate) fn search_completed(
    app: &mut App,
    generation: u64,
    result: Result<Vec<SearchResult>, SearchError>,
) -> Vec<Effect> {
    if app.search.in_flight != Some(generation) {
        debug!("Discarding result of superseded search (generation {})", generation);
        return Vec::new();
    }
    app.search.in_flight = None;

    match result {
        Ok(results) if results.is_empty() => {
            app.search.suggestions.clear();
            app.search.notice = Some(Notice {
                kind: NoticeKind::Info,
                text: NO_RESULTS_NOTICE.to_string(),
            });
        }
        Ok(results) => {
            debug!("Applying {} suggestions", results.len());
            app.search.suggestions = results;
            app.search.show_history = false;
            app.search.notice = None;
        }
        Err(SearchError::Cancelled) => {}
        Err(e) => {
            warn!("Search failed: {}", e);
            app.search.suggestions.clear();
            app.search.notice = Some(Notice {
                kind: NoticeKind::Error,
                text: format!("Search failed: {e}"),
            });
        }
    }
    Vec::new()
}

/// Sets the query text without arming the debounce, so programmatic
/// edits do not trigger a second search.
fn settle_query(app: &mut App, text: &str) {
    app.search.query = text.to_string();
    app.search.debounced = text.to_string();
    app.search.debounce_generation += 1;
}

fn issue_search(app: &mut App, text: String) -> Vec<Effect> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let mut effects = cancel_in_flight(app);

    app.search.request_generation += 1;
    let generation = app.search.request_generation;
    app.search.in_flight = Some(generation);
    info!("Searching '{}' (generation {})", text, generation);

    effects.push(Effect::SpawnSearch {
        generation,
        query: SearchQuery {
            query: text,
            city: app.search.city.clone(),
            restrict_to_city: app.search.restrict_to_city,
        },
    });
    effects
}

fn cancel_in_flight(app: &mut App) -> Vec<Effect> {
    match app.search.in_flight.take() {
        Some(generation) => {
            debug!("Cancelling search generation {}", generation);
            vec![Effect::CancelSearch]
        }
        None => Vec::new(),
    }
}
