//! # Navigator Runtime
//!
//! Executes the effects returned by `update()`. Timers and searches run as
//! tokio tasks that post actions back through an unbounded channel; the
//! owner of the `Navigator` feeds those actions back in with `pump()` or
//! lets `run()` do it.
//!
//! Superseded work is stopped twice: the task is aborted (timers) or its
//! token cancelled (searches) here, and the reducer ignores anything that
//! still arrives with an old generation.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::AbortHandle;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;

use crate::core::action::{Action, Effect, update};
use crate::core::history::{self, KeyValueStore};
use crate::core::marker::{FLASH_INTERVAL, MARKER_LIFETIME};
use crate::core::state::App;
use crate::search::{SearchProvider, SearchQuery};
use crate::surface::MapSurface;

/// Handles for the background work of the current generation.
#[derive(Default)]
struct TaskHandles {
    slot_clear: Option<AbortHandle>,
    debounce: Option<AbortHandle>,
    marker_flash: Option<AbortHandle>,
    marker_expiry: Option<AbortHandle>,
    search: Option<CancellationToken>,
}

fn abort(handle: &mut Option<AbortHandle>) {
    if let Some(handle) = handle.take() {
        handle.abort();
    }
}

impl TaskHandles {
    fn cancel_search(&mut self) {
        if let Some(token) = self.search.take() {
            token.cancel();
        }
    }
}

impl Drop for TaskHandles {
    fn drop(&mut self) {
        abort(&mut self.slot_clear);
        abort(&mut self.debounce);
        abort(&mut self.marker_flash);
        abort(&mut self.marker_expiry);
        self.cancel_search();
    }
}

pub struct Navigator<S: MapSurface> {
    app: App,
    surface: S,
    provider: Arc<dyn SearchProvider>,
    store: Box<dyn KeyValueStore>,
    tx: UnboundedSender<Action>,
    rx: UnboundedReceiver<Action>,
    tasks: TaskHandles,
}

impl<S: MapSurface> Navigator<S> {
    /// Loads the persisted search history into `app`.
    pub fn new(
        mut app: App,
        surface: S,
        provider: Arc<dyn SearchProvider>,
        store: Box<dyn KeyValueStore>,
    ) -> Self {
        app.search.history = history::load_history(&*store);
        info!(
            "Navigator ready (provider={}, {} history entries)",
            provider.name(),
            app.search.history.len()
        );
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            app,
            surface,
            provider,
            store,
            tx,
            rx,
            tasks: TaskHandles::default(),
        }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Runs the reducer and executes its effects. Returns false on quit.
    pub fn dispatch(&mut self, action: Action) -> bool {
        let effects = update(&mut self.app, action);
        let mut running = true;
        for effect in effects {
            running &= self.execute(effect);
        }
        running
    }

    /// Dispatches every action background tasks have posted so far.
    /// Returns false on quit.
    pub fn pump(&mut self) -> bool {
        while let Ok(action) = self.rx.try_recv() {
            if !self.dispatch(action) {
                return false;
            }
        }
        true
    }

    /// Waits for the next action posted by a background task.
    pub async fn recv(&mut self) -> Option<Action> {
        self.rx.recv().await
    }

    /// Event loop: interleaves `input` with background actions until quit
    /// or until `input` closes.
    pub async fn run(&mut self, mut input: UnboundedReceiver<Action>) {
        loop {
            let action = tokio::select! {
                Some(action) = self.rx.recv() => action,
                action = input.recv() => match action {
                    Some(action) => action,
                    None => break,
                },
            };
            if !self.dispatch(action) {
                break;
            }
        }
        info!("Navigator loop exited");
    }

    fn execute(&mut self, effect: Effect) -> bool {
        match effect {
            Effect::Surface(command) => self.surface.apply(&command),
            Effect::ScheduleSlotClear { generation, delay } => {
                abort(&mut self.tasks.slot_clear);
                self.tasks.slot_clear =
                    Some(self.after(delay, Action::SlotClearElapsed { generation }));
            }
            Effect::CancelSlotClear => abort(&mut self.tasks.slot_clear),
            Effect::StartMarkerFlash { generation } => {
                abort(&mut self.tasks.marker_flash);
                self.tasks.marker_flash = Some(self.spawn_flash(generation));
            }
            Effect::ScheduleMarkerExpiry { generation, delay } => {
                abort(&mut self.tasks.marker_expiry);
                self.tasks.marker_expiry =
                    Some(self.after(delay, Action::MarkerExpired { generation }));
            }
            Effect::StopMarkerFlash => {
                abort(&mut self.tasks.marker_flash);
                abort(&mut self.tasks.marker_expiry);
            }
            Effect::ScheduleDebounce { generation, delay } => {
                abort(&mut self.tasks.debounce);
                self.tasks.debounce =
                    Some(self.after(delay, Action::DebounceElapsed { generation }));
            }
            Effect::SpawnSearch { generation, query } => self.spawn_search(generation, query),
            Effect::CancelSearch => self.tasks.cancel_search(),
            Effect::PersistHistory(entries) => {
                if let Err(e) = history::save_history(&mut *self.store, &entries) {
                    warn!("Failed to persist search history: {}", e);
                }
            }
            Effect::ClearHistoryStore => {
                if let Err(e) = history::clear_history(&mut *self.store) {
                    warn!("Failed to clear persisted search history: {}", e);
                }
            }
            Effect::Quit => return false,
        }
        true
    }

    /// Posts `action` after `delay`.
    fn after(&self, delay: Duration, action: Action) -> AbortHandle {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(action).is_err() {
                debug!("Timer fired after navigator was dropped");
            }
        })
        .abort_handle()
    }

    /// One tick per flash interval, stopping before the expiry instant so
    /// the last paint change is the hide.
    fn spawn_flash(&self, generation: u64) -> AbortHandle {
        let tx = self.tx.clone();
        let ticks = MARKER_LIFETIME.as_millis() / FLASH_INTERVAL.as_millis();
        let start = Instant::now() + FLASH_INTERVAL;
        tokio::spawn(async move {
            let mut interval = interval_at(start, FLASH_INTERVAL);
            for _ in 1..ticks {
                interval.tick().await;
                if tx.send(Action::MarkerFlashTick { generation }).is_err() {
                    break;
                }
            }
        })
        .abort_handle()
    }

    fn spawn_search(&mut self, generation: u64, query: SearchQuery) {
        self.tasks.cancel_search();
        let token = CancellationToken::new();
        self.tasks.search = Some(token.clone());

        let provider = Arc::clone(&self.provider);
        let tx = self.tx.clone();
        info!(
            "Spawning search '{}' via {} (generation {})",
            query.query,
            provider.name(),
            generation
        );
        tokio::spawn(async move {
            let result = provider.search(query, token.clone()).await;
            if token.is_cancelled() {
                debug!("Dropping result of cancelled search (generation {})", generation);
                return;
            }
            if tx
                .send(Action::SearchCompleted { generation, result })
                .is_err()
            {
                warn!("Failed to deliver search result: receiver dropped");
            }
        });
    }
}
