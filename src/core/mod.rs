//! # Core Navigation Logic
//!
//! This module contains geonav's business logic.
//! It knows nothing about any specific map renderer or HTTP client.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • State (slots, marker,│
//!                    │    search, history)     │
//!                    │  • Action (events)      │
//!                    │  • update() (reducer)   │
//!                    │                         │
//!                    │  No I/O. Pure.          │
//!                    └───────────┬─────────────┘
//!                                │ Vec<Effect>
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!     ┌────────────┐      ┌────────────┐      ┌────────────┐
//!     │  Runtime   │      │  Surface   │      │   Search   │
//!     │  (timers,  │      │ (camera,   │      │  (HTTP     │
//!     │   tokio)   │      │  layers)   │      │  provider) │
//!     └────────────┘      └────────────┘      └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`state`]: The `App` struct, all navigation state in one place
//! - [`action`]: The `Action` enum and the `update()` reducer
//! - [`arbiter`]: Slot priority, camera moves, deferred clears, marker
//! - [`controller`]: Debounced, cancelable search and history
//! - [`transform`]: WGS-84 ↔ GCJ-02
//! - [`geometry`]: Centroid and framing zoom

pub mod action;
pub mod arbiter;
pub mod config;
pub mod controller;
pub mod geo;
pub mod geometry;
pub mod history;
pub mod marker;
pub mod state;
pub mod transform;

pub use action::{Action, Effect, SurfaceCommand, update};
pub use state::App;
