//! # Navigation Arbiter
//!
//! Resolves the three request slots into at most one camera move per
//! tick. A tick runs whenever a slot changes or the surface becomes ready.
//!
//! Per tick:
//! 1. Defer (no state change) unless the surface is ready.
//! 2. Cancel the deferred clear of the previous tick.
//! 3. Pick the highest-priority slot: layer > table > address.
//! 4. Jump (no animation) to its target.
//! 5. For addresses, show and flash the marker.
//! 6. Schedule a clear of *that slot only* after `SLOT_CLEAR_DELAY`.
//!
//! A request that already moved the camera and is then preempted by a
//! higher-priority one is retired along with the canceled clear, so the
//! camera does not jump back to it afterwards.

use log::{debug, info};

use crate::core::action::{Effect, SurfaceCommand};
use crate::core::geo::Point;
use crate::core::geometry::{self, CameraTarget};
use crate::core::marker::{
    CIRCLE_OPACITY, CIRCLE_STROKE_OPACITY, FeatureCollection, MARKER_LAYER_ID, MARKER_LIFETIME,
    MARKER_SOURCE_ID,
};
use crate::core::state::{
    ADDRESS_ZOOM, App, ArbiterPhase, NavigationRequest, PendingClear, SLOT_CLEAR_DELAY,
};

/// One arbitration tick.
pub(crate) fn evaluate(app: &mut App) -> Vec<Effect> {
    let mut effects = Vec::new();

    if !app.arbiter.surface_ready {
        debug!("Surface not ready, deferring tick");
        return effects;
    }

    let superseded = app.arbiter.pending_clear.take();
    if superseded.is_some() {
        effects.push(Effect::CancelSlotClear);
    }

    let Some(request) = app.slots.select() else {
        app.arbiter.phase = ArbiterPhase::Idle;
        return effects;
    };
    let kind = request.kind();

    if let Some(prev) = superseded
        && prev.kind != kind
        && app.slots.revision(prev.kind) == prev.revision
    {
        debug!("{:?} request preempted by {:?}, retiring it", prev.kind, kind);
        app.slots.clear(prev.kind);
    }

    app.arbiter.phase = ArbiterPhase::Pending(kind);
    let target = target_for(app, &request);

    info!(
        "Jumping to ({:.6}, {:.6}) z{} for {:?} request",
        target.center.lon, target.center.lat, target.zoom, kind
    );
    effects.push(Effect::Surface(SurfaceCommand::JumpTo {
        center: target.center,
        zoom: target.zoom,
    }));
    app.arbiter.phase = ArbiterPhase::Transitioning(kind);

    if let NavigationRequest::Address(point) = request {
        show_marker(app, point, &mut effects);
    }

    app.arbiter.clear_generation += 1;
    let generation = app.arbiter.clear_generation;
    app.arbiter.pending_clear = Some(PendingClear {
        generation,
        kind,
        revision: app.slots.revision(kind),
    });
    effects.push(Effect::ScheduleSlotClear {
        generation,
        delay: SLOT_CLEAR_DELAY,
    });
    app.arbiter.phase = ArbiterPhase::Cooldown(kind);

    effects
}

fn target_for(app: &App, request: &NavigationRequest) -> CameraTarget {
    match request {
        NavigationRequest::LayerGeometry(g) | NavigationRequest::TableRow(g) => {
            let framed = geometry::frame(g);
            CameraTarget {
                center: app.arbiter.geometry_frame.to_display(framed.center),
                zoom: framed.zoom,
            }
        }
        NavigationRequest::Address(point) => CameraTarget {
            center: *point,
            zoom: ADDRESS_ZOOM,
        },
    }
}

fn show_marker(app: &mut App, point: Point, effects: &mut Vec<Effect>) {
    if app.marker.visible {
        effects.push(Effect::StopMarkerFlash);
    }
    let generation = app.marker.activate(point);
    let (opacity, stroke_opacity) = app.marker.paint();

    effects.push(Effect::Surface(SurfaceCommand::SetSourceData {
        source_id: MARKER_SOURCE_ID.to_string(),
        data: FeatureCollection::single_point(point),
    }));
    effects.push(Effect::Surface(SurfaceCommand::SetLayerVisibility {
        layer_id: MARKER_LAYER_ID.to_string(),
        visible: true,
    }));
    effects.extend(paint(opacity, stroke_opacity));
    effects.push(Effect::StartMarkerFlash { generation });
    effects.push(Effect::ScheduleMarkerExpiry {
        generation,
        delay: MARKER_LIFETIME,
    });
}

fn paint(opacity: f64, stroke_opacity: f64) -> [Effect; 2] {
    [
        Effect::Surface(SurfaceCommand::SetPaintProperty {
            layer_id: MARKER_LAYER_ID.to_string(),
            key: CIRCLE_OPACITY.to_string(),
            value: opacity,
        }),
        Effect::Surface(SurfaceCommand::SetPaintProperty {
            layer_id: MARKER_LAYER_ID.to_string(),
            key: CIRCLE_STROKE_OPACITY.to_string(),
            value: stroke_opacity,
        }),
    ]
}

pub(crate) fn slot_clear_elapsed(app: &mut App, generation: u64) -> Vec<Effect> {
    let pending = match app.arbiter.pending_clear {
        Some(pending) if pending.generation == generation => pending,
        _ => {
            debug!("Ignoring stale slot clear (generation {})", generation);
            return Vec::new();
        }
    };
    app.arbiter.pending_clear = None;
    app.arbiter.phase = ArbiterPhase::Idle;

    // The slot may have been refilled while the surface was not ready.
    if app.slots.revision(pending.kind) != pending.revision {
        debug!("{:?} slot changed since its move, keeping it", pending.kind);
        return Vec::new();
    }
    debug!("Clearing {:?} slot", pending.kind);
    if app.slots.clear(pending.kind) {
        evaluate(app)
    } else {
        Vec::new()
    }
}

pub(crate) fn marker_flash_tick(app: &mut App, generation: u64) -> Vec<Effect> {
    if !app.marker.is_current(generation) {
        return Vec::new();
    }
    let (opacity, stroke_opacity) = app.marker.toggle();
    paint(opacity, stroke_opacity).into()
}

pub(crate) fn marker_expired(app: &mut App, generation: u64) -> Vec<Effect> {
    if !app.marker.is_current(generation) {
        return Vec::new();
    }
    debug!("Marker expired, hiding");
    app.marker.hide();
    vec![
        Effect::StopMarkerFlash,
        Effect::Surface(SurfaceCommand::SetLayerVisibility {
            layer_id: MARKER_LAYER_ID.to_string(),
            visible: false,
        }),
        Effect::Surface(SurfaceCommand::SetSourceData {
            source_id: MARKER_SOURCE_ID.to_string(),
            data: FeatureCollection::empty(),
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::action::{Action, update};
    use crate::core::geo::Geometry;
    use crate::core::geometry::POINT_ZOOM;
    use crate::core::state::SlotKind;
    use crate::core::transform::{Frame, to_regional_frame};

    fn ready_app() -> App {
        let mut app = App::new();
        app.arbiter.surface_ready = true;
        app
    }

    fn jumps(effects: &[Effect]) -> Vec<(Point, u8)> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Surface(SurfaceCommand::JumpTo { center, zoom }) => Some((*center, *zoom)),
                _ => None,
            })
            .collect()
    }

    fn scheduled_clear(effects: &[Effect]) -> u64 {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::ScheduleSlotClear { generation, delay } => {
                    assert_eq!(*delay, SLOT_CLEAR_DELAY);
                    Some(*generation)
                }
                _ => None,
            })
            .expect("slot clear scheduled")
    }

    fn marker_shown(effects: &[Effect]) -> bool {
        effects.iter().any(|e| {
            matches!(
                e,
                Effect::Surface(SurfaceCommand::SetLayerVisibility { visible: true, .. })
            )
        })
    }

    const ADDRESS: Point = Point::new(116.397428, 39.90923);

    #[test]
    fn test_not_ready_defers_without_state_change() {
        let mut app = App::new();
        let effects = update(&mut app, Action::SetAddressRequest(Some(ADDRESS)));
        assert!(effects.is_empty());
        assert_eq!(app.arbiter.phase, ArbiterPhase::Idle);
        assert!(app.slots.is_set(SlotKind::Address));
        assert!(!app.marker.visible);
    }

    #[test]
    fn test_address_jumps_at_zoom_16_and_shows_marker() {
        let mut app = ready_app();
        let effects = update(&mut app, Action::SetAddressRequest(Some(ADDRESS)));

        assert_eq!(jumps(&effects), vec![(ADDRESS, ADDRESS_ZOOM)]);
        assert!(marker_shown(&effects));
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::ScheduleMarkerExpiry { delay, .. } if *delay == MARKER_LIFETIME
        )));
        assert!(app.marker.visible);
        assert_eq!(app.marker.point, Some(ADDRESS));
        assert_eq!(app.arbiter.phase, ArbiterPhase::Cooldown(SlotKind::Address));
    }

    #[test]
    fn test_geometry_requests_never_show_marker() {
        let mut app = ready_app();
        app.arbiter.geometry_frame = Frame::Gcj02;
        let geometry = Geometry::Point(Point::new(119.9, 28.4));
        let effects = update(&mut app, Action::SetTableRequest(Some(geometry)));

        assert_eq!(jumps(&effects), vec![(Point::new(119.9, 28.4), POINT_ZOOM)]);
        assert!(!marker_shown(&effects));
        assert!(!app.marker.visible);
    }

    #[test]
    fn test_wgs84_geometry_is_shifted_into_display_frame() {
        let mut app = ready_app();
        let p = Point::new(119.921786, 28.451993);
        let effects = update(&mut app, Action::SetLayerRequest(Some(Geometry::Point(p))));
        assert_eq!(jumps(&effects), vec![(to_regional_frame(p), POINT_ZOOM)]);
    }

    #[test]
    fn test_only_highest_priority_slot_applied() {
        let mut app = App::new();
        let geom_a = Geometry::Point(Point::new(10.0, 10.0));
        let geom_b = Geometry::Point(Point::new(20.0, 20.0));
        update(&mut app, Action::SetLayerRequest(Some(geom_a)));
        update(&mut app, Action::SetTableRequest(Some(geom_b)));
        update(&mut app, Action::SetAddressRequest(Some(ADDRESS)));

        let effects = update(&mut app, Action::SurfaceReady(true));
        assert_eq!(jumps(&effects), vec![(Point::new(10.0, 10.0), POINT_ZOOM)]);
        assert!(!marker_shown(&effects));
        assert_eq!(app.arbiter.phase, ArbiterPhase::Cooldown(SlotKind::Layer));
    }

    #[test]
    fn test_slot_clear_resets_only_fired_slot_then_next_fires() {
        let mut app = App::new();
        update(&mut app, Action::SetTableRequest(Some(Geometry::Point(Point::new(20.0, 20.0)))));
        update(&mut app, Action::SetAddressRequest(Some(ADDRESS)));
        let effects = update(&mut app, Action::SurfaceReady(true));
        let generation = scheduled_clear(&effects);

        let effects = update(&mut app, Action::SlotClearElapsed { generation });
        assert!(!app.slots.is_set(SlotKind::Table));
        assert!(app.slots.is_set(SlotKind::Address));
        assert_eq!(jumps(&effects), vec![(ADDRESS, ADDRESS_ZOOM)]);
        assert!(marker_shown(&effects));
    }

    #[test]
    fn test_slot_clear_returns_to_idle() {
        let mut app = ready_app();
        let effects = update(&mut app, Action::SetAddressRequest(Some(ADDRESS)));
        let generation = scheduled_clear(&effects);

        let effects = update(&mut app, Action::SlotClearElapsed { generation });
        assert!(jumps(&effects).is_empty());
        assert!(!app.slots.is_set(SlotKind::Address));
        assert_eq!(app.arbiter.phase, ArbiterPhase::Idle);
        // Marker lifetime is independent of the slot.
        assert!(app.marker.visible);
    }

    #[test]
    fn test_stale_clear_does_not_null_newer_request() {
        let mut app = ready_app();
        let effects = update(&mut app, Action::SetAddressRequest(Some(ADDRESS)));
        let stale = scheduled_clear(&effects);

        // 500ms later a layer request arrives.
        let layer = Geometry::Point(Point::new(121.0, 31.0));
        let effects = update(&mut app, Action::SetLayerRequest(Some(layer)));
        assert!(effects.contains(&Effect::CancelSlotClear));
        assert_eq!(jumps(&effects).len(), 1);
        let fresh = scheduled_clear(&effects);
        assert_ne!(stale, fresh);

        // The address clear would have fired at 1100ms.
        assert!(update(&mut app, Action::SlotClearElapsed { generation: stale }).is_empty());
        assert!(app.slots.is_set(SlotKind::Layer));
        assert_eq!(app.arbiter.phase, ArbiterPhase::Cooldown(SlotKind::Layer));

        let effects = update(&mut app, Action::SlotClearElapsed { generation: fresh });
        assert!(!app.slots.is_set(SlotKind::Layer));
        // The preempted address was retired, so nothing jumps back to it.
        assert!(jumps(&effects).is_empty());
        assert_eq!(app.arbiter.phase, ArbiterPhase::Idle);
    }

    #[test]
    fn test_lower_priority_change_refires_current_slot() {
        let mut app = ready_app();
        let layer = Geometry::Point(Point::new(121.0, 31.0));
        update(&mut app, Action::SetLayerRequest(Some(layer)));

        let effects = update(&mut app, Action::SetAddressRequest(Some(ADDRESS)));
        assert!(effects.contains(&Effect::CancelSlotClear));
        assert_eq!(jumps(&effects), vec![(to_regional_frame(Point::new(121.0, 31.0)), POINT_ZOOM)]);
        // The waiting address is untouched and fires after the layer clears.
        assert!(app.slots.is_set(SlotKind::Address));
        let generation = scheduled_clear(&effects);
        let effects = update(&mut app, Action::SlotClearElapsed { generation });
        assert_eq!(jumps(&effects), vec![(ADDRESS, ADDRESS_ZOOM)]);
    }

    #[test]
    fn test_clear_keeps_slot_refilled_while_not_ready() {
        let mut app = ready_app();
        let effects = update(&mut app, Action::SetAddressRequest(Some(ADDRESS)));
        let generation = scheduled_clear(&effects);

        update(&mut app, Action::SurfaceReady(false));
        let newer = Point::new(120.0, 30.0);
        assert!(update(&mut app, Action::SetAddressRequest(Some(newer))).is_empty());

        update(&mut app, Action::SlotClearElapsed { generation });
        assert_eq!(
            app.slots.get(SlotKind::Address),
            Some(NavigationRequest::Address(newer))
        );

        let effects = update(&mut app, Action::SurfaceReady(true));
        assert_eq!(jumps(&effects), vec![(newer, ADDRESS_ZOOM)]);
    }

    #[test]
    fn test_marker_flash_and_expiry() {
        let mut app = ready_app();
        update(&mut app, Action::SetAddressRequest(Some(ADDRESS)));
        let generation = app.marker.generation;

        let effects = update(&mut app, Action::MarkerFlashTick { generation });
        assert_eq!(effects.len(), 2);
        assert!(effects.contains(&Effect::Surface(SurfaceCommand::SetPaintProperty {
            layer_id: MARKER_LAYER_ID.to_string(),
            key: CIRCLE_OPACITY.to_string(),
            value: 0.2,
        })));

        let effects = update(&mut app, Action::MarkerExpired { generation });
        assert!(effects.contains(&Effect::StopMarkerFlash));
        assert!(effects.contains(&Effect::Surface(SurfaceCommand::SetSourceData {
            source_id: MARKER_SOURCE_ID.to_string(),
            data: FeatureCollection::empty(),
        })));
        assert!(!app.marker.visible);

        assert!(update(&mut app, Action::MarkerFlashTick { generation }).is_empty());
        assert!(update(&mut app, Action::MarkerExpired { generation }).is_empty());
    }

    #[test]
    fn test_second_address_restarts_marker_cycle() {
        let mut app = ready_app();
        update(&mut app, Action::SetAddressRequest(Some(ADDRESS)));
        let first = app.marker.generation;

        let effects = update(&mut app, Action::SetAddressRequest(Some(Point::new(120.0, 30.0))));
        assert!(effects.contains(&Effect::StopMarkerFlash));
        assert!(update(&mut app, Action::MarkerExpired { generation: first }).is_empty());
        assert!(app.marker.visible);
        assert_eq!(app.marker.point, Some(Point::new(120.0, 30.0)));
    }
}
