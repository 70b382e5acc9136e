//! # Map Surface Adapter
//!
//! The rendering surface is external: tile loading, gestures and styling
//! all live on the other side of this trait. The navigator only ever asks
//! it to move the camera and to toggle the marker layer.

use std::io::Write;

use log::{info, warn};

use crate::core::action::SurfaceCommand;
use crate::core::geo::Point;
use crate::core::marker::FeatureCollection;

pub trait MapSurface {
    /// Moves the camera without animation.
    fn jump_to(&mut self, center: Point, zoom: u8);
    fn set_layer_visibility(&mut self, layer_id: &str, visible: bool);
    fn set_paint_property(&mut self, layer_id: &str, key: &str, value: f64);
    fn set_source_data(&mut self, source_id: &str, data: &FeatureCollection);

    fn apply(&mut self, command: &SurfaceCommand) {
        match command {
            SurfaceCommand::JumpTo { center, zoom } => self.jump_to(*center, *zoom),
            SurfaceCommand::SetLayerVisibility { layer_id, visible } => {
                self.set_layer_visibility(layer_id, *visible)
            }
            SurfaceCommand::SetPaintProperty {
                layer_id,
                key,
                value,
            } => self.set_paint_property(layer_id, key, *value),
            SurfaceCommand::SetSourceData { source_id, data } => {
                self.set_source_data(source_id, data)
            }
        }
    }
}

/// Writes every command as one JSON line, for piping into a real renderer
/// or just watching what the navigator does.
pub struct LoggingSurface<W: Write> {
    out: W,
}

impl<W: Write> LoggingSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn emit(&mut self, command: &SurfaceCommand) {
        let line = match serde_json::to_string(command) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to serialize surface command: {}", e);
                return;
            }
        };
        info!("surface: {}", line);
        if let Err(e) = writeln!(self.out, "{line}").and_then(|_| self.out.flush()) {
            warn!("Failed to write surface command: {}", e);
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> MapSurface for LoggingSurface<W> {
    fn jump_to(&mut self, center: Point, zoom: u8) {
        self.emit(&SurfaceCommand::JumpTo { center, zoom });
    }

    fn set_layer_visibility(&mut self, layer_id: &str, visible: bool) {
        self.emit(&SurfaceCommand::SetLayerVisibility {
            layer_id: layer_id.to_string(),
            visible,
        });
    }

    fn set_paint_property(&mut self, layer_id: &str, key: &str, value: f64) {
        self.emit(&SurfaceCommand::SetPaintProperty {
            layer_id: layer_id.to_string(),
            key: key.to_string(),
            value,
        });
    }

    fn set_source_data(&mut self, source_id: &str, data: &FeatureCollection) {
        self.emit(&SurfaceCommand::SetSourceData {
            source_id: source_id.to_string(),
            data: data.clone(),
        });
    }
}
