use crate::style::{LayerSpec, SourceSpec};
use crate::types::LngLat;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("{kind} with id `{id}` already exists")]
    DuplicateId { kind: &'static str, id: String },
    #[error("layer `{0}` does not exist")]
    MissingLayer(String),
}

/// The subset of the renderer's declarative API the view drives.
pub trait MapEngine {
    fn is_loaded(&self) -> bool;
    fn has_source(&self, id: &str) -> bool;
    fn has_layer(&self, id: &str) -> bool;
    fn add_source(&mut self, id: &str, source: SourceSpec) -> Result<(), EngineError>;
    fn add_layer(&mut self, layer: LayerSpec) -> Result<(), EngineError>;
    fn set_paint_property(&mut self, layer: &str, name: &str, value: Value)
        -> Result<(), EngineError>;
    fn set_center(&mut self, center: LngLat);
    fn add_marker(&mut self, at: LngLat);
    fn set_cursor(&mut self, cursor: &str);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum MapCommand {
    AddSource { id: String, source: SourceSpec },
    AddLayer { layer: LayerSpec },
    SetPaintProperty { layer: String, name: String, value: Value },
    SetCenter { center: [f64; 2] },
    AddMarker { at: [f64; 2] },
    SetCursor { cursor: String },
}

/// Mirrors a renderer living in the browser. Keeps track of what exists so
/// duplicate ids are rejected the same way, and queues each accepted call as
/// a command for the page to replay.
#[derive(Debug, Default)]
pub struct CommandQueue {
    loaded: bool,
    sources: HashSet<String>,
    layers: HashSet<String>,
    pending: Vec<MapCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// The renderer's one-time load event.
    pub fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    pub fn drain(&mut self) -> Vec<MapCommand> {
        std::mem::take(&mut self.pending)
    }
}

impl MapEngine for CommandQueue {
    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains(id)
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.contains(id)
    }

    fn add_source(&mut self, id: &str, source: SourceSpec) -> Result<(), EngineError> {
        if !self.sources.insert(id.to_string()) {
            return Err(EngineError::DuplicateId {
                kind: "source",
                id: id.to_string(),
            });
        }
        self.pending.push(MapCommand::AddSource {
            id: id.to_string(),
            source,
        });
        Ok(())
    }

    fn add_layer(&mut self, layer: LayerSpec) -> Result<(), EngineError> {
        if !self.layers.insert(layer.id.clone()) {
            return Err(EngineError::DuplicateId {
                kind: "layer",
                id: layer.id,
            });
        }
        self.pending.push(MapCommand::AddLayer { layer });
        Ok(())
    }

    fn set_paint_property(
        &mut self,
        layer: &str,
        name: &str,
        value: Value,
    ) -> Result<(), EngineError> {
        if !self.layers.contains(layer) {
            return Err(EngineError::MissingLayer(layer.to_string()));
        }
        self.pending.push(MapCommand::SetPaintProperty {
            layer: layer.to_string(),
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    fn set_center(&mut self, center: LngLat) {
        self.pending.push(MapCommand::SetCenter {
            center: center.into(),
        });
    }

    fn add_marker(&mut self, at: LngLat) {
        self.pending.push(MapCommand::AddMarker { at: at.into() });
    }

    fn set_cursor(&mut self, cursor: &str) {
        self.pending.push(MapCommand::SetCursor {
            cursor: cursor.to_string(),
        });
    }
}
