use crate::classify;
use crate::engine::{EngineError, MapEngine};
use crate::feature;
use crate::geolocation::{GeolocationError, GeolocationRequest, Outcome};
use crate::style::{self, BoundaryPaint, LayerIds, LayerSpec, SourceSpec, CURSOR_POINTER};
use crate::types::{LngLat, Neighborhood};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "id", rename_all = "camelCase")]
pub enum Selection {
    #[default]
    Unselected,
    Selected(String),
}

impl Selection {
    /// Next state after a click on `clicked`'s fill.
    pub fn toggle(&self, clicked: &str) -> Selection {
        match self {
            Selection::Selected(current) if current == clicked => Selection::Unselected,
            _ => Selection::Selected(clicked.to_string()),
        }
    }

    pub fn selected_id(&self) -> Option<&str> {
        match self {
            Selection::Selected(id) => Some(id),
            Selection::Unselected => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("map has not finished loading")]
    NotReady,
    #[error("unknown neighborhood `{0}`")]
    UnknownNeighborhood(String),
    #[error("view has been torn down")]
    Detached,
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Owns the map handle for the lifetime of one mounted view.
pub struct ViewController<E: MapEngine> {
    engine: Option<E>,
    neighborhoods: Arc<Vec<Neighborhood>>,
    selection: Selection,
    registered: bool,
    center: LngLat,
    geolocation: GeolocationRequest,
}

impl<E: MapEngine> ViewController<E> {
    pub fn mount(engine: E, neighborhoods: Arc<Vec<Neighborhood>>, default_center: LngLat) -> Self {
        Self {
            engine: Some(engine),
            neighborhoods,
            selection: Selection::Unselected,
            registered: false,
            center: default_center,
            geolocation: GeolocationRequest::new(default_center),
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn center(&self) -> LngLat {
        self.center
    }

    pub fn engine_mut(&mut self) -> Option<&mut E> {
        self.engine.as_mut()
    }

    /// Releases the map handle. Anything arriving afterwards is refused.
    pub fn teardown(&mut self) -> Option<E> {
        self.registered = false;
        self.engine.take()
    }

    /// Runs once the renderer reports it has loaded. Safe to call again.
    pub fn on_ready(&mut self) -> Result<(), ControllerError> {
        let engine = self.engine.as_mut().ok_or(ControllerError::Detached)?;
        if !engine.is_loaded() {
            return Err(ControllerError::NotReady);
        }

        for neighborhood in self.neighborhoods.iter() {
            register_neighborhood(engine, neighborhood)?;
        }
        self.registered = true;

        info!(count = self.neighborhoods.len(), "neighborhood layers registered");
        Ok(())
    }

    pub fn click(&mut self, id: &str) -> Result<&Selection, ControllerError> {
        if !self.neighborhoods.iter().any(|n| n.id == id) {
            return Err(ControllerError::UnknownNeighborhood(id.to_string()));
        }
        let engine = self.engine.as_mut().ok_or(ControllerError::Detached)?;
        if !self.registered {
            return Err(ControllerError::NotReady);
        }

        let next = self.selection.toggle(id);

        if let Some(previous) = self.selection.selected_id() {
            if next.selected_id() != Some(previous) {
                restyle_boundary(engine, previous, false)?;
            }
        }
        if let Some(selected) = next.selected_id() {
            restyle_boundary(engine, selected, true)?;
        }

        debug!(from = ?self.selection, to = ?next, "selection changed");
        self.selection = next;
        Ok(&self.selection)
    }

    /// Pointer enters (`Some`) or leaves (`None`) a fill region.
    pub fn hover(&mut self, id: Option<&str>) -> Result<(), ControllerError> {
        let engine = self.engine.as_mut().ok_or(ControllerError::Detached)?;
        if !self.registered {
            return Err(ControllerError::NotReady);
        }
        match id {
            Some(_) => engine.set_cursor(CURSOR_POINTER),
            None => engine.set_cursor(""),
        }
        Ok(())
    }

    /// Answer to the position request made at mount.
    pub fn apply_position(
        &mut self,
        result: Result<LngLat, GeolocationError>,
    ) -> Result<Option<Outcome>, ControllerError> {
        let engine = self.engine.as_mut().ok_or(ControllerError::Detached)?;

        let outcome = self.geolocation.resolve(result);
        if let Some(Outcome::Recenter(position)) = outcome {
            engine.set_center(position);
            engine.add_marker(position);
            self.center = position;
        }
        Ok(outcome)
    }
}

fn ensure_source<E: MapEngine>(
    engine: &mut E,
    id: &str,
    build: impl FnOnce() -> SourceSpec,
) -> Result<(), EngineError> {
    if !engine.has_source(id) {
        engine.add_source(id, build())?;
    }
    Ok(())
}

fn ensure_layer<E: MapEngine>(
    engine: &mut E,
    id: &str,
    build: impl FnOnce() -> LayerSpec,
) -> Result<(), EngineError> {
    if !engine.has_layer(id) {
        engine.add_layer(build())?;
    }
    Ok(())
}

/// Source, boundary, fill, label source and label layer for one neighborhood.
pub fn register_neighborhood<E: MapEngine>(
    engine: &mut E,
    neighborhood: &Neighborhood,
) -> Result<(), EngineError> {
    let ids = LayerIds::for_neighborhood(&neighborhood.id);

    ensure_source(engine, &ids.source, || {
        SourceSpec::geojson(feature::polygon_feature(&neighborhood.ring))
    })?;
    ensure_layer(engine, &ids.boundary, || style::boundary_layer(&ids))?;
    ensure_layer(engine, &ids.fill, || {
        style::fill_layer(&ids, classify::classify(&neighborhood.label))
    })?;
    ensure_source(engine, &ids.label_source, || {
        SourceSpec::geojson(feature::label_collection(
            neighborhood.centroid,
            &neighborhood.label,
        ))
    })?;
    ensure_layer(engine, &ids.label_layer, || style::label_layer(&ids))?;

    Ok(())
}

fn restyle_boundary<E: MapEngine>(
    engine: &mut E,
    id: &str,
    selected: bool,
) -> Result<(), EngineError> {
    let layer = LayerIds::for_neighborhood(id).boundary;
    if !engine.has_layer(&layer) {
        debug!(%layer, "boundary layer missing, not restyling");
        return Ok(());
    }
    for (name, value) in BoundaryPaint::for_selected(selected).properties() {
        engine.set_paint_property(&layer, name, value)?;
    }
    Ok(())
}
