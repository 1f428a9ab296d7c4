//! Source/layer ids and layer specifications, shaped like the renderer's
//! style document so they can be forwarded to it untouched.

use crate::classify::FillStyle;
use geojson::GeoJson;
use serde::Serialize;
use serde_json::{json, Map, Value};

pub const CURSOR_POINTER: &str = "pointer";

/// Names of everything registered for one neighborhood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerIds {
    pub source: String,
    pub boundary: String,
    pub fill: String,
    pub label_source: String,
    pub label_layer: String,
}

impl LayerIds {
    pub fn for_neighborhood(id: &str) -> Self {
        Self {
            source: id.to_string(),
            boundary: format!("{id}-boundary"),
            fill: format!("{id}-fill"),
            label_source: format!("{id}-label"),
            label_layer: format!("{id}-label-layer"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Line,
    Fill,
    Symbol,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSpec {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: GeoJson,
}

impl SourceSpec {
    pub fn geojson(data: impl Into<GeoJson>) -> Self {
        Self {
            kind: "geojson",
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub source: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub layout: Map<String, Value>,
    pub paint: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryPaint {
    pub color: &'static str,
    pub width: f64,
    pub opacity: f64,
}

pub const BOUNDARY_DEFAULT: BoundaryPaint = BoundaryPaint {
    color: "#151515",
    width: 3.0,
    opacity: 0.2,
};

pub const BOUNDARY_SELECTED: BoundaryPaint = BoundaryPaint {
    color: "#4CA09C",
    width: 8.0,
    opacity: 1.0,
};

impl BoundaryPaint {
    pub fn for_selected(selected: bool) -> Self {
        if selected {
            BOUNDARY_SELECTED
        } else {
            BOUNDARY_DEFAULT
        }
    }

    pub fn properties(&self) -> [(&'static str, Value); 3] {
        [
            ("line-color", json!(self.color)),
            ("line-width", json!(self.width)),
            ("line-opacity", json!(self.opacity)),
        ]
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub fn boundary_layer(ids: &LayerIds) -> LayerSpec {
    LayerSpec {
        id: ids.boundary.clone(),
        kind: LayerKind::Line,
        source: ids.source.clone(),
        layout: Map::new(),
        paint: BOUNDARY_DEFAULT
            .properties()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    }
}

pub fn fill_layer(ids: &LayerIds, fill: FillStyle) -> LayerSpec {
    LayerSpec {
        id: ids.fill.clone(),
        kind: LayerKind::Fill,
        source: ids.source.clone(),
        layout: Map::new(),
        paint: object(json!({
            "fill-color": fill.color,
            "fill-opacity": fill.opacity,
        })),
    }
}

pub fn label_layer(ids: &LayerIds) -> LayerSpec {
    LayerSpec {
        id: ids.label_layer.clone(),
        kind: LayerKind::Symbol,
        source: ids.label_source.clone(),
        layout: object(json!({
            "text-field": ["get", "label"],
            "text-size": [
                "interpolate", ["linear"], ["zoom"],
                10, 14,
                14, 32,
                18, 60
            ],
            "text-anchor": "center",
        })),
        paint: object(json!({
            "text-color": "#ffffff",
            "text-halo-color": "#000000",
            "text-halo-width": 2,
        })),
    }
}
