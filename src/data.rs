use crate::config::AppConfig;
use crate::types::Neighborhood;
use anyhow::{anyhow, bail, Context, Result};
use geo::{Centroid, LineString, Point, Polygon};
use geojson::{GeoJson, Value};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

struct Boundary {
    id: &'static str,
    label: &'static str,
    centroid: [f64; 2],
    ring: &'static [[f64; 2]],
}

const PARK_SLOPE: Boundary = Boundary {
    id: "park-slope",
    label: "25%",
    // Approximate, picked by eye
    centroid: [-73.9817, 40.6707],
    ring: &[
        [-73.97806687548409, 40.68488419266882],
        [-73.98389395483494, 40.67614930054148],
        [-73.99288748480325, 40.66539216409436],
        [-73.98935216289065, 40.66311225566585],
        [-73.98657756979759, 40.65963069951647],
        [-73.98311359847479, 40.65740854131997],
        [-73.97959847321171, 40.66130629205787],
        [-73.97423027092445, 40.667796716952864],
        [-73.97131679315545, 40.671264059853],
        [-73.96993980243529, 40.673413233034694],
        [-73.9710764599761, 40.675272513337006],
        [-73.97806687548409, 40.68488419266882],
    ],
};

// The areas below share edges with Park Slope (and Gowanus with Carroll
// Gardens) so that no point lies inside two fills.
const GOWANUS: Boundary = Boundary {
    id: "gowanus",
    label: "0%",
    centroid: [-73.9895, 40.6769],
    ring: &[
        [-73.97806687548409, 40.68488419266882],
        [-73.9870, 40.6870],
        [-73.9960, 40.6780],
        [-73.9990, 40.6700],
        [-73.99288748480325, 40.66539216409436],
        [-73.98389395483494, 40.67614930054148],
        [-73.97806687548409, 40.68488419266882],
    ],
};

const CARROLL_GARDENS: Boundary = Boundary {
    id: "carroll-gardens",
    label: "85%",
    centroid: [-73.9976, 40.6798],
    ring: &[
        [-73.9870, 40.6870],
        [-73.9960, 40.6780],
        [-73.9990, 40.6700],
        [-74.0060, 40.6760],
        [-74.0000, 40.6880],
        [-73.9870, 40.6870],
    ],
};

const PROSPECT_HEIGHTS: Boundary = Boundary {
    id: "prospect-heights",
    label: "55%",
    centroid: [-73.9695, 40.6791],
    ring: &[
        [-73.97806687548409, 40.68488419266882],
        [-73.9710764599761, 40.675272513337006],
        [-73.96993980243529, 40.673413233034694],
        [-73.9620, 40.6740],
        [-73.9640, 40.6810],
        [-73.9720, 40.6860],
        [-73.97806687548409, 40.68488419266882],
    ],
};

const WINDSOR_TERRACE: Boundary = Boundary {
    id: "windsor-terrace",
    label: "100%",
    centroid: [-73.9767, 40.6596],
    ring: &[
        [-73.97423027092445, 40.667796716952864],
        [-73.97959847321171, 40.66130629205787],
        [-73.98311359847479, 40.65740854131997],
        [-73.9810, 40.6510],
        [-73.9720, 40.6560],
        [-73.9700, 40.6640],
        [-73.97423027092445, 40.667796716952864],
    ],
};

const BOUNDARIES: &[Boundary] = &[
    PARK_SLOPE,
    GOWANUS,
    CARROLL_GARDENS,
    PROSPECT_HEIGHTS,
    WINDSOR_TERRACE,
];

pub fn builtin() -> Vec<Neighborhood> {
    BOUNDARIES
        .iter()
        .map(|b| Neighborhood {
            id: b.id.to_string(),
            ring: b.ring.to_vec(),
            label: b.label.to_string(),
            centroid: Point::new(b.centroid[0], b.centroid[1]),
        })
        .collect()
}

pub fn load_neighborhoods(config: &AppConfig) -> Result<Vec<Neighborhood>> {
    let neighborhoods = match &config.input.neighborhoods {
        Some(path) => load_geojson(path)?,
        None => builtin(),
    };

    let mut seen = HashSet::new();
    for n in &neighborhoods {
        if !seen.insert(n.id.as_str()) {
            bail!("Duplicate neighborhood id: {}", n.id);
        }
    }

    info!(count = neighborhoods.len(), "loaded neighborhoods");
    Ok(neighborhoods)
}

fn load_geojson(path: &Path) -> Result<Vec<Neighborhood>> {
    info!(?path, "loading neighborhoods from GeoJSON");
    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let geojson = GeoJson::from_reader(BufReader::new(file)).context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut neighborhoods = Vec::new();

    for feature in collection.features {
        let props = feature.properties.as_ref();

        let id = match props.and_then(|p| p.get("id")) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => {
                warn!("skipping feature without an id");
                continue;
            }
        };

        // Missing labels are kept; the classifier styles them with its fallback.
        let label = props
            .and_then(|p| p.get("label"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        // Only single-ring polygons are drawn: holes are dropped and
        // multi-part shapes skipped.
        let rings = match feature.geometry.map(|g| g.value) {
            Some(Value::Polygon(rings)) => rings,
            Some(Value::MultiPolygon(mut parts)) if parts.len() == 1 => parts.remove(0),
            Some(Value::MultiPolygon(parts)) => {
                warn!(%id, parts = parts.len(), "skipping multi-part polygon");
                continue;
            }
            _ => {
                warn!(%id, "skipping non-polygon feature");
                continue;
            }
        };
        if rings.len() > 1 {
            warn!(%id, holes = rings.len() - 1, "dropping interior rings");
        }
        let ring = match rings.into_iter().next() {
            Some(outer) => outer
                .into_iter()
                .filter(|pos| pos.len() >= 2)
                .map(|pos| [pos[0], pos[1]])
                .collect::<Vec<_>>(),
            None => continue,
        };

        let centroid = match props.and_then(|p| p.get("centroid")) {
            Some(value) => {
                let [lon, lat]: [f64; 2] = serde_json::from_value(value.clone())
                    .with_context(|| format!("Bad centroid for neighborhood {}", id))?;
                Point::new(lon, lat)
            }
            None => ring_centroid(&ring)
                .ok_or_else(|| anyhow!("Cannot place label for neighborhood {}", id))?,
        };

        let neighborhood = Neighborhood {
            id,
            ring,
            label,
            centroid,
        };
        if !neighborhood.is_closed() {
            warn!(id = %neighborhood.id, "ring is not closed");
        }
        neighborhoods.push(neighborhood);
    }

    Ok(neighborhoods)
}

fn ring_centroid(ring: &[[f64; 2]]) -> Option<Point<f64>> {
    let exterior: LineString<f64> = ring.iter().map(|&[x, y]| (x, y)).collect::<Vec<_>>().into();
    Polygon::new(exterior, vec![]).centroid()
}
