use crate::classify;
use crate::types::Neighborhood;
use geo::Point;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};

/// Wraps `ring` as the outer ring of a Polygon feature. Closure and winding
/// are left to the renderer.
pub fn polygon_feature(ring: &[[f64; 2]]) -> Feature {
    let outer = ring.iter().map(|&[lon, lat]| vec![lon, lat]).collect();
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Polygon(vec![outer]))),
        id: None,
        properties: None,
        foreign_members: None,
    }
}

pub fn label_collection(centroid: Point<f64>, label: &str) -> FeatureCollection {
    let mut properties = JsonObject::new();
    properties.insert("label".to_string(), label.into());

    FeatureCollection {
        bbox: None,
        features: vec![Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(vec![centroid.x(), centroid.y()]))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }],
        foreign_members: None,
    }
}

/// All neighborhoods as one collection, each carrying its fill style.
pub fn neighborhood_collection(neighborhoods: &[Neighborhood]) -> FeatureCollection {
    let features = neighborhoods
        .iter()
        .map(|n| {
            let fill = classify::classify(&n.label);
            let mut properties = JsonObject::new();
            properties.insert("id".to_string(), n.id.as_str().into());
            properties.insert("label".to_string(), n.label.as_str().into());
            properties.insert("fill_color".to_string(), fill.color.into());
            properties.insert("fill_opacity".to_string(), fill.opacity.into());

            let mut feature = polygon_feature(&n.ring);
            feature.properties = Some(properties);
            feature
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
