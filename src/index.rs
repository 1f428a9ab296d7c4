use crate::types::Neighborhood;
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::{LineString, Point, Polygon};
use rstar::{RTree, RTreeObject, AABB};
use std::sync::Arc;

// Wrapper for RTree indexing
struct AreaIndex {
    index: usize,
    polygon: Polygon<f64>,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for AreaIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Point-in-neighborhood lookup.
pub struct HitIndex {
    neighborhoods: Arc<Vec<Neighborhood>>,
    tree: RTree<AreaIndex>,
}

impl HitIndex {
    pub fn build(neighborhoods: Arc<Vec<Neighborhood>>) -> Self {
        let items: Vec<AreaIndex> = neighborhoods
            .iter()
            .enumerate()
            .filter_map(|(i, n)| {
                let exterior: LineString<f64> =
                    n.ring.iter().map(|&[x, y]| (x, y)).collect::<Vec<_>>().into();
                let polygon = Polygon::new(exterior, vec![]);
                // Empty rings have no extent and can never be hit.
                let rect = polygon.bounding_rect()?;
                Some(AreaIndex {
                    index: i,
                    polygon,
                    aabb: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();

        Self {
            neighborhoods,
            tree: RTree::bulk_load(items),
        }
    }

    pub fn locate(&self, lon: f64, lat: f64) -> Option<&Neighborhood> {
        let point = Point::new(lon, lat);
        let envelope = AABB::from_point([lon, lat]);

        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|candidate| candidate.polygon.contains(&point))
            .min_by_key(|candidate| candidate.index)
            .and_then(|candidate| self.neighborhoods.get(candidate.index))
    }
}
