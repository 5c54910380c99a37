use crate::{Neighbor, NearestNeighbor};
use cloudpick_core::point::{self, Point3};
use cloudpick_core::PointCloud;

/// Brute-force nearest-neighbour search.
///
/// Scans every finite point in index order and keeps the first strictly
/// closer candidate, so equidistant points resolve to the lowest index.
#[derive(Debug, Clone)]
pub struct LinearIndex {
    points: Vec<(usize, Point3)>,
    num_points: usize,
}

impl LinearIndex {
    /// # Panics
    ///
    /// Panics if the cloud is empty.
    pub fn build(cloud: &PointCloud) -> Self {
        assert!(
            !cloud.is_empty(),
            "cannot build a spatial index over an empty point cloud"
        );

        let points = cloud
            .iter_points()
            .enumerate()
            .filter(|(_, p)| point::is_finite(p))
            .collect();

        Self {
            points,
            num_points: cloud.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.num_points
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    pub fn indexed_len(&self) -> usize {
        self.points.len()
    }
}

impl NearestNeighbor for LinearIndex {
    fn nearest(&self, query: &[f32; 3]) -> Option<Neighbor> {
        if !point::is_finite(query) {
            return None;
        }

        let mut best: Option<Neighbor> = None;
        for &(index, p) in &self.points {
            let distance_sq = point::squared_distance(query, &p);
            match best {
                Some(b) if b.distance_sq <= distance_sq => {}
                _ => {
                    best = Some(Neighbor { index, distance_sq });
                }
            }
        }
        best
    }
}
