use crate::{KdTree, LinearIndex};
use cloudpick_core::PointCloud;

/// Clouds smaller than this are scanned linearly instead of building a tree.
pub const LINEAR_SCAN_THRESHOLD: usize = 64;

/// Result of a single-nearest-neighbour query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index of the matched point in the indexed cloud.
    pub index: usize,
    /// Squared Euclidean distance from the query to the matched point.
    pub distance_sq: f32,
}

/// Single-nearest-neighbour search over a fixed reference cloud.
///
/// Implementations must be deterministic: among equidistant candidates the
/// lowest index wins. `None` is returned only when the query has a
/// non-finite coordinate or the reference cloud has no finite point.
pub trait NearestNeighbor {
    fn nearest(&self, query: &[f32; 3]) -> Option<Neighbor>;
}

/// Nearest-neighbour index that picks its strategy from the cloud size.
#[derive(Debug, Clone)]
pub enum SpatialIndex {
    Linear(LinearIndex),
    Tree(KdTree),
}

impl SpatialIndex {
    /// # Panics
    ///
    /// Panics if the cloud is empty.
    pub fn build(cloud: &PointCloud) -> Self {
        if cloud.len() < LINEAR_SCAN_THRESHOLD {
            SpatialIndex::Linear(LinearIndex::build(cloud))
        } else {
            SpatialIndex::Tree(KdTree::build(cloud))
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SpatialIndex::Linear(index) => index.len(),
            SpatialIndex::Tree(tree) => tree.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of finite points a query can return.
    pub fn indexed_len(&self) -> usize {
        match self {
            SpatialIndex::Linear(index) => index.indexed_len(),
            SpatialIndex::Tree(tree) => tree.indexed_len(),
        }
    }
}

impl NearestNeighbor for SpatialIndex {
    fn nearest(&self, query: &[f32; 3]) -> Option<Neighbor> {
        match self {
            SpatialIndex::Linear(index) => index.nearest(query),
            SpatialIndex::Tree(tree) => tree.nearest(query),
        }
    }
}
