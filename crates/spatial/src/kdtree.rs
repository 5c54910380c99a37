use crate::{Neighbor, NearestNeighbor};
use cloudpick_core::point;
use cloudpick_core::PointCloud;
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use kiddo::float::distance::SquaredEuclidean;
use kiddo::immutable::float::kdtree::ImmutableKdTree;

/// A KdTree for nearest-neighbour queries on 3D point clouds.
///
/// Built on top of kiddo v5's `ImmutableKdTree`, which uses a cache-optimized
/// layout for faster queries than the mutable variant. The tree is built once
/// from a slice of points and cannot be modified afterwards.
///
/// Only finite, distinct points are inserted. kiddo numbers them by slice
/// position; `original` maps that position back to the lowest index of the
/// coordinate in the source PointCloud and `repeats` lists the higher
/// indices of repeated coordinates, so results always use the caller's
/// numbering.
#[derive(Debug, Clone)]
pub struct KdTree {
    tree: ImmutableKdTree<f32, u32, 3, 32>,
    original: Vec<u32>,
    repeats: HashMap<u32, Vec<u32>>,
    num_points: usize,
    num_finite: usize,
}

impl KdTree {
    /// Build a KdTree from a PointCloud.
    ///
    /// # Panics
    ///
    /// Panics if the cloud is empty or holds more than `u32::MAX` points.
    pub fn build(cloud: &PointCloud) -> Self {
        assert!(
            !cloud.is_empty(),
            "cannot build a spatial index over an empty point cloud"
        );
        assert!(
            cloud.len() <= u32::MAX as usize,
            "point cloud too large for u32 indices"
        );

        let mut points = Vec::with_capacity(cloud.len());
        let mut original = Vec::with_capacity(cloud.len());
        let mut repeats: HashMap<u32, Vec<u32>> = HashMap::new();
        let mut slots: HashMap<[u32; 3], u32> = HashMap::with_capacity(cloud.len());
        let mut num_finite = 0;

        for (i, p) in cloud.iter_points().enumerate() {
            if !point::is_finite(&p) {
                continue;
            }
            num_finite += 1;
            // +0.0 folds -0.0 into the same slot.
            let key = p.map(|v| (v + 0.0).to_bits());
            match slots.entry(key) {
                Entry::Occupied(slot) => repeats.entry(*slot.get()).or_default().push(i as u32),
                Entry::Vacant(slot) => {
                    slot.insert(points.len() as u32);
                    points.push(p);
                    original.push(i as u32);
                }
            }
        }

        let tree = ImmutableKdTree::new_from_slice(&points);

        Self {
            tree,
            original,
            repeats,
            num_points: cloud.len(),
            num_finite,
        }
    }

    /// Number of points in the source cloud, including non-finite ones.
    pub fn len(&self) -> usize {
        self.num_points
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    /// Number of finite points the tree can return.
    pub fn indexed_len(&self) -> usize {
        self.num_finite
    }

    #[inline]
    fn source_index(&self, item: u32) -> usize {
        self.original[item as usize] as usize
    }

    /// Find all points within `radius` (Euclidean distance) of `query`.
    ///
    /// Returns indices of points where `euclidean_dist <= radius`, sorted
    /// ascending.
    ///
    /// Edge cases:
    /// - Returns empty if radius <= 0, radius is non-finite, or query
    ///   contains NaN.
    pub fn radius_search(&self, query: &[f32; 3], radius: f32) -> Vec<usize> {
        if self.original.is_empty()
            || radius <= 0.0
            || !radius.is_finite()
            || !point::is_finite(query)
        {
            return Vec::new();
        }

        let radius_sq = radius * radius;

        // kiddo's `within_unsorted` uses strict `<`. To include points
        // exactly on the boundary (dist == radius), we query with a tiny
        // epsilon added, then post-filter with `<=`.
        let query_radius_sq = radius_sq + f32::EPSILON * radius_sq.max(1.0);

        let mut indices = Vec::new();
        for nn in self
            .tree
            .within_unsorted::<SquaredEuclidean>(query, query_radius_sq)
        {
            if nn.distance > radius_sq {
                continue;
            }
            indices.push(self.source_index(nn.item));
            if let Some(more) = self.repeats.get(&nn.item) {
                indices.extend(more.iter().map(|&i| i as usize));
            }
        }

        // Sort by index for deterministic output order
        indices.sort_unstable();
        indices
    }
}

impl NearestNeighbor for KdTree {
    fn nearest(&self, query: &[f32; 3]) -> Option<Neighbor> {
        if self.original.is_empty() || !point::is_finite(query) {
            return None;
        }

        let best = self.tree.nearest_one::<SquaredEuclidean>(query);

        // kiddo returns an arbitrary member of an equidistant group. Collect
        // the whole group (strict `<` again, so widen by one ulp) and keep
        // the lowest index.
        let bound = f32::from_bits(best.distance.to_bits() + 1);
        let index = self
            .tree
            .within_unsorted::<SquaredEuclidean>(query, bound)
            .into_iter()
            .filter(|nn| nn.distance <= best.distance)
            .map(|nn| self.source_index(nn.item))
            .min()
            .unwrap_or_else(|| self.source_index(best.item));

        Some(Neighbor {
            index,
            distance_sq: best.distance,
        })
    }
}
