use cloudpick_core::{Point3, PointCloud};
use cloudpick_spatial::{NearestNeighbor, SpatialIndex};
use rayon::prelude::*;

/// Sorted, duplicate-free indices into a reference cloud.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrespondenceIndexSet(Vec<usize>);

impl CorrespondenceIndexSet {
    /// Build a set from arbitrary indices, sorting and deduplicating them.
    pub fn from_unsorted(mut indices: Vec<usize>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Self(indices)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0.binary_search(&index).is_ok()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, usize> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a CorrespondenceIndexSet {
    type Item = &'a usize;
    type IntoIter = std::slice::Iter<'a, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// For every displayed point, find the nearest point of `reference` and
/// return the distinct reference indices that were hit.
///
/// Invalid displayed points contribute nothing. An empty `displayed` cloud
/// yields an empty set without touching `reference`.
///
/// # Panics
///
/// Panics if `displayed` is non-empty and `reference` is empty.
pub fn resolve_correspondence(
    displayed: &PointCloud,
    reference: &PointCloud,
) -> CorrespondenceIndexSet {
    if displayed.is_empty() {
        return CorrespondenceIndexSet::default();
    }
    let index = SpatialIndex::build(reference);
    tracing::trace!(
        points = index.len(),
        indexed = index.indexed_len(),
        queries = displayed.len(),
        "built reference index"
    );
    resolve_with(&index, displayed)
}

/// Same as [`resolve_correspondence`] against a prebuilt index.
pub fn resolve_with<I>(index: &I, displayed: &PointCloud) -> CorrespondenceIndexSet
where
    I: NearestNeighbor + Sync,
{
    let queries: Vec<Point3> = displayed.iter_points().collect();
    let hits: Vec<usize> = queries
        .par_iter()
        .filter_map(|q| index.nearest(q).map(|nn| nn.index))
        .collect();
    CorrespondenceIndexSet::from_unsorted(hits)
}
