use crate::extract::extract_points;
use cloudpick_core::{Point3d, PointSource};
use cloudpick_spatial::KdTree;
use hashbrown::HashSet;

/// Displayed geometry with coincident points merged.
#[derive(Debug, Clone, PartialEq)]
pub struct DeduplicatedGeometry {
    points: Vec<Point3d>,
    pruned: usize,
}

impl DeduplicatedGeometry {
    pub fn points(&self) -> &[Point3d] {
        &self.points
    }

    /// How many input points were merged away.
    pub fn pruned(&self) -> usize {
        self.pruned
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl PointSource for DeduplicatedGeometry {
    fn point_count(&self) -> usize {
        self.points.len()
    }

    fn point_at(&self, index: usize) -> Point3d {
        self.points[index]
    }
}

/// Merge points of `geometry` that lie within `tolerance` of each other.
///
/// The first occurrence of a point survives and absorbs every later point
/// within `tolerance` (inclusive), so the output is a subsequence of the
/// input and identical input always gives identical output.
///
/// With `tolerance == 0.0` only exactly coincident points merge, compared
/// in the source precision (`0.0` and `-0.0` count as coincident). With a
/// positive tolerance distances are measured in `f32`. Points with a
/// non-finite coordinate only merge with exact copies of themselves.
///
/// # Panics
///
/// Panics if `tolerance` is negative or not finite.
pub fn deduplicate<S: PointSource + ?Sized>(geometry: &S, tolerance: f64) -> DeduplicatedGeometry {
    assert!(
        tolerance.is_finite() && tolerance >= 0.0,
        "tolerance must be >= 0 and finite"
    );

    let n = geometry.point_count();
    let exact = merge_exact(geometry);
    let points = if tolerance > 0.0 && !exact.is_empty() {
        merge_within(exact, tolerance as f32)
    } else {
        exact
    };

    DeduplicatedGeometry {
        pruned: n - points.len(),
        points,
    }
}

fn merge_exact<S: PointSource + ?Sized>(geometry: &S) -> Vec<Point3d> {
    let n = geometry.point_count();
    let mut seen: HashSet<[u64; 3]> = HashSet::with_capacity(n);
    let mut kept = Vec::with_capacity(n);

    for i in 0..n {
        let p = geometry.point_at(i);
        // Adding +0.0 folds -0.0 into +0.0.
        let key = p.map(|v| (v + 0.0).to_bits());
        if seen.insert(key) {
            kept.push(p);
        }
    }
    kept
}

fn merge_within(points: Vec<Point3d>, radius: f32) -> Vec<Point3d> {
    let cloud = extract_points(&points);
    let tree = KdTree::build(&cloud);
    let mut absorbed = vec![false; points.len()];
    let mut kept = Vec::with_capacity(points.len());

    for (i, p) in points.into_iter().enumerate() {
        if absorbed[i] {
            continue;
        }
        kept.push(p);
        for j in tree.radius_search(&cloud.point(i), radius) {
            if j > i {
                absorbed[j] = true;
            }
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn exact_duplicates_collapse_to_first() {
        let pts: Vec<[f64; 3]> = vec![
            [1.0, 1.0, 1.0],
            [2.0, 2.0, 2.0],
            [1.0, 1.0, 1.0],
            [3.0, 3.0, 3.0],
            [2.0, 2.0, 2.0],
        ];
        let out = deduplicate(&pts, 0.0);
        assert_eq!(
            out.points(),
            &[[1.0, 1.0, 1.0], [2.0, 2.0, 2.0], [3.0, 3.0, 3.0]]
        );
        assert_eq!(out.pruned(), 2);
    }

    #[test]
    fn zero_tolerance_keeps_near_points() {
        let pts: Vec<[f64; 3]> = vec![[0.0, 0.0, 0.0], [1e-9, 0.0, 0.0]];
        let out = deduplicate(&pts, 0.0);
        assert_eq!(out.len(), 2);
        assert_eq!(out.pruned(), 0);
    }

    #[test]
    fn signed_zero_is_coincident() {
        let pts: Vec<[f64; 3]> = vec![[0.0, 0.0, 0.0], [-0.0, 0.0, -0.0]];
        assert_eq!(deduplicate(&pts, 0.0).len(), 1);
    }

    #[test]
    fn tolerance_merges_into_first_seen() {
        let pts: Vec<[f64; 3]> = vec![
            [0.0, 0.0, 0.0],
            [5.0, 0.0, 0.0],
            [0.05, 0.0, 0.0],
            [5.0, 0.1, 0.0],
            [0.2, 0.0, 0.0],
        ];
        let out = deduplicate(&pts, 0.1);
        assert_eq!(
            out.points(),
            &[[0.0, 0.0, 0.0], [5.0, 0.0, 0.0], [0.2, 0.0, 0.0]]
        );
        assert_eq!(out.pruned(), 2);
    }

    #[test]
    fn distinct_points_survive_tolerance() {
        let pts: Vec<[f64; 3]> = vec![[0.01, 0.0, 0.0], [5.0, 5.0, 5.01]];
        let out = deduplicate(&pts, 0.1);
        assert_eq!(out.len(), 2);
        assert_eq!(out.pruned(), 0);
    }

    #[test]
    fn invalid_points_are_kept() {
        let pts: Vec<[f64; 3]> = vec![[f64::NAN, 0.0, 0.0], [0.0, 0.0, 0.0], [f64::NAN, 0.0, 0.0]];
        let out = deduplicate(&pts, 0.5);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn empty_input() {
        let pts: Vec<[f64; 3]> = Vec::new();
        let out = deduplicate(&pts, 0.0);
        assert!(out.is_empty());
        assert_eq!(out.pruned(), 0);
        assert!(deduplicate(&pts, 1.0).is_empty());
    }

    #[test]
    #[should_panic(expected = "tolerance")]
    fn negative_tolerance_panics() {
        let pts: Vec<[f64; 3]> = vec![[0.0; 3]];
        let _ = deduplicate(&pts, -1.0);
    }

    #[test]
    fn input_is_untouched() {
        let pts: Vec<[f64; 3]> = vec![[1.0, 1.0, 1.0], [1.0, 1.0, 1.0]];
        let before = pts.clone();
        let _ = deduplicate(&pts, 0.0);
        assert_eq!(pts, before);
    }

    proptest! {
        #[test]
        fn exact_output_has_no_bit_identical_pair(
            pts in prop::collection::vec((0i32..5, 0i32..5, 0i32..5), 0..300)
        ) {
            let pts: Vec<[f64; 3]> = pts
                .into_iter()
                .map(|(a, b, c)| [a as f64 * 0.5, b as f64 * 0.5, c as f64 * 0.5])
                .collect();
            let out = deduplicate(&pts, 0.0);
            let unique: HashSet<[u64; 3]> =
                out.points().iter().map(|p| p.map(f64::to_bits)).collect();
            prop_assert_eq!(unique.len(), out.len());
            prop_assert_eq!(out.pruned(), pts.len() - out.len());
        }

        #[test]
        fn tolerance_output_is_well_separated(
            pts in prop::collection::vec(
                (-10.0f64..10.0, -10.0f64..10.0, -10.0f64..10.0),
                1..300
            ),
            tolerance in 0.05f64..2.0,
        ) {
            let pts: Vec<[f64; 3]> = pts.into_iter().map(|(a, b, c)| [a, b, c]).collect();
            let out = deduplicate(&pts, tolerance);
            let kept = out.points();
            // Slack covers narrowing to f32 before the distance check.
            let limit = (tolerance - 1e-4).powi(2);
            for i in 0..kept.len() {
                for j in (i + 1)..kept.len() {
                    let d: f64 = (0..3).map(|k| (kept[i][k] - kept[j][k]).powi(2)).sum();
                    prop_assert!(
                        d > limit,
                        "{:?} and {:?} are closer than {}",
                        kept[i],
                        kept[j],
                        tolerance
                    );
                }
            }
            prop_assert_eq!(out.pruned() + out.len(), pts.len());
        }
    }
}
