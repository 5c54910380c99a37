use cloudpick_core::point::narrow;
use cloudpick_core::{PointCloud, PointSource};

/// Copy every point of `source` into an owned, unorganized PointCloud.
///
/// Coordinates are narrowed to `f32` and copied verbatim; nothing is
/// filtered, so the result is flagged `is_dense = false` regardless of its
/// content.
pub fn extract_points<S: PointSource + ?Sized>(source: &S) -> PointCloud {
    let n = source.point_count();
    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    let mut z = Vec::with_capacity(n);

    for i in 0..n {
        let [px, py, pz] = narrow(source.point_at(i));
        x.push(px);
        y.push(py);
        z.push(pz);
    }

    let mut cloud = PointCloud::from_xyz(x, y, z);
    cloud.is_dense = false;
    cloud
}

#[cfg(test)]
mod tests {
    use super::extract_points;
    use cloudpick_core::CloudView;

    #[test]
    fn copies_points_in_order() {
        let pts: Vec<[f64; 3]> = vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        let cloud = extract_points(&pts);
        assert_eq!(cloud.len(), 3);
        assert_eq!(cloud.point(2), [7.0, 8.0, 9.0]);
        assert_eq!((cloud.width, cloud.height), (3, 1));
        assert!(!cloud.is_dense);
    }

    #[test]
    fn narrows_double_precision() {
        let pts: Vec<[f64; 3]> = vec![[0.1, 1.0 + 1e-12, -1e300]];
        let cloud = extract_points(&pts);
        assert_eq!(cloud.x[0], 0.1f32);
        assert_eq!(cloud.y[0], 1.0f32);
        assert_eq!(cloud.z[0], f32::NEG_INFINITY);
    }

    #[test]
    fn keeps_invalid_points() {
        let pts: Vec<[f64; 3]> = vec![[f64::NAN, 0.0, 0.0], [1.0, 1.0, 1.0]];
        let cloud = extract_points(&pts);
        assert_eq!(cloud.len(), 2);
        assert!(cloud.x[0].is_nan());
    }

    #[test]
    fn empty_source_gives_empty_cloud() {
        let view = CloudView::from_interleaved_xyz(&[], 0);
        let cloud = extract_points(&view);
        assert!(cloud.is_empty());
        assert_eq!((cloud.width, cloud.height), (0, 1));
    }
}
