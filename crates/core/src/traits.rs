use crate::{CloudView, Point3d, PointCloud};

/// Read-only access to an externally owned point set.
///
/// This is the only capability the export pipeline needs from a rendering
/// backend: how many points there are and where each one is. Coordinates
/// are reported in double precision so backends that store `f64` lose
/// nothing until the pipeline narrows them.
pub trait PointSource {
    fn point_count(&self) -> usize;

    /// # Panics
    ///
    /// Implementations panic if `index >= point_count()`.
    fn point_at(&self, index: usize) -> Point3d;
}

impl<T: PointSource + ?Sized> PointSource for &T {
    fn point_count(&self) -> usize {
        (**self).point_count()
    }

    fn point_at(&self, index: usize) -> Point3d {
        (**self).point_at(index)
    }
}

impl PointSource for PointCloud {
    fn point_count(&self) -> usize {
        self.len()
    }

    fn point_at(&self, index: usize) -> Point3d {
        let [x, y, z] = self.point(index);
        [x as f64, y as f64, z as f64]
    }
}

impl PointSource for CloudView<'_> {
    fn point_count(&self) -> usize {
        self.len()
    }

    fn point_at(&self, index: usize) -> Point3d {
        let [x, y, z] = self.point(index);
        [x as f64, y as f64, z as f64]
    }
}

impl PointSource for [Point3d] {
    fn point_count(&self) -> usize {
        self.len()
    }

    fn point_at(&self, index: usize) -> Point3d {
        self[index]
    }
}

impl PointSource for Vec<Point3d> {
    fn point_count(&self) -> usize {
        self.len()
    }

    fn point_at(&self, index: usize) -> Point3d {
        self[index]
    }
}

impl PointSource for [[f32; 3]] {
    fn point_count(&self) -> usize {
        self.len()
    }

    fn point_at(&self, index: usize) -> Point3d {
        let [x, y, z] = self[index];
        [x as f64, y as f64, z as f64]
    }
}

#[cfg(test)]
mod tests {
    use super::PointSource;
    use crate::{CloudView, PointCloud};

    fn collect<S: PointSource + ?Sized>(src: &S) -> Vec<[f64; 3]> {
        (0..src.point_count()).map(|i| src.point_at(i)).collect()
    }

    #[test]
    fn cloud_and_view_agree() {
        let cloud = PointCloud::from_xyz(vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]);
        let flat = [1.0, 3.0, 5.0, 2.0, 4.0, 6.0];
        let view = CloudView::from_interleaved_xyz(&flat, 2);
        assert_eq!(collect(&cloud), collect(&view));
        assert_eq!(collect(&view), vec![[1.0, 3.0, 5.0], [2.0, 4.0, 6.0]]);
    }

    #[test]
    fn slices_are_sources() {
        let pts: Vec<[f64; 3]> = vec![[0.5, 1.5, 2.5]];
        assert_eq!(pts.point_count(), 1);
        assert_eq!(pts.as_slice().point_at(0), [0.5, 1.5, 2.5]);

        let single: &[[f32; 3]] = &[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        assert_eq!(collect(single), vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    }

    #[test]
    fn references_forward() {
        let cloud = PointCloud::from_xyz(vec![7.0], vec![8.0], vec![9.0]);
        let by_ref = &cloud;
        assert_eq!(by_ref.point_count(), 1);
        assert_eq!(PointSource::point_at(&by_ref, 0), [7.0, 8.0, 9.0]);
    }
}
