use crate::field::RawField;
use crate::point::Point3;

/// A structure-of-arrays point cloud with optional per-point fields.
///
/// `width` and `height` describe the shape: an unorganized cloud has
/// `height == 1` and `width == len()`. `is_dense` is true when no coordinate
/// is NaN or infinite. `extra` holds per-point fields kept as raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
    pub normals: Option<Normals>,
    pub colors: Option<Colors>,
    pub intensity: Option<Vec<f32>>,
    pub extra: Vec<RawField>,
    pub width: usize,
    pub height: usize,
    pub is_dense: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normals {
    pub nx: Vec<f32>,
    pub ny: Vec<f32>,
    pub nz: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Colors {
    pub r: Vec<u8>,
    pub g: Vec<u8>,
    pub b: Vec<u8>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            normals: None,
            colors: None,
            intensity: None,
            extra: Vec::new(),
            width: 0,
            height: 1,
            is_dense: true,
        }
    }

    pub fn from_xyz(x: Vec<f32>, y: Vec<f32>, z: Vec<f32>) -> Self {
        assert_eq!(x.len(), y.len(), "x and y must have same length");
        assert_eq!(x.len(), z.len(), "x and z must have same length");

        let is_dense = x
            .iter()
            .zip(&y)
            .zip(&z)
            .all(|((x, y), z)| x.is_finite() && y.is_finite() && z.is_finite());
        let width = x.len();

        Self {
            x,
            y,
            z,
            normals: None,
            colors: None,
            intensity: None,
            extra: Vec::new(),
            width,
            height: 1,
            is_dense,
        }
    }

    pub fn from_points(points: &[Point3]) -> Self {
        let mut x = Vec::with_capacity(points.len());
        let mut y = Vec::with_capacity(points.len());
        let mut z = Vec::with_capacity(points.len());

        for p in points {
            x.push(p[0]);
            y.push(p[1]);
            z.push(p[2]);
        }

        Self::from_xyz(x, y, z)
    }

    /// Reshape the cloud as `height` rows of `width` points.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` differs from the number of points.
    pub fn set_shape(&mut self, width: usize, height: usize) {
        assert_eq!(
            width * height,
            self.len(),
            "width * height must equal the number of points"
        );
        self.width = width;
        self.height = height;
    }

    pub fn len(&self) -> usize {
        debug_assert_eq!(self.x.len(), self.y.len());
        debug_assert_eq!(self.x.len(), self.z.len());
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn is_organized(&self) -> bool {
        self.height > 1
    }

    pub fn shape_is_consistent(&self) -> bool {
        self.width * self.height == self.len()
    }

    pub fn point(&self, i: usize) -> Point3 {
        [self.x[i], self.y[i], self.z[i]]
    }

    pub fn iter_points(&self) -> impl Iterator<Item = Point3> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .map(|((x, y), z)| [*x, *y, *z])
    }

    /// The raw field called `name`, if the cloud carries one.
    pub fn extra_field(&self, name: &str) -> Option<&RawField> {
        self.extra.iter().find(|f| f.name == name)
    }

    /// Copy the points at `indices`, in the given order, together with
    /// every optional per-point field the cloud carries.
    ///
    /// The result is unorganized (`height == 1`) and inherits `is_dense`.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    pub fn select(&self, indices: &[usize]) -> Self {
        let mut x = Vec::with_capacity(indices.len());
        let mut y = Vec::with_capacity(indices.len());
        let mut z = Vec::with_capacity(indices.len());

        for &idx in indices {
            assert!(idx < self.len(), "index out of bounds in select");
            x.push(self.x[idx]);
            y.push(self.y[idx]);
            z.push(self.z[idx]);
        }

        let normals = self.normals.as_ref().map(|n| Normals {
            nx: indices.iter().map(|&idx| n.nx[idx]).collect(),
            ny: indices.iter().map(|&idx| n.ny[idx]).collect(),
            nz: indices.iter().map(|&idx| n.nz[idx]).collect(),
        });

        let colors = self.colors.as_ref().map(|c| Colors {
            r: indices.iter().map(|&idx| c.r[idx]).collect(),
            g: indices.iter().map(|&idx| c.g[idx]).collect(),
            b: indices.iter().map(|&idx| c.b[idx]).collect(),
        });

        let intensity = self
            .intensity
            .as_ref()
            .map(|it| indices.iter().map(|&idx| it[idx]).collect());

        let extra = self.extra.iter().map(|f| f.select(indices)).collect();

        Self {
            x,
            y,
            z,
            normals,
            colors,
            intensity,
            extra,
            width: indices.len(),
            height: 1,
            is_dense: self.is_dense,
        }
    }

}

impl Default for PointCloud {
    fn default() -> Self {
        Self::new()
    }
}
