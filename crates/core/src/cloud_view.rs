/// A borrowed view over an interleaved vertex buffer.
///
/// Render backends usually hand out vertices as one flat `f32` buffer where
/// each vertex starts with `x y z` and may carry further attributes
/// (normals, uv, packed color). `stride` is the number of floats per vertex.
#[derive(Debug, Clone, Copy)]
pub struct CloudView<'a> {
    data: &'a [f32],
    stride: usize,
    num_points: usize,
}

impl<'a> CloudView<'a> {
    /// View a tightly packed `x y z x y z ...` buffer.
    pub fn from_interleaved_xyz(data: &'a [f32], num_points: usize) -> Self {
        assert_eq!(
            data.len(),
            num_points * 3,
            "view source must have num_points * 3 floats"
        );
        Self {
            data,
            stride: 3,
            num_points,
        }
    }

    /// View a vertex buffer with `stride` floats per vertex, position first.
    ///
    /// A trailing partial vertex is ignored.
    pub fn with_stride(data: &'a [f32], stride: usize) -> Self {
        assert!(stride >= 3, "stride must cover x, y and z");
        Self {
            data,
            stride,
            num_points: data.len() / stride,
        }
    }

    pub fn len(&self) -> usize {
        self.num_points
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn point(&self, i: usize) -> [f32; 3] {
        assert!(i < self.num_points, "index out of bounds");
        let base = i * self.stride;
        [self.data[base], self.data[base + 1], self.data[base + 2]]
    }

    pub fn iter_points(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.data
            .chunks_exact(self.stride)
            .take(self.num_points)
            .map(|c| [c[0], c[1], c[2]])
    }
}

#[cfg(test)]
mod tests {
    use super::CloudView;

    #[test]
    fn packed_view_reads_points() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let view = CloudView::from_interleaved_xyz(&data, 2);
        assert_eq!(view.len(), 2);
        assert_eq!(view.point(1), [4.0, 5.0, 6.0]);
    }

    #[test]
    fn strided_view_skips_attributes() {
        // x y z nx ny nz per vertex, plus a dangling partial vertex
        let data = [
            1.0, 2.0, 3.0, 0.0, 0.0, 1.0, //
            4.0, 5.0, 6.0, 0.0, 1.0, 0.0, //
            9.0, 9.0,
        ];
        let view = CloudView::with_stride(&data, 6);
        assert_eq!(view.len(), 2);
        let pts: Vec<[f32; 3]> = view.iter_points().collect();
        assert_eq!(pts, vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    }

    #[test]
    fn empty_view() {
        let view = CloudView::from_interleaved_xyz(&[], 0);
        assert!(view.is_empty());
        assert!(view.iter_points().next().is_none());
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn point_out_of_bounds_panics() {
        let data = [0.0; 3];
        let view = CloudView::from_interleaved_xyz(&data, 1);
        let _ = view.point(1);
    }

    #[test]
    #[should_panic(expected = "stride")]
    fn stride_below_three_panics() {
        let _ = CloudView::with_stride(&[0.0; 4], 2);
    }
}
