/// A point in the working precision of the crate.
pub type Point3 = [f32; 3];

/// A point as exposed by geometry sources that keep higher precision.
pub type Point3d = [f64; 3];

/// Narrow a double-precision point to the working precision.
#[inline]
pub fn narrow(p: Point3d) -> Point3 {
    [p[0] as f32, p[1] as f32, p[2] as f32]
}

#[inline]
pub fn is_finite(p: &Point3) -> bool {
    p.iter().all(|v| v.is_finite())
}

#[inline]
pub fn squared_distance(a: &Point3, b: &Point3) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}
