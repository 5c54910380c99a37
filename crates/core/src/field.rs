use std::fmt;

/// How the bytes of a raw field element are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Float,
    Unsigned,
    Signed,
}

impl ScalarKind {
    /// Whether `size` bytes is a valid element width for this kind.
    pub fn accepts_size(self, size: usize) -> bool {
        match self {
            ScalarKind::Float => matches!(size, 4 | 8),
            ScalarKind::Unsigned | ScalarKind::Signed => matches!(size, 1 | 2 | 4 | 8),
        }
    }
}

/// One element of a raw field, widened to its 64-bit family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    F32(f32),
    F64(f64),
    Unsigned(u64),
    Signed(i64),
}

impl Scalar {
    /// Parse a text token as an element of `kind` and `size` bytes.
    ///
    /// Returns `None` when the token is malformed or out of range.
    pub fn parse(kind: ScalarKind, size: usize, token: &str) -> Option<Self> {
        let bits = 8 * size as u32;
        match (kind, size) {
            (ScalarKind::Float, 4) => token.parse().ok().map(Scalar::F32),
            (ScalarKind::Float, 8) => token.parse().ok().map(Scalar::F64),
            (ScalarKind::Unsigned, 1 | 2 | 4 | 8) => {
                let v: u64 = token.parse().ok()?;
                (bits == 64 || v >> bits == 0).then_some(Scalar::Unsigned(v))
            }
            (ScalarKind::Signed, 1 | 2 | 4 | 8) => {
                let v: i64 = token.parse().ok()?;
                let fits = bits == 64 || {
                    let half = 1i64 << (bits - 1);
                    (-half..half).contains(&v)
                };
                fits.then_some(Scalar::Signed(v))
            }
            _ => None,
        }
    }

    /// Narrow a value read through an `f64` into an element of `kind`.
    ///
    /// Exact for every float and for integers of up to 32 bits.
    pub fn from_f64(kind: ScalarKind, size: usize, v: f64) -> Self {
        match (kind, size) {
            (ScalarKind::Float, 4) => Scalar::F32(v as f32),
            (ScalarKind::Float, _) => Scalar::F64(v),
            (ScalarKind::Unsigned, _) => Scalar::Unsigned(v as u64),
            (ScalarKind::Signed, _) => Scalar::Signed(v as i64),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::F32(v) => write!(f, "{}", v),
            Scalar::F64(v) => write!(f, "{}", v),
            Scalar::Unsigned(v) => write!(f, "{}", v),
            Scalar::Signed(v) => write!(f, "{}", v),
        }
    }
}

/// A per-point field kept as little-endian bytes, exactly as it was read.
///
/// Each point holds `count` elements of `size` bytes. Fields the cloud has
/// no typed column for travel through `select` and back to disk this way.
#[derive(Debug, Clone, PartialEq)]
pub struct RawField {
    pub name: String,
    pub kind: ScalarKind,
    pub size: usize,
    pub count: usize,
    data: Vec<u8>,
}

impl RawField {
    /// # Panics
    ///
    /// Panics if `size` is not a valid width for `kind` or `count` is zero.
    pub fn new(name: impl Into<String>, kind: ScalarKind, size: usize, count: usize) -> Self {
        assert!(kind.accepts_size(size), "invalid element size for field");
        assert!(count > 0, "field count must be positive");
        Self {
            name: name.into(),
            kind,
            size,
            count,
            data: Vec::new(),
        }
    }

    /// Reserve room for `points` more points.
    pub fn reserve(&mut self, points: usize) {
        self.data.reserve(points.saturating_mul(self.stride()));
    }

    /// Bytes per point.
    pub fn stride(&self) -> usize {
        self.size * self.count
    }

    /// Number of points stored.
    pub fn len(&self) -> usize {
        self.data.len() / self.stride()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append one point's bytes.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is not exactly one stride long.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        assert_eq!(bytes.len(), self.stride(), "point bytes must match field stride");
        self.data.extend_from_slice(bytes);
    }

    /// Append one element. Points are complete after `count` calls.
    pub fn push(&mut self, value: Scalar) {
        match value {
            Scalar::F32(v) => self.data.extend_from_slice(&v.to_le_bytes()),
            Scalar::F64(v) => self.data.extend_from_slice(&v.to_le_bytes()),
            Scalar::Unsigned(v) => self.data.extend_from_slice(&v.to_le_bytes()[..self.size]),
            Scalar::Signed(v) => self.data.extend_from_slice(&v.to_le_bytes()[..self.size]),
        }
    }

    /// The bytes of point `i`.
    pub fn point_bytes(&self, i: usize) -> &[u8] {
        let stride = self.stride();
        &self.data[i * stride..(i + 1) * stride]
    }

    /// Element `k` of point `i`.
    pub fn element(&self, i: usize, k: usize) -> Scalar {
        let start = i * self.stride() + k * self.size;
        let b = &self.data[start..start + self.size];
        let mut wide = [0u8; 8];
        wide[..self.size].copy_from_slice(b);
        match (self.kind, self.size) {
            (ScalarKind::Float, 4) => Scalar::F32(f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            (ScalarKind::Float, _) => Scalar::F64(f64::from_le_bytes(wide)),
            (ScalarKind::Unsigned, _) => Scalar::Unsigned(u64::from_le_bytes(wide)),
            (ScalarKind::Signed, size) => {
                let shift = 64 - 8 * size as u32;
                Scalar::Signed(((u64::from_le_bytes(wide) as i64) << shift) >> shift)
            }
        }
    }

    /// Copy the points at `indices`, in the given order.
    pub fn select(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.stride());
        for &idx in indices {
            data.extend_from_slice(self.point_bytes(idx));
        }
        Self {
            name: self.name.clone(),
            kind: self.kind,
            size: self.size,
            count: self.count,
            data,
        }
    }
}
