#![forbid(unsafe_code)]

pub mod index;
pub mod kdtree;
pub mod linear;

pub use index::{NearestNeighbor, Neighbor, SpatialIndex, LINEAR_SCAN_THRESHOLD};
pub use kdtree::KdTree;
pub use linear::LinearIndex;
