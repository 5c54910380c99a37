#![forbid(unsafe_code)]

pub mod cloud;
pub mod cloud_view;
pub mod field;
pub mod point;
pub mod traits;

pub use cloud::{Colors, Normals, PointCloud};
pub use cloud_view::CloudView;
pub use field::{RawField, Scalar, ScalarKind};
pub use point::{Point3, Point3d};
pub use traits::PointSource;
