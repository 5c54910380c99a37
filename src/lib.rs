//! Export the parts of source point clouds that are still shown after a
//! viewer has filtered, cropped or merged them.
//!
//! This crate re-exports the workspace members:
//!
//! - [`core`]: the point cloud container and the `PointSource` abstraction
//! - [`spatial`]: nearest-neighbour indices
//! - [`io`]: PCD and PLY readers and writers
//! - [`export`]: deduplication, correspondence and the export driver

#![forbid(unsafe_code)]

pub use cloudpick_core as core;
pub use cloudpick_export as export;
pub use cloudpick_io as io;
pub use cloudpick_spatial as spatial;

pub use cloudpick_core::{PointCloud, PointSource};
pub use cloudpick_export::{
    export_filtered_sources, ExportConfig, ExportError, ExportSummary, Exporter, SourceReference,
};
