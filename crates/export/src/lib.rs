//! Export the parts of source point clouds that are currently displayed.
//!
//! The displayed geometry is deduplicated, every displayed point is matched
//! to its nearest neighbour in each source cloud, and the matched source
//! points (with all their fields) are written to numbered output files.

#![forbid(unsafe_code)]

pub mod config;
pub mod correspondence;
pub mod dedup;
pub mod error;
pub mod export;
pub mod extract;
pub mod report;
pub mod source;
pub mod store;

pub use config::ExportConfig;
pub use correspondence::{resolve_correspondence, resolve_with, CorrespondenceIndexSet};
pub use dedup::{deduplicate, DeduplicatedGeometry};
pub use error::{ExportError, Result};
pub use export::{export_filtered_sources, ExportSummary, ExportedFile, Exporter};
pub use extract::extract_points;
pub use report::{ExportEvent, Reporter, TracingReporter};
pub use source::{source_path_from_display_name, SourceReference};
pub use store::{CloudStore, FileStore};
