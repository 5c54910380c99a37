use crate::config::ExportConfig;
use crate::correspondence::{resolve_correspondence, CorrespondenceIndexSet};
use crate::dedup::deduplicate;
use crate::error::{ExportError, Result};
use crate::extract::extract_points;
use crate::report::{ExportEvent, Reporter, TracingReporter};
use crate::source::SourceReference;
use crate::store::{CloudStore, FileStore};
use cloudpick_core::{PointCloud, PointSource};
use std::path::{Path, PathBuf};

/// One written output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Points in the source cloud.
    pub source_points: usize,
    /// Points written to the output.
    pub matched: usize,
}

/// What an export run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Displayed points left after merging duplicates.
    pub displayed: usize,
    pub pruned: usize,
    pub outputs: Vec<ExportedFile>,
}

/// Writes, for each displayed source cloud, the subset of its original
/// points that correspond to the currently displayed geometry.
#[derive(Debug)]
pub struct Exporter<S, R = TracingReporter> {
    store: S,
    reporter: R,
    config: ExportConfig,
}

impl<S: CloudStore> Exporter<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            reporter: TracingReporter,
            config: ExportConfig::default(),
        }
    }
}

impl<S: CloudStore, R: Reporter> Exporter<S, R> {
    pub fn with_config(mut self, config: ExportConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_reporter<R2: Reporter>(self, reporter: R2) -> Exporter<S, R2> {
        Exporter {
            store: self.store,
            reporter,
            config: self.config,
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Export every entry of `sources` that names a source file.
    ///
    /// Outputs are numbered `<output_prefix>1.<ext>`, `<output_prefix>2.<ext>`
    /// and so on, in the order of `sources`, counting only the entries that
    /// were exported. Processing stops at the first load or save failure;
    /// outputs written before it stay on disk.
    pub fn run<G>(
        &mut self,
        geometry: &G,
        sources: &[SourceReference],
        output_prefix: &str,
    ) -> Result<ExportSummary>
    where
        G: PointSource + ?Sized,
    {
        let result = self.try_run(geometry, sources, output_prefix);
        if let Err(error) = &result {
            self.reporter.report(&ExportEvent::Failed { error });
        }
        result
    }

    fn try_run<G>(
        &mut self,
        geometry: &G,
        sources: &[SourceReference],
        output_prefix: &str,
    ) -> Result<ExportSummary>
    where
        G: PointSource + ?Sized,
    {
        self.config.validate()?;

        let merged = deduplicate(geometry, self.config.tolerance);
        if merged.pruned() > 0 {
            self.reporter.report(&ExportEvent::Pruned {
                pruned: merged.pruned(),
                remaining: merged.len(),
            });
        }
        let displayed = extract_points(&merged);

        let mut summary = ExportSummary {
            displayed: displayed.len(),
            pruned: merged.pruned(),
            outputs: Vec::new(),
        };

        for entry in sources {
            let Some(source) = entry.source_path() else {
                self.reporter.report(&ExportEvent::Skipped {
                    display_name: &entry.display_name,
                });
                continue;
            };
            let output = self
                .config
                .output_path(output_prefix, summary.outputs.len() + 1);
            let file = self.export_one(&displayed, source, output)?;
            summary.outputs.push(file);
        }

        Ok(summary)
    }

    fn export_one(
        &mut self,
        displayed: &PointCloud,
        source: &Path,
        output: PathBuf,
    ) -> Result<ExportedFile> {
        let reference = self.store.load(source).map_err(|e| ExportError::Load {
            path: source.to_path_buf(),
            source: e,
        })?;
        self.reporter.report(&ExportEvent::Loaded {
            path: source,
            points: reference.len(),
        });

        let indices = if reference.is_empty() {
            CorrespondenceIndexSet::default()
        } else {
            resolve_correspondence(displayed, &reference)
        };
        self.reporter.report(&ExportEvent::Matched {
            path: source,
            matched: indices.len(),
        });

        let filtered = reference.select(indices.as_slice());
        self.store
            .save(&output, &filtered, self.config.encoding)
            .map_err(|e| ExportError::Save {
                path: output.clone(),
                source: e,
            })?;
        self.reporter.report(&ExportEvent::Saved {
            path: &output,
            points: filtered.len(),
        });

        Ok(ExportedFile {
            source: source.to_path_buf(),
            output,
            source_points: reference.len(),
            matched: filtered.len(),
        })
    }
}

/// Export the displayed subsets of every source entry to
/// `<output_prefix><n>.pcd` on the local filesystem.
///
/// Returns `false` as soon as any source fails to load or any output fails
/// to save; failures are logged through `tracing`.
pub fn export_filtered_sources<G>(
    geometry: &G,
    sources: &[SourceReference],
    output_prefix: &str,
) -> bool
where
    G: PointSource + ?Sized,
{
    Exporter::new(FileStore)
        .run(geometry, sources, output_prefix)
        .is_ok()
}
