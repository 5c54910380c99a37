use crate::error::ExportError;
use std::fmt;
use std::path::Path;

/// Progress of an export run.
#[derive(Debug)]
pub enum ExportEvent<'a> {
    /// Coincident displayed points were merged.
    Pruned { pruned: usize, remaining: usize },
    /// A display entry without a source file was passed over.
    Skipped { display_name: &'a str },
    Loaded { path: &'a Path, points: usize },
    Matched { path: &'a Path, matched: usize },
    Saved { path: &'a Path, points: usize },
    Failed { error: &'a ExportError },
}

impl fmt::Display for ExportEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportEvent::Pruned { pruned, remaining } => write!(
                f,
                "pruned {pruned} duplicate points, {remaining} displayed points remain"
            ),
            ExportEvent::Skipped { display_name } => {
                write!(f, "skipping {display_name:?}: not a source file")
            }
            ExportEvent::Loaded { path, points } => {
                write!(f, "loaded {} ({points} points)", path.display())
            }
            ExportEvent::Matched { path, matched } => {
                write!(f, "{matched} points of {} match the display", path.display())
            }
            ExportEvent::Saved { path, points } => {
                write!(f, "saved {} ({points} points)", path.display())
            }
            ExportEvent::Failed { error } => write!(f, "export failed: {error}"),
        }
    }
}

/// Receives export progress.
pub trait Reporter {
    fn report(&mut self, event: &ExportEvent<'_>);
}

impl<F> Reporter for F
where
    F: FnMut(&ExportEvent<'_>),
{
    fn report(&mut self, event: &ExportEvent<'_>) {
        self(event)
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&mut self, event: &ExportEvent<'_>) {
        match *event {
            ExportEvent::Pruned { pruned, remaining } => {
                tracing::info!(pruned, remaining, "pruned duplicate displayed points")
            }
            ExportEvent::Skipped { display_name } => {
                tracing::debug!(display_name, "not a source file, skipping")
            }
            ExportEvent::Loaded { path, points } => {
                tracing::debug!(path = %path.display(), points, "loaded source cloud")
            }
            ExportEvent::Matched { path, matched } => {
                tracing::debug!(path = %path.display(), matched, "resolved correspondences")
            }
            ExportEvent::Saved { path, points } => {
                tracing::info!(path = %path.display(), points, "saved filtered cloud")
            }
            ExportEvent::Failed { error } => {
                let cause = std::error::Error::source(error)
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                tracing::error!(%cause, "{error}")
            }
        }
    }
}
