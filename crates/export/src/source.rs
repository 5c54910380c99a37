use std::path::{Path, PathBuf};

/// A display entry paired with the file it was loaded from, if any.
///
/// Displayed clouds are named `<path>.<ext><suffix>`; everything up to and
/// including the first `.<ext>` is the source path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReference {
    pub display_name: String,
    pub source_path: Option<PathBuf>,
}

impl SourceReference {
    /// Derive the source path from a display name.
    ///
    /// Matching is case-sensitive; an empty extension never matches.
    pub fn parse(display_name: impl Into<String>, extension: &str) -> Self {
        let display_name = display_name.into();
        let source_path = source_path_from_display_name(&display_name, extension);
        Self {
            display_name,
            source_path,
        }
    }

    /// An entry whose origin is already known.
    pub fn with_path(display_name: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            display_name: display_name.into(),
            source_path: Some(source_path.into()),
        }
    }

    pub fn from_names<I, S>(names: I, extension: &str) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .map(|name| Self::parse(name, extension))
            .collect()
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn is_source(&self) -> bool {
        self.source_path.is_some()
    }
}

/// Truncate `name` after the first occurrence of `.<extension>`.
pub fn source_path_from_display_name(name: &str, extension: &str) -> Option<PathBuf> {
    if extension.is_empty() {
        return None;
    }
    let marker = format!(".{extension}");
    let end = name.find(&marker)? + marker.len();
    Some(PathBuf::from(&name[..end]))
}
