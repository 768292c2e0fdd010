//! Source locations for diagnostics and model nodes.
//!
//! A `SourceLocation` is a header path plus a 1-based line number. Its
//! `Display` form is `{file}({line})`, the shape editors recognize for
//! click-through navigation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A position in a source header: file path plus 1-based line number.
///
/// The path is reference-counted so locations can be attached to every
/// parsed node without cloning the path text per node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// Path of the header the construct was read from.
    pub file: Arc<str>,
    /// 1-based line number.
    pub line: u32,
}

impl SourceLocation {
    /// Create a new location.
    pub fn new(file: impl Into<Arc<str>>, line: u32) -> Self {
        SourceLocation {
            file: file.into(),
            line,
        }
    }

    /// Location for a whole file (line 1).
    pub fn file_start(file: impl Into<Arc<str>>) -> Self {
        SourceLocation::new(file, 1)
    }

    /// A copy of this location pointing at a different line.
    #[must_use]
    pub fn at_line(&self, line: u32) -> Self {
        SourceLocation {
            file: Arc::clone(&self.file),
            line,
        }
    }

    /// The file path as a `Path`.
    pub fn path(&self) -> &Path {
        Path::new(&*self.file)
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.file, self.line)
    }
}

impl From<&Path> for SourceLocation {
    fn from(path: &Path) -> Self {
        SourceLocation::file_start(path.to_string_lossy().into_owned())
    }
}

impl From<&PathBuf> for SourceLocation {
    fn from(path: &PathBuf) -> Self {
        SourceLocation::from(path.as_path())
    }
}
