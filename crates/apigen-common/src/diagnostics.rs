//! Error and diagnostic types for the bindings generator.
//!
//! All library crates return `Result<T>` with this crate's `Error`. An error
//! carries a kind, a message, and an optional source location; the `Display`
//! form is a single line suitable for editor click-through:
//! `{file}({line}): {message}`.

use crate::location::SourceLocation;

/// Result alias used across the generator's library crates.
pub type Result<T> = std::result::Result<T, Error>;

/// The broad class an error belongs to.
///
/// Cache misses are not errors and have no kind here; stale keys are a
/// normal `None` result of the load path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Token stream violates expectations (unexpected token, mismatched
    /// braces, malformed string literal).
    Syntax,
    /// An unrecognized API tag parameter. Warning-level; parsing continues.
    UnknownTag,
    /// A referenced type cannot be found. Fatal for the owning module.
    Resolution,
    /// A model invariant is violated (inheritance cycle, setter without a
    /// value parameter, mismatched accessor types, ...).
    Semantic,
    /// The cache file is unreadable or structurally invalid. Treated the
    /// same as a miss by callers, after a warning log.
    CacheCorruption,
    /// File read/write failure. Fatal for the module.
    Io,
}

impl ErrorKind {
    /// Short lowercase label used in log output.
    pub const fn label(self) -> &'static str {
        match self {
            ErrorKind::Syntax => "syntax error",
            ErrorKind::UnknownTag => "unknown tag",
            ErrorKind::Resolution => "unresolved type",
            ErrorKind::Semantic => "semantic error",
            ErrorKind::CacheCorruption => "cache corruption",
            ErrorKind::Io => "i/o error",
        }
    }
}

/// A generator error: kind, message, optional source location.
#[derive(Clone, Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl Error {
    /// Create an error with no source location.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            location: None,
        }
    }

    /// Create an error pointing at a source location.
    pub fn at(kind: ErrorKind, location: SourceLocation, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            location: Some(location),
        }
    }

    /// Shorthand for a syntax error at a location.
    pub fn syntax(location: SourceLocation, message: impl Into<String>) -> Self {
        Error::at(ErrorKind::Syntax, location, message)
    }

    /// Shorthand for a semantic error at a location.
    pub fn semantic(location: SourceLocation, message: impl Into<String>) -> Self {
        Error::at(ErrorKind::Semantic, location, message)
    }

    /// Shorthand for a resolution error at a location.
    pub fn resolution(location: SourceLocation, message: impl Into<String>) -> Self {
        Error::at(ErrorKind::Resolution, location, message)
    }

    /// Shorthand for a cache-corruption error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::CacheCorruption, message)
    }

    /// Attach a location if the error does not have one yet.
    ///
    /// Used by per-file parse loops to add file context when re-throwing.
    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        if self.location.is_none() {
            self.location = Some(location);
        }
        self
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{loc}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::Io, err.to_string())
    }
}
