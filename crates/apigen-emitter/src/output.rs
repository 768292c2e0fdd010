//! Output file handling.

use std::fs;
use std::path::Path;

use apigen_common::Result;
use tracing::debug;

/// Write `content` to `path` only when it differs from what is on disk.
///
/// Keeps mtimes stable across regenerations so downstream incremental
/// builds do not recompile unchanged glue. Returns whether the file was
/// written.
pub fn write_if_changed(path: &Path, content: &str) -> Result<bool> {
    if let Ok(existing) = fs::read_to_string(path) {
        if existing == content {
            debug!("up to date: {}", path.display());
            return Ok(false);
        }
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    debug!("wrote {}", path.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_once_then_skips_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/Core.Bindings.Gen.cpp");
        assert!(write_if_changed(&path, "abc").unwrap());
        assert!(!write_if_changed(&path, "abc").unwrap());
        assert!(write_if_changed(&path, "abcd").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "abcd");
    }
}
