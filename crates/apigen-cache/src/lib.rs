//! Binary per-module model cache.
//!
//! A cache file is a key block followed by the module subtree:
//! 1. Format version (`u32`) - mismatch is a miss.
//! 2. Generator binary last-write ticks (`u64`).
//! 3. Intermediate folder path, platform/architecture/configuration
//!    ordinals, and the three definition string lists.
//! 4. Header count, then `(path, last-write-ticks)` per header.
//! 5. The module subtree via the node write protocol.
//!
//! Every key is compared on load; any mismatch - including a header
//! modified after the snapshot - aborts the load and the caller reparses.
//! A short or corrupted file is the same as a miss, with a warning log.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use apigen_common::{BinaryReader, BinaryWriter, Result};
use apigen_model::serialize::{read_node, write_node};
use apigen_model::{ApiArena, NodeIndex};
use tracing::{debug, warn};

/// Bumped whenever the node write protocol or the key block changes.
pub const CACHE_VERSION: u32 = 7;

/// Everything a module's snapshot is keyed by, besides the header list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheKey {
    pub intermediate_folder: String,
    pub platform: u32,
    pub architecture: u32,
    pub configuration: u32,
    pub public_defines: Vec<String>,
    pub private_defines: Vec<String>,
    pub env_defines: Vec<String>,
    /// Last-write ticks of the generator binary itself; a rebuilt generator
    /// invalidates every snapshot.
    pub generator_ticks: u64,
}

impl CacheKey {
    /// Key with the running binary's own timestamp filled in.
    pub fn with_current_generator(mut self) -> Self {
        self.generator_ticks = std::env::current_exe()
            .ok()
            .and_then(|path| file_ticks(&path))
            .unwrap_or(0);
        self
    }
}

/// Last-write time in 100 ns ticks since the Unix epoch.
pub fn file_ticks(path: &Path) -> Option<u64> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    let since_epoch = modified.duration_since(UNIX_EPOCH).ok()?;
    Some(since_epoch.as_nanos() as u64 / 100)
}

/// The cache file path for a module.
pub fn cache_path(intermediate_folder: &Path, module_name: &str) -> PathBuf {
    intermediate_folder.join(format!("{module_name}.Bindings.Cache"))
}

// =============================================================================
// Save
// =============================================================================

/// Write a module snapshot. Headers are recorded with their current
/// last-write ticks.
pub fn save_cache(
    path: &Path,
    key: &CacheKey,
    headers: &[PathBuf],
    arena: &ApiArena,
    module: NodeIndex,
) -> Result<()> {
    let mut w = BinaryWriter::new();
    w.write_u32(CACHE_VERSION);
    w.write_u64(key.generator_ticks);
    w.write_string(&key.intermediate_folder);
    w.write_u32(key.platform);
    w.write_u32(key.architecture);
    w.write_u32(key.configuration);
    w.write_string_list(&key.public_defines);
    w.write_string_list(&key.private_defines);
    w.write_string_list(&key.env_defines);

    w.write_u32(headers.len() as u32);
    for header in headers {
        w.write_string(&header.to_string_lossy());
        w.write_u64(file_ticks(header).unwrap_or(0));
    }

    write_node(arena, module, &mut w);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, w.into_bytes())?;
    debug!("saved cache {}", path.display());
    Ok(())
}

// =============================================================================
// Load
// =============================================================================

/// Try to load a module snapshot into `arena`.
///
/// Returns the module root on a hit, `None` on any miss: missing file,
/// version or key mismatch, stale header, or corruption (which also logs a
/// warning).
pub fn load_cache(
    path: &Path,
    key: &CacheKey,
    headers: &[PathBuf],
    arena: &mut ApiArena,
) -> Option<NodeIndex> {
    let bytes = fs::read(path).ok()?;
    match try_load(&bytes, key, headers, arena) {
        Ok(found) => {
            if found.is_some() {
                debug!("cache hit {}", path.display());
            }
            found
        }
        Err(err) => {
            warn!("discarding corrupted cache {}: {err}", path.display());
            None
        }
    }
}

fn try_load(
    bytes: &[u8],
    key: &CacheKey,
    headers: &[PathBuf],
    arena: &mut ApiArena,
) -> Result<Option<NodeIndex>> {
    let mut r = BinaryReader::new(bytes);

    if r.read_u32()? != CACHE_VERSION {
        return Ok(None);
    }
    if r.read_u64()? != key.generator_ticks {
        return Ok(None);
    }
    if r.read_string()? != key.intermediate_folder {
        return Ok(None);
    }
    if r.read_u32()? != key.platform
        || r.read_u32()? != key.architecture
        || r.read_u32()? != key.configuration
    {
        return Ok(None);
    }
    if r.read_string_list()? != key.public_defines
        || r.read_string_list()? != key.private_defines
        || r.read_string_list()? != key.env_defines
    {
        return Ok(None);
    }

    let header_count = r.read_list_len()?;
    if header_count != headers.len() {
        return Ok(None);
    }
    for header in headers {
        let cached_path = r.read_string()?;
        let cached_ticks = r.read_u64()?;
        if cached_path != header.to_string_lossy() {
            return Ok(None);
        }
        // A header modified after the snapshot invalidates it.
        if file_ticks(header).unwrap_or(u64::MAX) != cached_ticks {
            return Ok(None);
        }
    }

    let module = read_node(arena, &mut r)?;
    Ok(Some(module))
}

#[cfg(test)]
mod tests {
    use super::*;
    use apigen_model::{ClassInfo, FileInfo, ModuleInfo, Node, NodeKind};
    use std::time::Duration;

    fn sample_arena() -> (ApiArena, NodeIndex) {
        let mut arena = ApiArena::new();
        let module = arena.alloc(Node::new(
            "Core",
            NodeKind::Module(ModuleInfo::default()),
        ));
        let file = arena.alloc(Node::new(
            "Actor.h",
            NodeKind::File(FileInfo {
                path: "Actor.h".to_string(),
            }),
        ));
        arena.add_child(module, file);
        let class = arena.alloc(Node::new("Actor", NodeKind::Class(ClassInfo::default())));
        arena.add_child(file, class);
        (arena, module)
    }

    fn sample_key(dir: &Path) -> CacheKey {
        CacheKey {
            intermediate_folder: dir.to_string_lossy().into_owned(),
            platform: 1,
            architecture: 2,
            configuration: 0,
            public_defines: vec!["USE_EDITOR".to_string()],
            generator_ticks: 123_456,
            ..CacheKey::default()
        }
    }

    #[test]
    fn round_trip_hits_and_preserves_the_model() {
        let dir = tempfile::tempdir().unwrap();
        let header = dir.path().join("Actor.h");
        fs::write(&header, "// header").unwrap();
        let headers = vec![header];

        let (arena, module) = sample_arena();
        let key = sample_key(dir.path());
        let path = cache_path(dir.path(), "Core");
        save_cache(&path, &key, &headers, &arena, module).unwrap();

        let mut restored = ApiArena::new();
        let loaded = load_cache(&path, &key, &headers, &mut restored)
            .expect("expected a cache hit");
        assert_eq!(arena.dump(module), restored.dump(loaded));
    }

    #[test]
    fn touching_a_header_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let header = dir.path().join("Actor.h");
        fs::write(&header, "// header").unwrap();
        let headers = vec![header.clone()];

        let (arena, module) = sample_arena();
        let key = sample_key(dir.path());
        let path = cache_path(dir.path(), "Core");
        save_cache(&path, &key, &headers, &arena, module).unwrap();

        // Move the header's mtime forward past the tick resolution.
        let later = fs::metadata(&header).unwrap().modified().unwrap() + Duration::from_secs(2);
        let file = fs::File::options().append(true).open(&header).unwrap();
        file.set_modified(later).unwrap();
        drop(file);

        let mut restored = ApiArena::new();
        assert!(load_cache(&path, &key, &headers, &mut restored).is_none());
    }

    #[test]
    fn changed_defines_or_configuration_are_misses() {
        let dir = tempfile::tempdir().unwrap();
        let header = dir.path().join("Actor.h");
        fs::write(&header, "// header").unwrap();
        let headers = vec![header];

        let (arena, module) = sample_arena();
        let key = sample_key(dir.path());
        let path = cache_path(dir.path(), "Core");
        save_cache(&path, &key, &headers, &arena, module).unwrap();

        let mut with_defines = key.clone();
        with_defines.public_defines.push("NEW_DEFINE".to_string());
        let mut restored = ApiArena::new();
        assert!(load_cache(&path, &with_defines, &headers, &mut restored).is_none());

        let mut other_config = key.clone();
        other_config.configuration = 3;
        assert!(load_cache(&path, &other_config, &headers, &mut restored).is_none());

        let mut rebuilt_generator = key;
        rebuilt_generator.generator_ticks += 1;
        assert!(load_cache(&path, &rebuilt_generator, &headers, &mut restored).is_none());
    }

    #[test]
    fn missing_and_truncated_files_are_misses() {
        let dir = tempfile::tempdir().unwrap();
        let header = dir.path().join("Actor.h");
        fs::write(&header, "// header").unwrap();
        let headers = vec![header];

        let path = cache_path(dir.path(), "Core");
        let key = sample_key(dir.path());
        let mut restored = ApiArena::new();
        assert!(load_cache(&path, &key, &headers, &mut restored).is_none());

        let (arena, module) = sample_arena();
        save_cache(&path, &key, &headers, &arena, module).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 10]).unwrap();
        assert!(load_cache(&path, &key, &headers, &mut restored).is_none());
    }

    #[test]
    fn header_list_shape_is_part_of_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("A.h");
        let b = dir.path().join("B.h");
        fs::write(&a, "// a").unwrap();
        fs::write(&b, "// b").unwrap();

        let (arena, module) = sample_arena();
        let key = sample_key(dir.path());
        let path = cache_path(dir.path(), "Core");
        save_cache(&path, &key, &[a.clone()], &arena, module).unwrap();

        let mut restored = ApiArena::new();
        // Extra header: count mismatch.
        assert!(load_cache(&path, &key, &[a.clone(), b.clone()], &mut restored).is_none());
        // Different header path: entry mismatch.
        assert!(load_cache(&path, &key, &[b], &mut restored).is_none());
        // Unchanged list still hits.
        assert!(load_cache(&path, &key, &[a], &mut restored).is_some());
    }
}
