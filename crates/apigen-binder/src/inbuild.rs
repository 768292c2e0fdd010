//! In-build type tables.

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;

/// Recognized in-build primitive spellings. `void*` is handled separately
/// and resolves to the pointer-sized primitive.
pub const PRIMITIVES: &[&str] = &[
    "void", "bool", "byte", "int8", "int16", "int32", "int64", "uint8", "uint16", "uint32",
    "uint64", "float", "double", "Char", "char",
];

/// Name of the synthetic node `void*` resolves to.
pub const POINTER_PRIMITIVE: &str = "IntPtr";

/// Root type names whose descendants are scripting objects.
pub static SCRIPTING_OBJECT_ROOTS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "ScriptingObject",
        "ManagedScriptingObject",
        "PersistentScriptingObject",
        "Asset",
        "BinaryAsset",
        "Actor",
        "Script",
    ]
    .into_iter()
    .collect()
});

pub fn is_primitive(name: &str) -> bool {
    static SET: Lazy<FxHashSet<&'static str>> = Lazy::new(|| PRIMITIVES.iter().copied().collect());
    SET.contains(name)
}

pub fn is_scripting_object_root(name: &str) -> bool {
    SCRIPTING_OBJECT_ROOTS.contains(name)
}
