//! Typed API model for the apigen bindings generator.
//!
//! The model is a forest of nodes rooted at modules, owned by an arena:
//! - `ApiArena` / `NodeIndex` - arena storage with parent/child links
//! - `Node` / `NodeKind` - the shared node surface plus per-variant payload
//! - `TypeRef` - a type spelling with qualifiers and generic arguments
//! - Member structs - fields, properties, functions, parameters, events
//! - Binary node serialization for the module cache
//!
//! Cross-references between types are by spelling (`TypeRef`), resolved
//! lazily by the binder; the arena never stores owned type graphs, which is
//! what makes cyclic references and cache round-trips straightforward.

pub mod typeref;
pub use typeref::TypeRef;

pub mod members;
pub use members::{
    EnumEntry, EventInfo, FieldInfo, FunctionInfo, InterfaceRef, ParamFlags, ParameterInfo,
    PropertyInfo, SerializedKind, SerializedMember,
};

pub mod node;
pub use node::{
    Access, ClassInfo, EnumInfo, FileInfo, InjectCodeInfo, InterfaceInfo, LangTypeInfo,
    ModuleInfo, Node, NodeKind, StructInfo, TypedefInfo,
};

pub mod arena;
pub use arena::{ApiArena, NodeIndex};

pub mod serialize;

mod display;
