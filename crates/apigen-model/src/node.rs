//! Nodes: the shared surface plus per-variant payloads.

use apigen_common::SourceLocation;
use indexmap::IndexMap;

use crate::arena::NodeIndex;
use crate::members::{
    EnumEntry, EventInfo, FieldInfo, FunctionInfo, InterfaceRef, PropertyInfo, SerializedMember,
};
use crate::typeref::TypeRef;

/// C++ access level, also used for tag-driven overrides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Access {
    #[default]
    Public,
    Protected,
    Private,
    /// Managed-side `internal`; native access stays public.
    Internal,
}

impl Access {
    pub const fn keyword(self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::Protected => "protected",
            Access::Private => "private",
            Access::Internal => "internal",
        }
    }

    pub fn parse(text: &str) -> Option<Access> {
        match text {
            "public" => Some(Access::Public),
            "protected" => Some(Access::Protected),
            "private" => Some(Access::Private),
            "internal" => Some(Access::Internal),
            _ => None,
        }
    }
}

/// The binary-module descriptor at the root of a parsed module.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModuleInfo {
    /// Path of the module's build descriptor.
    pub path: String,
    /// Build flags the module was parsed under.
    pub build_flags: Vec<String>,
}

/// A single parsed header. Children are its top-level type definitions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileInfo {
    pub path: String,
}

/// A scripting class: reference type with virtual dispatch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassInfo {
    pub base: Option<TypeRef>,
    /// Access of the base-class inheritance.
    pub base_access: Access,
    pub interfaces: Vec<InterfaceRef>,
    pub is_static: bool,
    pub is_sealed: bool,
    pub is_abstract: bool,
    pub no_spawn: bool,
    pub no_constructor: bool,
    pub is_auto_serialization: bool,
    pub is_template: bool,
    pub template_params: Vec<String>,
    pub fields: Vec<FieldInfo>,
    pub properties: Vec<PropertyInfo>,
    pub functions: Vec<FunctionInfo>,
    pub events: Vec<EventInfo>,

    // Derived during initialization
    pub is_scripting_object: bool,
    /// Base type exists but is not exported (glue must not reference it).
    pub is_base_type_hidden: bool,
    pub script_vtable_size: u32,
    pub script_vtable_offset: u32,
    /// Ordered members auto-serialization walks.
    pub serialization: Vec<SerializedMember>,
}

/// A value type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StructInfo {
    pub base: Option<TypeRef>,
    pub interfaces: Vec<InterfaceRef>,
    pub is_auto_serialization: bool,
    pub force_no_pod: bool,
    /// No default managed constructor.
    pub no_default: bool,
    pub is_template: bool,
    pub template_params: Vec<String>,
    pub fields: Vec<FieldInfo>,
    pub functions: Vec<FunctionInfo>,

    // Derived during initialization
    pub is_pod: Option<bool>,
    pub serialization: Vec<SerializedMember>,
}

/// An enumeration. Always a POD value type; cannot host sub-types.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnumInfo {
    pub underlying: Option<TypeRef>,
    pub entries: Vec<EnumEntry>,
}

/// An interface: abstract surface with its own virtual table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InterfaceInfo {
    pub fields: Vec<FieldInfo>,
    pub functions: Vec<FunctionInfo>,

    // Derived during initialization
    pub vtable_size: u32,
}

/// A named alias or template instantiation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypedefInfo {
    pub target: TypeRef,
    pub is_alias: bool,
    /// After resolution: the aliased node, or the specialized clone of a
    /// template.
    pub resolved: Option<NodeIndex>,
}

/// Inert code payload emitted verbatim where its language applies.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InjectCodeInfo {
    pub language: String,
    pub code: String,
}

/// A built-in scalar. Value type, POD, no children.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LangTypeInfo;

/// Per-variant payload.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Module(ModuleInfo),
    File(FileInfo),
    Class(ClassInfo),
    Struct(StructInfo),
    Enum(EnumInfo),
    Interface(InterfaceInfo),
    Typedef(TypedefInfo),
    InjectCode(InjectCodeInfo),
    LangType(LangTypeInfo),
}

impl NodeKind {
    /// The discriminator written by the cache protocol. Fully qualified so
    /// unknown discriminators fail loudly on read.
    pub const fn discriminator(&self) -> &'static str {
        match self {
            NodeKind::Module(_) => "apigen.model.ModuleInfo",
            NodeKind::File(_) => "apigen.model.FileInfo",
            NodeKind::Class(_) => "apigen.model.ClassInfo",
            NodeKind::Struct(_) => "apigen.model.StructInfo",
            NodeKind::Enum(_) => "apigen.model.EnumInfo",
            NodeKind::Interface(_) => "apigen.model.InterfaceInfo",
            NodeKind::Typedef(_) => "apigen.model.TypedefInfo",
            NodeKind::InjectCode(_) => "apigen.model.InjectCodeInfo",
            NodeKind::LangType(_) => "apigen.model.LangTypeInfo",
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            NodeKind::Module(_) => "module",
            NodeKind::File(_) => "file",
            NodeKind::Class(_) => "class",
            NodeKind::Struct(_) => "struct",
            NodeKind::Enum(_) => "enum",
            NodeKind::Interface(_) => "interface",
            NodeKind::Typedef(_) => "typedef",
            NodeKind::InjectCode(_) => "inject-code",
            NodeKind::LangType(_) => "lang-type",
        }
    }

    /// Whether this variant can be looked up as a type by the resolver.
    pub const fn is_type(&self) -> bool {
        matches!(
            self,
            NodeKind::Class(_)
                | NodeKind::Struct(_)
                | NodeKind::Enum(_)
                | NodeKind::Interface(_)
                | NodeKind::Typedef(_)
                | NodeKind::LangType(_)
        )
    }

    /// Value types copy across the boundary; reference types marshal as
    /// object handles.
    pub const fn is_value_type(&self) -> bool {
        matches!(
            self,
            NodeKind::Struct(_) | NodeKind::Enum(_) | NodeKind::LangType(_)
        )
    }
}

/// A model node: shared surface plus variant payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub name: String,
    /// Source-level name, when the exported name was overridden by a tag.
    pub native_name: Option<String>,
    pub namespace: Option<String>,
    /// Documentation comment, normalized to `///` lines.
    pub comment: Vec<String>,
    /// Free-form managed attribute text.
    pub attributes: Option<String>,
    /// Deprecation message, when the construct is deprecated.
    pub deprecated: Option<String>,
    /// Tag mapping (`tag=key=value` parameters), in insertion order.
    pub tags: IndexMap<String, String>,
    pub access: Access,
    pub location: Option<SourceLocation>,
    pub parent: Option<NodeIndex>,
    pub children: Vec<NodeIndex>,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Node {
            name: name.into(),
            native_name: None,
            namespace: None,
            comment: Vec::new(),
            attributes: None,
            deprecated: None,
            tags: IndexMap::new(),
            access: Access::Public,
            location: None,
            parent: None,
            children: Vec::new(),
            kind,
        }
    }

    /// The name used in generated native code.
    pub fn native_name(&self) -> &str {
        self.native_name.as_deref().unwrap_or(&self.name)
    }

    pub fn as_class(&self) -> Option<&ClassInfo> {
        match &self.kind {
            NodeKind::Class(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructInfo> {
        match &self.kind {
            NodeKind::Struct(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumInfo> {
        match &self.kind {
            NodeKind::Enum(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_interface(&self) -> Option<&InterfaceInfo> {
        match &self.kind {
            NodeKind::Interface(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_typedef(&self) -> Option<&TypedefInfo> {
        match &self.kind {
            NodeKind::Typedef(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_typedef_mut(&mut self) -> Option<&mut TypedefInfo> {
        match &mut self.kind {
            NodeKind::Typedef(info) => Some(info),
            _ => None,
        }
    }

    /// POD-ness of the node itself, where it is known without resolution.
    pub fn is_pod(&self) -> Option<bool> {
        match &self.kind {
            NodeKind::Struct(info) => info.is_pod,
            NodeKind::Enum(_) | NodeKind::LangType(_) => Some(true),
            NodeKind::Class(_) | NodeKind::Interface(_) => Some(false),
            _ => None,
        }
    }
}
