//! Member structs owned by type payloads.
//!
//! Fields, properties, functions, parameters, events, and enum entries are
//! plain values inside their container's payload; only types are arena
//! nodes.

use bitflags::bitflags;

use crate::node::Access;
use crate::typeref::TypeRef;

bitflags! {
    /// Orthogonal parameter decorations.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ParamFlags: u8 {
        /// `ref` - passed by reference, readable and writable.
        const REF = 1 << 0;
        /// `in` - passed by reference, read-only.
        const IN = 1 << 1;
        /// `out` - passed by reference, write-only.
        const OUT = 1 << 2;
        /// `this` - extension-method receiver on the managed side.
        const THIS = 1 << 3;
        /// `params` - variadic tail array on the managed side.
        const PARAMS = 1 << 4;
    }
}

impl ParamFlags {
    /// Passed by reference in any direction.
    pub fn is_by_ref(self) -> bool {
        self.intersects(ParamFlags::REF | ParamFlags::IN | ParamFlags::OUT)
    }

    /// Readable through the reference (`ref` or `in`).
    pub fn is_by_ref_in(self) -> bool {
        self.intersects(ParamFlags::REF | ParamFlags::IN)
    }

    /// Writable through the reference (`ref` or `out`).
    pub fn is_by_ref_out(self) -> bool {
        self.intersects(ParamFlags::REF | ParamFlags::OUT)
    }
}

/// A function parameter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterInfo {
    pub name: String,
    pub type_ref: TypeRef,
    /// Default value text, verbatim from source or a tag.
    pub default_value: Option<String>,
    /// Managed-side attribute text.
    pub attributes: Option<String>,
    pub flags: ParamFlags,
}

impl ParameterInfo {
    pub fn new(name: impl Into<String>, type_ref: TypeRef) -> Self {
        ParameterInfo {
            name: name.into(),
            type_ref,
            ..ParameterInfo::default()
        }
    }
}

/// An exported function (or a synthesized field accessor).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FunctionInfo {
    pub name: String,
    /// Disambiguated name, assigned during validation; always begins with
    /// `name` and is pairwise distinct within the container.
    pub unique_name: String,
    pub return_type: TypeRef,
    pub parameters: Vec<ParameterInfo>,
    pub is_virtual: bool,
    pub is_const: bool,
    pub is_static: bool,
    pub no_proxy: bool,
    pub is_hidden: bool,
    pub is_deprecated: bool,
    pub deprecated_message: Option<String>,
    pub access: Access,
    pub comment: Vec<String>,
    pub attributes: Option<String>,
}

impl FunctionInfo {
    pub fn new(name: impl Into<String>, return_type: TypeRef) -> Self {
        let name = name.into();
        FunctionInfo {
            unique_name: name.clone(),
            name,
            return_type,
            ..FunctionInfo::default()
        }
    }
}

/// An exported field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub type_ref: TypeRef,
    pub is_static: bool,
    pub is_constexpr: bool,
    pub is_read_only: bool,
    /// Keep a fixed-size array as a fixed native buffer instead of an
    /// implicit managed array.
    pub no_array: bool,
    pub is_hidden: bool,
    pub no_proxy: bool,
    pub default_value: Option<String>,
    /// Marshal under a different spelling on the managed side.
    pub marshal_as: Option<TypeRef>,
    pub access: Access,
    pub comment: Vec<String>,
    pub attributes: Option<String>,
    /// Accessor shims synthesized after initialization.
    pub getter: Option<FunctionInfo>,
    pub setter: Option<FunctionInfo>,
}

impl FieldInfo {
    pub fn new(name: impl Into<String>, type_ref: TypeRef) -> Self {
        FieldInfo {
            name: name.into(),
            type_ref,
            ..FieldInfo::default()
        }
    }

    /// An implicit managed array: fixed-size native buffer not tagged
    /// `noArray`. Such fields are never POD.
    pub fn is_managed_array(&self) -> bool {
        self.type_ref.is_array && !self.no_array
    }
}

/// A property merged from separately parsed accessor functions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyInfo {
    pub name: String,
    /// The merged type: getter return type, or setter value type when the
    /// property is set-only.
    pub type_ref: TypeRef,
    pub getter: Option<FunctionInfo>,
    pub setter: Option<FunctionInfo>,
    pub access: Access,
    pub comment: Vec<String>,
    pub attributes: Option<String>,
}

impl PropertyInfo {
    pub fn is_static(&self) -> bool {
        self.getter
            .as_ref()
            .or(self.setter.as_ref())
            .is_some_and(|f| f.is_static)
    }

    pub fn is_hidden(&self) -> bool {
        self.getter
            .as_ref()
            .or(self.setter.as_ref())
            .is_some_and(|f| f.is_hidden)
    }
}

/// An exported event. The signature is the delegate's generic argument
/// list; `Action` has an empty signature.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventInfo {
    pub name: String,
    pub is_static: bool,
    pub is_hidden: bool,
    pub signature: Vec<TypeRef>,
    pub access: Access,
    pub comment: Vec<String>,
    pub attributes: Option<String>,
}

/// One enum entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnumEntry {
    pub name: String,
    /// Verbatim value expression, when present.
    pub value: Option<String>,
    pub comment: Vec<String>,
    pub attributes: Option<String>,
}

/// Interface implemented by a class/struct, with the inheritance access.
#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceRef {
    pub access: Access,
    pub type_ref: TypeRef,
}

/// What an auto-serialized member is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerializedKind {
    Field,
    Property,
}

/// One entry of the ordered auto-serialization list recorded during
/// initialization and replayed by the emitter.
#[derive(Clone, Debug, PartialEq)]
pub struct SerializedMember {
    pub kind: SerializedKind,
    pub name: String,
    pub type_ref: TypeRef,
}
