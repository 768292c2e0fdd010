//! The marshalling ABI contract.
//!
//! The generated glue compiles against a small set of engine-provided
//! helpers. Their names are fixed here, in one place, and used consistently
//! by every emission path:
//!
//! - `MUtils::ToManagedString` / `MUtils::ToNativeString`
//! - `MUtils::ToManagedArray<T>` / `MUtils::ToNativeArray<T>`
//! - `MUtils::ToManagedDictionary` / `MUtils::ToNativeDictionary`
//! - `MUtils::BoxVariant` / `MUtils::UnboxVariant`
//! - `MUtils::Box(ptr, typeName)`
//! - `ScriptingObject::ToManaged` / `ScriptingObject::ToNative`
//! - `ScriptingObject::GetScriptVTable(object, slot)` and `MCore::Invoke`
//! - `ScriptingEvents::Invoke(typeName, eventName, params, count)`
//! - `ADD_INTERNAL_CALL(name, fn)` and `INTERNAL_CALL_CHECK[_RETURN]`
//! - `ScriptingTypeInitializer` / `ScriptingType::InterfaceImplementation`
//! - `SERIALIZE` / `DESERIALIZE` macros
//!
//! `classify` maps a `TypeRef` to the marshalling strategy its values use
//! when crossing the native/managed boundary.

use apigen_binder::BuildContext;
use apigen_model::{NodeIndex, NodeKind, TypeRef};

/// Header every generated glue file includes first.
pub const GLUE_HEADER: &str = "Engine/Scripting/BindingsGlue.h";

/// How a value of some type crosses the boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marshal {
    /// Bitwise copy: primitives, enums, raw pointers.
    Direct,
    /// Any of the string spellings; crosses as `MonoString*`.
    String,
    /// `Array`/`Span`/`BitArray`/`BytesContainer`; crosses as `MonoArray*`.
    Array,
    /// `Dictionary`; crosses as `MonoObject*`.
    Dictionary,
    /// `HashSet`; crosses as `MonoObject*`. Output parameters of this kind
    /// are rejected.
    HashSet,
    /// `Variant`/`VariantType`; crosses boxed as `MonoObject*`.
    Variant,
    /// Object reference wrappers and `Function`; cross as `MonoObject*`.
    ObjectHandle,
    /// A scripting-object class; crosses as a raw native pointer.
    ScriptingObject,
    /// A POD struct; crosses by pointer to the native layout.
    PodStruct(NodeIndex),
    /// A non-POD struct; crosses by pointer to its managed mirror.
    NonPodStruct(NodeIndex),
}

impl Marshal {
    /// Whether wrapper parameters of this kind are passed by pointer
    /// (value-by-reference structures).
    pub fn passes_by_pointer(self) -> bool {
        matches!(self, Marshal::PodStruct(_) | Marshal::NonPodStruct(_))
    }

    /// Whether a return of this kind becomes a trailing out-pointer.
    pub fn returns_by_pointer(self) -> bool {
        self.passes_by_pointer()
    }
}

/// Classify a type reference for the boundary.
pub fn classify(build: &mut BuildContext, type_ref: &TypeRef, scope: NodeIndex) -> Marshal {
    if type_ref.is_string() {
        return Marshal::String;
    }
    if type_ref.is_array_container() || type_ref.type_name == "BytesContainer" {
        return Marshal::Array;
    }
    if type_ref.is_dictionary() {
        return Marshal::Dictionary;
    }
    if type_ref.is_hash_set() {
        return Marshal::HashSet;
    }
    if type_ref.is_variant() || type_ref.type_name == "VariantType" {
        return Marshal::Variant;
    }
    if type_ref.is_object_reference() || type_ref.is_function_pointer() {
        return Marshal::ObjectHandle;
    }

    if let Some(found) = build.resolve(type_ref, scope) {
        let concrete = build.dealias(found);
        match &build.arena.get(concrete).kind {
            // Classes always marshal as object pointers on the wire, even
            // when the native signature spells them by value or reference.
            NodeKind::Class(_) => return Marshal::ScriptingObject,
            NodeKind::Struct(info) if !type_ref.is_ptr => {
                return if info.is_pod.unwrap_or(true) {
                    Marshal::PodStruct(concrete)
                } else {
                    Marshal::NonPodStruct(concrete)
                };
            }
            _ => {}
        }
    }
    Marshal::Direct
}

/// The C++ spelling of a wrapper-level (boundary) type.
pub fn wire_type(build: &BuildContext, marshal: Marshal, type_ref: &TypeRef) -> String {
    match marshal {
        Marshal::Direct => native_spelling(type_ref),
        Marshal::String => "MonoString*".to_string(),
        Marshal::Array => "MonoArray*".to_string(),
        Marshal::Dictionary | Marshal::HashSet | Marshal::Variant | Marshal::ObjectHandle => {
            "MonoObject*".to_string()
        }
        // The native spelling already carries any scope qualifiers.
        Marshal::ScriptingObject => format!("{}*", type_ref.type_name),
        Marshal::PodStruct(index) => {
            format!("{}*", build.arena.get(index).native_name())
        }
        Marshal::NonPodStruct(index) => {
            format!("{}Managed*", mirror_name(build, index))
        }
    }
}

/// The native spelling of a type reference, without reference qualifiers
/// (wrappers receive by value or by pointer).
pub fn native_spelling(type_ref: &TypeRef) -> String {
    let mut bare = type_ref.bare();
    bare.is_ptr = type_ref.is_ptr;
    bare.to_string()
}

/// Name used for a struct's managed mirror and converters; collisions are
/// avoided by using the managed full name with scope separators flattened.
pub fn mirror_name(build: &BuildContext, index: NodeIndex) -> String {
    build
        .arena
        .full_name_managed(index)
        .replace(['.', '+'], "_")
}

/// Zero value for `INTERNAL_CALL_CHECK_RETURN` per wire type.
pub fn default_return_value(marshal: Marshal, type_ref: &TypeRef) -> String {
    match marshal {
        Marshal::Direct => {
            if type_ref.is_ptr {
                "nullptr".to_string()
            } else {
                match type_ref.type_name.as_str() {
                    "bool" => "false".to_string(),
                    "float" | "double" => "0.0f".to_string(),
                    "void" => String::new(),
                    _ => format!("({})0", native_spelling(type_ref)),
                }
            }
        }
        _ => "nullptr".to_string(),
    }
}
