//! Type references.
//!
//! A `TypeRef` records a type spelling the way the parser saw it: base
//! identifier, qualifier flags, fixed-array/bit-field sizes, and generic
//! arguments. It never owns the referenced node; the binder resolves
//! spellings on demand.

/// String and container spellings recognized structurally.
///
/// These marshal as managed objects, so they are never POD regardless of
/// how they resolve.
pub const NON_POD_PRIMITIVES: &[&str] = &[
    "String",
    "StringView",
    "StringAnsi",
    "StringAnsiView",
    "Array",
    "Span",
    "Dictionary",
    "HashSet",
    "BitArray",
    "BytesContainer",
    "Variant",
    "VariantType",
    "ScriptingObjectReference",
    "AssetReference",
    "WeakAssetReference",
    "SoftAssetReference",
    "SoftObjectReference",
    "Function",
    "ScriptingTypeHandle",
];

/// A parsed type reference.
///
/// Equality compares every scalar field and the generic arguments
/// recursively, which is what the cache round-trip test relies on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TypeRef {
    /// Base identifier, possibly qualified (`Engine::Vector3`).
    pub type_name: String,
    pub is_const: bool,
    pub is_ref: bool,
    pub is_move_ref: bool,
    pub is_ptr: bool,
    /// Fixed-size array declarator (`float X[4]`).
    pub is_array: bool,
    /// Bit-field declarator (`uint32 Flag : 1`).
    pub is_bit_field: bool,
    /// Array extent text (`4`, or a named constant).
    pub array_size: Option<String>,
    /// Bit-field width.
    pub bit_size: Option<u32>,
    /// Ordered generic arguments.
    pub generic_args: Vec<TypeRef>,
}

impl TypeRef {
    /// A bare named type with no qualifiers.
    pub fn named(type_name: impl Into<String>) -> Self {
        TypeRef {
            type_name: type_name.into(),
            ..TypeRef::default()
        }
    }

    /// The `void` return type.
    pub fn void() -> Self {
        TypeRef::named("void")
    }

    pub fn is_void(&self) -> bool {
        self.type_name == "void" && !self.is_ptr && self.generic_args.is_empty()
    }

    pub fn is_void_ptr(&self) -> bool {
        self.type_name == "void" && self.is_ptr
    }

    /// True when the spelling is one of the structurally recognized
    /// string/container primitives.
    pub fn is_object_primitive(&self) -> bool {
        NON_POD_PRIMITIVES.contains(&self.type_name.as_str())
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self.type_name.as_str(),
            "String" | "StringView" | "StringAnsi" | "StringAnsiView"
        )
    }

    pub fn is_array_container(&self) -> bool {
        matches!(self.type_name.as_str(), "Array" | "Span" | "BitArray")
    }

    pub fn is_dictionary(&self) -> bool {
        self.type_name == "Dictionary"
    }

    pub fn is_hash_set(&self) -> bool {
        self.type_name == "HashSet"
    }

    pub fn is_variant(&self) -> bool {
        self.type_name == "Variant"
    }

    /// Reference-counted object handle spellings
    /// (`ScriptingObjectReference<T>`, asset references, ...).
    pub fn is_object_reference(&self) -> bool {
        matches!(
            self.type_name.as_str(),
            "ScriptingObjectReference"
                | "AssetReference"
                | "WeakAssetReference"
                | "SoftAssetReference"
                | "SoftObjectReference"
        )
    }

    pub fn is_function_pointer(&self) -> bool {
        self.type_name == "Function"
    }

    /// The last `::` segment of the spelling.
    pub fn short_name(&self) -> &str {
        self.type_name
            .rsplit("::")
            .next()
            .unwrap_or(&self.type_name)
    }

    /// A copy with the reference flag cleared (the resolver's removal
    /// retry).
    #[must_use]
    pub fn without_ref(&self) -> Self {
        let mut copy = self.clone();
        copy.is_ref = false;
        copy
    }

    /// A copy with qualifiers cleared, keeping name and generic arguments.
    #[must_use]
    pub fn bare(&self) -> Self {
        TypeRef {
            type_name: self.type_name.clone(),
            generic_args: self.generic_args.clone(),
            ..TypeRef::default()
        }
    }

    /// Substitute template parameter names with concrete arguments,
    /// recursively through generic arguments. Used by typedef inflation.
    pub fn substitute(&mut self, params: &[String], args: &[TypeRef]) {
        if let Some(pos) = params.iter().position(|p| *p == self.type_name) {
            if let Some(arg) = args.get(pos) {
                self.type_name = arg.type_name.clone();
                self.is_ptr |= arg.is_ptr;
                self.is_const |= arg.is_const;
                if self.generic_args.is_empty() {
                    self.generic_args = arg.generic_args.clone();
                }
            }
        }
        for generic in &mut self.generic_args {
            generic.substitute(params, args);
        }
    }
}

impl std::fmt::Display for TypeRef {
    /// Renders the C++ spelling. Also used as the resolver memo key, so two
    /// distinct references must never print the same text.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_const {
            write!(f, "const ")?;
        }
        write!(f, "{}", self.type_name)?;
        if !self.generic_args.is_empty() {
            write!(f, "<")?;
            for (i, arg) in self.generic_args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{arg}")?;
            }
            write!(f, ">")?;
        }
        if self.is_ptr {
            write!(f, "*")?;
        }
        if self.is_move_ref {
            write!(f, "&&")?;
        } else if self.is_ref {
            write!(f, "&")?;
        }
        if self.is_array {
            write!(f, "[{}]", self.array_size.as_deref().unwrap_or(""))?;
        }
        if self.is_bit_field {
            write!(f, " : {}", self.bit_size.unwrap_or(0))?;
        }
        Ok(())
    }
}
