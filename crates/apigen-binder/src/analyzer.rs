//! Post-parse initialization and validation.
//!
//! Runs once per module after parsing (or never, when the model came from
//! the cache: derived values are cached too). Computes scripting-object
//! ancestry, POD-ness, script-vtable layout, synthesized field accessors,
//! property validation, unique names, and the auto-serialization lists, and
//! enforces the model invariants along the way.

use apigen_common::{Error, ErrorKind, Result, SourceLocation};
use apigen_model::{
    Access, ClassInfo, FieldInfo, FunctionInfo, InterfaceInfo, NodeIndex, NodeKind,
    ParameterInfo, PropertyInfo, SerializedKind, SerializedMember, StructInfo, TypeRef,
};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::inbuild;
use crate::resolver::BuildContext;

/// The semantic analysis pass. One instance serves a whole build; types are
/// initialized at most once, in dependency order (base before derived).
#[derive(Default)]
pub struct Analyzer {
    initialized: FxHashSet<NodeIndex>,
    in_progress: FxHashSet<NodeIndex>,
}

impl Analyzer {
    pub fn new() -> Self {
        Analyzer::default()
    }

    /// Initialize every type of a module. Files are sorted by path first so
    /// derived values never depend on parse completion order.
    pub fn initialize_module(&mut self, build: &mut BuildContext, module: NodeIndex) -> Result<()> {
        build.arena.sort_files(module);
        debug!("initializing module '{}'", build.arena.get(module).name);
        for index in build.arena.descendants(module) {
            self.ensure_type(build, index)?;
        }
        Ok(())
    }

    /// Initialize one type node (and its dependencies) exactly once.
    pub fn ensure_type(&mut self, build: &mut BuildContext, index: NodeIndex) -> Result<()> {
        if self.initialized.contains(&index) {
            return Ok(());
        }
        if !self.in_progress.insert(index) {
            let node = build.arena.get(index);
            return Err(Error {
                kind: ErrorKind::Semantic,
                message: format!("inheritance cycle involving '{}'", node.name),
                location: node.location.clone(),
            });
        }

        enum Dispatch {
            Class,
            Struct,
            Interface,
            Typedef,
            Other,
        }
        let dispatch = match build.arena.get(index).kind {
            NodeKind::Class(_) => Dispatch::Class,
            NodeKind::Struct(_) => Dispatch::Struct,
            NodeKind::Interface(_) => Dispatch::Interface,
            NodeKind::Typedef(_) => Dispatch::Typedef,
            _ => Dispatch::Other,
        };
        let result = match dispatch {
            Dispatch::Class => self.init_class(build, index),
            Dispatch::Struct => self.init_struct(build, index),
            Dispatch::Interface => self.init_interface(build, index),
            Dispatch::Typedef => {
                // Inflate the typedef, then initialize what it produced so
                // specialized members get derived values too.
                match build.ensure_typedef_resolved(index) {
                    Ok(()) => match build.typedef_backing(index) {
                        Some(backing) if backing != index => self.ensure_type(build, backing),
                        _ => Ok(()),
                    },
                    Err(err) => Err(err),
                }
            }
            Dispatch::Other => Ok(()),
        };

        self.in_progress.remove(&index);
        if result.is_ok() {
            self.initialized.insert(index);
        }
        result
    }

    // =========================================================================
    // Classes
    // =========================================================================

    fn init_class(&mut self, build: &mut BuildContext, index: NodeIndex) -> Result<()> {
        let node = build.arena.get(index);
        let location = node.location.clone();
        let name = node.name.clone();
        let mut info = node.as_class().expect("not a class").clone();

        // Scripting-object ancestry, by ascent from the roots.
        let base_index = match &info.base {
            Some(base) => build.resolve(base, index).map(|found| build.dealias(found)),
            None => None,
        };
        if let Some(base_index) = base_index {
            self.ensure_type(build, base_index)?;
            // A base that resolves to an interface was misdeclared; fold it
            // into the interface list.
            if matches!(build.arena.get(base_index).kind, NodeKind::Interface(_)) {
                let base = info.base.take().expect("base checked above");
                info.interfaces.insert(
                    0,
                    apigen_model::InterfaceRef {
                        access: info.base_access,
                        type_ref: base,
                    },
                );
            }
        }
        info.is_base_type_hidden = info.base.is_some() && base_index.is_none();
        info.is_scripting_object = inbuild::is_scripting_object_root(&name)
            || match (&info.base, base_index) {
                (Some(_), Some(base_index)) => build
                    .arena
                    .get(base_index)
                    .as_class()
                    .is_some_and(|base| base.is_scripting_object),
                (Some(base), None) => inbuild::is_scripting_object_root(&base.type_name),
                _ => false,
            };

        // Script-vtable layout.
        if info.is_sealed {
            info.script_vtable_offset = 0;
            info.script_vtable_size = 0;
        } else {
            let base_vtable = match (&info.base, base_index) {
                (Some(_), Some(base_index)) => build
                    .arena
                    .get(base_index)
                    .as_class()
                    .map_or(0, |base| base.script_vtable_size),
                _ => 0,
            };
            let mut interface_vtable = 0;
            for interface in &info.interfaces {
                if interface.access != Access::Public {
                    continue;
                }
                if let Some(found) = build.resolve(&interface.type_ref, index) {
                    let found = build.dealias(found);
                    self.ensure_type(build, found)?;
                    if let Some(interface_info) = build.arena.get(found).as_interface() {
                        interface_vtable += interface_info.vtable_size;
                    }
                }
            }
            let own_virtuals = info.functions.iter().filter(|f| f.is_virtual).count() as u32;
            info.script_vtable_offset = base_vtable + interface_vtable;
            info.script_vtable_size = info.script_vtable_offset + own_virtuals;
        }

        // Field accessors, property checks, unique names, serialization.
        synthesize_field_accessors(&mut info.fields, location.as_ref())?;
        for property in &mut info.properties {
            validate_property(property, location.as_ref())?;
        }
        assign_unique_names_class(&mut info);
        info.serialization = collect_class_serialization(&info);

        build.arena.get_mut(index).kind = NodeKind::Class(info);
        Ok(())
    }

    // =========================================================================
    // Structs
    // =========================================================================

    fn init_struct(&mut self, build: &mut BuildContext, index: NodeIndex) -> Result<()> {
        let node = build.arena.get(index);
        let mut info = node.as_struct().expect("not a struct").clone();

        // Base first: its POD flag feeds ours.
        if let Some(base) = &info.base {
            if let Some(base_index) = build.resolve(base, index) {
                let base_index = build.dealias(base_index);
                self.ensure_type(build, base_index)?;
            }
        }

        info.is_pod = Some(compute_struct_pod(build, index, &info));
        assign_unique_names(info.functions.iter_mut().collect());
        info.serialization = collect_struct_serialization(&info);

        build.arena.get_mut(index).kind = NodeKind::Struct(info);
        Ok(())
    }

    // =========================================================================
    // Interfaces
    // =========================================================================

    fn init_interface(&mut self, build: &mut BuildContext, index: NodeIndex) -> Result<()> {
        let node = build.arena.get(index);
        let mut info = node.as_interface().expect("not an interface").clone();

        let location = node.location.clone();
        info.vtable_size = info.functions.iter().filter(|f| f.is_virtual).count() as u32;
        synthesize_field_accessors(&mut info.fields, location.as_ref())?;
        assign_unique_names_interface(&mut info);

        build.arena.get_mut(index).kind = NodeKind::Interface(info);
        Ok(())
    }
}

// =============================================================================
// POD
// =============================================================================

fn compute_struct_pod(build: &mut BuildContext, index: NodeIndex, info: &StructInfo) -> bool {
    if info.force_no_pod || info.is_template || !info.interfaces.is_empty() {
        return false;
    }
    if let Some(base) = &info.base {
        if !build.is_pod_type(base, index) {
            return false;
        }
    }
    info.fields.iter().filter(|f| !f.is_static).all(|field| {
        build.is_pod_type(&field.type_ref, index) && !field.is_managed_array()
    })
}

// =============================================================================
// Field accessors
// =============================================================================

/// Synthesize getter/setter shims for exposable fields. Private, hidden,
/// and constexpr fields keep no accessors; read-only fields get no setter.
/// A writable fixed-array field is rejected: there is no supported setter
/// shape for fixed native buffers.
fn synthesize_field_accessors(
    fields: &mut [FieldInfo],
    location: Option<&SourceLocation>,
) -> Result<()> {
    for field in fields {
        if field.access == Access::Private || field.is_hidden || field.is_constexpr {
            continue;
        }
        if field.type_ref.is_array && !field.is_read_only {
            return Err(Error {
                kind: ErrorKind::Semantic,
                message: format!(
                    "fixed-array field '{}' must be ReadOnly; fixed-array setters are not supported",
                    field.name
                ),
                location: location.cloned(),
            });
        }
        let mut getter = FunctionInfo::new(field.name.clone(), field.type_ref.clone());
        getter.is_const = true;
        getter.is_static = field.is_static;
        getter.access = field.access;
        field.getter = Some(getter);

        if !field.is_read_only {
            let mut setter = FunctionInfo::new(field.name.clone(), TypeRef::void());
            setter
                .parameters
                .push(ParameterInfo::new("value", field.type_ref.clone()));
            setter.is_static = field.is_static;
            setter.access = field.access;
            field.setter = Some(setter);
        }
    }
    Ok(())
}

// =============================================================================
// Properties
// =============================================================================

/// Compatible accessor type pairs, beyond exact equality.
fn types_compatible(a: &TypeRef, b: &TypeRef) -> bool {
    let a = a.bare();
    let b = b.bare();
    if a == b {
        return true;
    }
    let names = (a.type_name.as_str(), b.type_name.as_str());
    let pair_ok = matches!(
        names,
        ("String", "StringView") | ("StringView", "String") | ("Array", "Span") | ("Span", "Array")
    );
    pair_ok && a.generic_args == b.generic_args
}

fn validate_property(property: &mut PropertyInfo, location: Option<&SourceLocation>) -> Result<()> {
    let err = |message: String| Error {
        kind: ErrorKind::Semantic,
        message,
        location: location.cloned(),
    };

    if let (Some(getter), Some(setter)) = (&property.getter, &property.setter) {
        if getter.is_static != setter.is_static {
            return Err(err(format!(
                "property '{}' accessors disagree on static",
                property.name
            )));
        }
        let value = &setter.parameters[0].type_ref;
        if !types_compatible(&getter.return_type, value) {
            return Err(err(format!(
                "property '{}' getter returns '{}' but setter takes '{}'",
                property.name, getter.return_type, value
            )));
        }
        rewrite_gets_comment(&mut property.comment);
    }
    Ok(())
}

/// `/// Gets ...` becomes `/// Gets or sets ...` once a setter exists.
fn rewrite_gets_comment(comment: &mut [String]) {
    for line in comment {
        if let Some(pos) = line.find("Gets ") {
            if !line.contains("Gets or sets ") {
                line.replace_range(pos..pos + 5, "Gets or sets ");
            }
        }
    }
}

// =============================================================================
// Unique names
// =============================================================================

/// Assign pairwise-distinct unique names within one container. Each unique
/// name begins with the function's own name; duplicates get a monotonically
/// increasing integer suffix.
fn assign_unique_names(functions: Vec<&mut FunctionInfo>) {
    let mut used: FxHashMap<String, u32> = FxHashMap::default();
    for function in functions {
        let count = used.entry(function.name.clone()).or_insert(0);
        function.unique_name = if *count == 0 {
            function.name.clone()
        } else {
            format!("{}{}", function.name, count)
        };
        *count += 1;
    }
}

/// Unique names across a class's whole function set: declared functions in
/// source order, then property accessors, then synthesized field accessors.
fn assign_unique_names_class(info: &mut ClassInfo) {
    let mut all: Vec<&mut FunctionInfo> = Vec::new();
    all.extend(info.functions.iter_mut());
    for property in &mut info.properties {
        if let Some(getter) = &mut property.getter {
            all.push(getter);
        }
        if let Some(setter) = &mut property.setter {
            all.push(setter);
        }
    }
    for field in &mut info.fields {
        if let Some(getter) = &mut field.getter {
            all.push(getter);
        }
        if let Some(setter) = &mut field.setter {
            all.push(setter);
        }
    }
    assign_unique_names(all);
}

fn assign_unique_names_interface(info: &mut InterfaceInfo) {
    let mut all: Vec<&mut FunctionInfo> = Vec::new();
    all.extend(info.functions.iter_mut());
    for field in &mut info.fields {
        if let Some(getter) = &mut field.getter {
            all.push(getter);
        }
        if let Some(setter) = &mut field.setter {
            all.push(setter);
        }
    }
    assign_unique_names(all);
}

// =============================================================================
// Auto-serialization
// =============================================================================

fn field_serializable(field: &FieldInfo) -> bool {
    if field.is_static {
        return false;
    }
    let attributes = field.attributes.as_deref().unwrap_or("");
    if attributes.contains("NoSerialize") || attributes.contains("NonSerialized") {
        return false;
    }
    field.access == Access::Public || attributes.contains("Serialize")
}

fn collect_class_serialization(info: &ClassInfo) -> Vec<SerializedMember> {
    if !info.is_auto_serialization {
        return Vec::new();
    }
    let mut members = Vec::new();
    for field in &info.fields {
        if field_serializable(field) {
            members.push(SerializedMember {
                kind: SerializedKind::Field,
                name: field.name.clone(),
                type_ref: field.type_ref.clone(),
            });
        }
    }
    for property in &info.properties {
        let attributes = property.attributes.as_deref().unwrap_or("");
        if property.getter.is_some()
            && property.setter.is_some()
            && !property.is_static()
            && !attributes.contains("NoSerialize")
            && !attributes.contains("NonSerialized")
            && (property.access == Access::Public || attributes.contains("Serialize"))
        {
            members.push(SerializedMember {
                kind: SerializedKind::Property,
                name: property.name.clone(),
                type_ref: property.type_ref.clone(),
            });
        }
    }
    members
}

fn collect_struct_serialization(info: &StructInfo) -> Vec<SerializedMember> {
    if !info.is_auto_serialization {
        return Vec::new();
    }
    info.fields
        .iter()
        .filter(|field| field_serializable(field))
        .map(|field| SerializedMember {
            kind: SerializedKind::Field,
            name: field.name.clone(),
            type_ref: field.type_ref.clone(),
        })
        .collect()
}
