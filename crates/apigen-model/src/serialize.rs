//! Binary node serialization for the module cache.
//!
//! Each node writes a fully-qualified discriminator string, its common
//! fields, its payload fields, then its children recursively. Optional
//! strings and lists are validity-byte/length prefixed through the
//! `apigen-common` binary primitives. Readers validate everything and fail
//! with `CacheCorruption`, which callers treat as a miss.
//!
//! `TypedefInfo::resolved` is intentionally not written; type references
//! are re-resolved lazily after a cache load.

use apigen_common::{BinaryReader, BinaryWriter, Error, Result, SourceLocation, limits};

use crate::arena::{ApiArena, NodeIndex};
use crate::members::{
    EnumEntry, EventInfo, FieldInfo, FunctionInfo, InterfaceRef, ParamFlags, ParameterInfo,
    PropertyInfo, SerializedKind, SerializedMember,
};
use crate::node::{
    Access, ClassInfo, EnumInfo, FileInfo, InjectCodeInfo, InterfaceInfo, LangTypeInfo,
    ModuleInfo, Node, NodeKind, StructInfo, TypedefInfo,
};
use crate::typeref::TypeRef;

// =============================================================================
// Node trees
// =============================================================================

/// Write the subtree rooted at `index`.
pub fn write_node(arena: &ApiArena, index: NodeIndex, w: &mut BinaryWriter) {
    let node = arena.get(index);
    w.write_string(node.kind.discriminator());

    // Common surface, fixed order.
    w.write_string(&node.name);
    w.write_opt_string(node.native_name.as_deref());
    w.write_opt_string(node.namespace.as_deref());
    w.write_string_list(&node.comment);
    w.write_opt_string(node.attributes.as_deref());
    w.write_opt_string(node.deprecated.as_deref());
    w.write_u32(node.tags.len() as u32);
    for (key, value) in &node.tags {
        w.write_string(key);
        w.write_string(value);
    }
    write_access(node.access, w);
    match &node.location {
        Some(loc) => {
            w.write_bool(true);
            w.write_string(&loc.file);
            w.write_u32(loc.line);
        }
        None => w.write_bool(false),
    }

    // Variant payload.
    match &node.kind {
        NodeKind::Module(info) => {
            w.write_string(&info.path);
            w.write_string_list(&info.build_flags);
        }
        NodeKind::File(info) => w.write_string(&info.path),
        NodeKind::Class(info) => write_class(info, w),
        NodeKind::Struct(info) => write_struct(info, w),
        NodeKind::Enum(info) => write_enum(info, w),
        NodeKind::Interface(info) => write_interface(info, w),
        NodeKind::Typedef(info) => {
            write_type_ref(&info.target, w);
            w.write_bool(info.is_alias);
        }
        NodeKind::InjectCode(info) => {
            w.write_string(&info.language);
            w.write_string(&info.code);
        }
        NodeKind::LangType(LangTypeInfo) => {}
    }

    // Children, recursively.
    w.write_u32(node.children.len() as u32);
    for &child in &node.children {
        write_node(arena, child, w);
    }
}

/// Read a subtree into `arena`, returning its root. Parent links are
/// restored while reading each node's children.
pub fn read_node(arena: &mut ApiArena, r: &mut BinaryReader<'_>) -> Result<NodeIndex> {
    read_node_at(arena, r, 0)
}

fn read_node_at(arena: &mut ApiArena, r: &mut BinaryReader<'_>, depth: usize) -> Result<NodeIndex> {
    if depth > limits::MAX_NODE_DEPTH {
        return Err(Error::corrupt("node tree too deep"));
    }

    let discriminator = r.read_string()?;

    let name = r.read_string()?;
    let native_name = r.read_opt_string()?;
    let namespace = r.read_opt_string()?;
    let comment = r.read_string_list()?;
    let attributes = r.read_opt_string()?;
    let deprecated = r.read_opt_string()?;
    let tag_count = r.read_list_len()?;
    let mut tags = indexmap::IndexMap::with_capacity(tag_count.min(64));
    for _ in 0..tag_count {
        let key = r.read_string()?;
        let value = r.read_string()?;
        tags.insert(key, value);
    }
    let access = read_access(r)?;
    let location = if r.read_bool()? {
        let file = r.read_string()?;
        let line = r.read_u32()?;
        Some(SourceLocation::new(file, line))
    } else {
        None
    };

    let kind = match discriminator.as_str() {
        "apigen.model.ModuleInfo" => NodeKind::Module(ModuleInfo {
            path: r.read_string()?,
            build_flags: r.read_string_list()?,
        }),
        "apigen.model.FileInfo" => NodeKind::File(FileInfo {
            path: r.read_string()?,
        }),
        "apigen.model.ClassInfo" => NodeKind::Class(read_class(r)?),
        "apigen.model.StructInfo" => NodeKind::Struct(read_struct(r)?),
        "apigen.model.EnumInfo" => NodeKind::Enum(read_enum(r)?),
        "apigen.model.InterfaceInfo" => NodeKind::Interface(read_interface(r)?),
        "apigen.model.TypedefInfo" => NodeKind::Typedef(TypedefInfo {
            target: read_type_ref(r)?,
            is_alias: r.read_bool()?,
            resolved: None,
        }),
        "apigen.model.InjectCodeInfo" => NodeKind::InjectCode(InjectCodeInfo {
            language: r.read_string()?,
            code: r.read_string()?,
        }),
        "apigen.model.LangTypeInfo" => NodeKind::LangType(LangTypeInfo),
        other => {
            return Err(Error::corrupt(format!(
                "unknown node discriminator '{other}'"
            )));
        }
    };

    let index = arena.alloc(Node {
        name,
        native_name,
        namespace,
        comment,
        attributes,
        deprecated,
        tags,
        access,
        location,
        parent: None,
        children: Vec::new(),
        kind,
    });

    let child_count = r.read_list_len()?;
    for _ in 0..child_count {
        let child = read_node_at(arena, r, depth + 1)?;
        arena.get_mut(child).parent = Some(index);
        arena.get_mut(index).children.push(child);
    }

    Ok(index)
}

// =============================================================================
// Payloads
// =============================================================================

fn write_class(info: &ClassInfo, w: &mut BinaryWriter) {
    write_opt_type_ref(info.base.as_ref(), w);
    write_access(info.base_access, w);
    w.write_u32(info.interfaces.len() as u32);
    for interface in &info.interfaces {
        write_access(interface.access, w);
        write_type_ref(&interface.type_ref, w);
    }
    w.write_bool(info.is_static);
    w.write_bool(info.is_sealed);
    w.write_bool(info.is_abstract);
    w.write_bool(info.no_spawn);
    w.write_bool(info.no_constructor);
    w.write_bool(info.is_auto_serialization);
    w.write_bool(info.is_template);
    w.write_string_list(&info.template_params);
    write_list(&info.fields, w, write_field);
    write_list(&info.properties, w, write_property);
    write_list(&info.functions, w, write_function);
    write_list(&info.events, w, write_event);
    w.write_bool(info.is_scripting_object);
    w.write_bool(info.is_base_type_hidden);
    w.write_u32(info.script_vtable_size);
    w.write_u32(info.script_vtable_offset);
    write_list(&info.serialization, w, write_serialized_member);
}

fn read_class(r: &mut BinaryReader<'_>) -> Result<ClassInfo> {
    let base = read_opt_type_ref(r)?;
    let base_access = read_access(r)?;
    let interface_count = r.read_list_len()?;
    let mut interfaces = Vec::with_capacity(interface_count.min(16));
    for _ in 0..interface_count {
        interfaces.push(InterfaceRef {
            access: read_access(r)?,
            type_ref: read_type_ref(r)?,
        });
    }
    Ok(ClassInfo {
        base,
        base_access,
        interfaces,
        is_static: r.read_bool()?,
        is_sealed: r.read_bool()?,
        is_abstract: r.read_bool()?,
        no_spawn: r.read_bool()?,
        no_constructor: r.read_bool()?,
        is_auto_serialization: r.read_bool()?,
        is_template: r.read_bool()?,
        template_params: r.read_string_list()?,
        fields: read_list(r, read_field)?,
        properties: read_list(r, read_property)?,
        functions: read_list(r, read_function)?,
        events: read_list(r, read_event)?,
        is_scripting_object: r.read_bool()?,
        is_base_type_hidden: r.read_bool()?,
        script_vtable_size: r.read_u32()?,
        script_vtable_offset: r.read_u32()?,
        serialization: read_list(r, read_serialized_member)?,
    })
}

fn write_struct(info: &StructInfo, w: &mut BinaryWriter) {
    write_opt_type_ref(info.base.as_ref(), w);
    w.write_u32(info.interfaces.len() as u32);
    for interface in &info.interfaces {
        write_access(interface.access, w);
        write_type_ref(&interface.type_ref, w);
    }
    w.write_bool(info.is_auto_serialization);
    w.write_bool(info.force_no_pod);
    w.write_bool(info.no_default);
    w.write_bool(info.is_template);
    w.write_string_list(&info.template_params);
    write_list(&info.fields, w, write_field);
    write_list(&info.functions, w, write_function);
    match info.is_pod {
        Some(pod) => {
            w.write_bool(true);
            w.write_bool(pod);
        }
        None => w.write_bool(false),
    }
    write_list(&info.serialization, w, write_serialized_member);
}

fn read_struct(r: &mut BinaryReader<'_>) -> Result<StructInfo> {
    let base = read_opt_type_ref(r)?;
    let interface_count = r.read_list_len()?;
    let mut interfaces = Vec::with_capacity(interface_count.min(16));
    for _ in 0..interface_count {
        interfaces.push(InterfaceRef {
            access: read_access(r)?,
            type_ref: read_type_ref(r)?,
        });
    }
    Ok(StructInfo {
        base,
        interfaces,
        is_auto_serialization: r.read_bool()?,
        force_no_pod: r.read_bool()?,
        no_default: r.read_bool()?,
        is_template: r.read_bool()?,
        template_params: r.read_string_list()?,
        fields: read_list(r, read_field)?,
        functions: read_list(r, read_function)?,
        is_pod: if r.read_bool()? {
            Some(r.read_bool()?)
        } else {
            None
        },
        serialization: read_list(r, read_serialized_member)?,
    })
}

fn write_enum(info: &EnumInfo, w: &mut BinaryWriter) {
    write_opt_type_ref(info.underlying.as_ref(), w);
    write_list(&info.entries, w, |entry, w| {
        w.write_string(&entry.name);
        w.write_opt_string(entry.value.as_deref());
        w.write_string_list(&entry.comment);
        w.write_opt_string(entry.attributes.as_deref());
    });
}

fn read_enum(r: &mut BinaryReader<'_>) -> Result<EnumInfo> {
    Ok(EnumInfo {
        underlying: read_opt_type_ref(r)?,
        entries: read_list(r, |r| {
            Ok(EnumEntry {
                name: r.read_string()?,
                value: r.read_opt_string()?,
                comment: r.read_string_list()?,
                attributes: r.read_opt_string()?,
            })
        })?,
    })
}

fn write_interface(info: &InterfaceInfo, w: &mut BinaryWriter) {
    write_list(&info.fields, w, write_field);
    write_list(&info.functions, w, write_function);
    w.write_u32(info.vtable_size);
}

fn read_interface(r: &mut BinaryReader<'_>) -> Result<InterfaceInfo> {
    Ok(InterfaceInfo {
        fields: read_list(r, read_field)?,
        functions: read_list(r, read_function)?,
        vtable_size: r.read_u32()?,
    })
}

// =============================================================================
// Members
// =============================================================================

fn write_field(field: &FieldInfo, w: &mut BinaryWriter) {
    w.write_string(&field.name);
    write_type_ref(&field.type_ref, w);
    w.write_bool(field.is_static);
    w.write_bool(field.is_constexpr);
    w.write_bool(field.is_read_only);
    w.write_bool(field.no_array);
    w.write_bool(field.is_hidden);
    w.write_bool(field.no_proxy);
    w.write_opt_string(field.default_value.as_deref());
    write_opt_type_ref(field.marshal_as.as_ref(), w);
    write_access(field.access, w);
    w.write_string_list(&field.comment);
    w.write_opt_string(field.attributes.as_deref());
    write_opt(&field.getter, w, write_function);
    write_opt(&field.setter, w, write_function);
}

fn read_field(r: &mut BinaryReader<'_>) -> Result<FieldInfo> {
    Ok(FieldInfo {
        name: r.read_string()?,
        type_ref: read_type_ref(r)?,
        is_static: r.read_bool()?,
        is_constexpr: r.read_bool()?,
        is_read_only: r.read_bool()?,
        no_array: r.read_bool()?,
        is_hidden: r.read_bool()?,
        no_proxy: r.read_bool()?,
        default_value: r.read_opt_string()?,
        marshal_as: read_opt_type_ref(r)?,
        access: read_access(r)?,
        comment: r.read_string_list()?,
        attributes: r.read_opt_string()?,
        getter: read_opt(r, read_function)?,
        setter: read_opt(r, read_function)?,
    })
}

fn write_property(property: &PropertyInfo, w: &mut BinaryWriter) {
    w.write_string(&property.name);
    write_type_ref(&property.type_ref, w);
    write_opt(&property.getter, w, write_function);
    write_opt(&property.setter, w, write_function);
    write_access(property.access, w);
    w.write_string_list(&property.comment);
    w.write_opt_string(property.attributes.as_deref());
}

fn read_property(r: &mut BinaryReader<'_>) -> Result<PropertyInfo> {
    Ok(PropertyInfo {
        name: r.read_string()?,
        type_ref: read_type_ref(r)?,
        getter: read_opt(r, read_function)?,
        setter: read_opt(r, read_function)?,
        access: read_access(r)?,
        comment: r.read_string_list()?,
        attributes: r.read_opt_string()?,
    })
}

fn write_function(function: &FunctionInfo, w: &mut BinaryWriter) {
    w.write_string(&function.name);
    w.write_string(&function.unique_name);
    write_type_ref(&function.return_type, w);
    write_list(&function.parameters, w, write_parameter);
    w.write_bool(function.is_virtual);
    w.write_bool(function.is_const);
    w.write_bool(function.is_static);
    w.write_bool(function.no_proxy);
    w.write_bool(function.is_hidden);
    w.write_bool(function.is_deprecated);
    w.write_opt_string(function.deprecated_message.as_deref());
    write_access(function.access, w);
    w.write_string_list(&function.comment);
    w.write_opt_string(function.attributes.as_deref());
}

fn read_function(r: &mut BinaryReader<'_>) -> Result<FunctionInfo> {
    Ok(FunctionInfo {
        name: r.read_string()?,
        unique_name: r.read_string()?,
        return_type: read_type_ref(r)?,
        parameters: read_list(r, read_parameter)?,
        is_virtual: r.read_bool()?,
        is_const: r.read_bool()?,
        is_static: r.read_bool()?,
        no_proxy: r.read_bool()?,
        is_hidden: r.read_bool()?,
        is_deprecated: r.read_bool()?,
        deprecated_message: r.read_opt_string()?,
        access: read_access(r)?,
        comment: r.read_string_list()?,
        attributes: r.read_opt_string()?,
    })
}

fn write_parameter(parameter: &ParameterInfo, w: &mut BinaryWriter) {
    w.write_string(&parameter.name);
    write_type_ref(&parameter.type_ref, w);
    w.write_opt_string(parameter.default_value.as_deref());
    w.write_opt_string(parameter.attributes.as_deref());
    w.write_u8(parameter.flags.bits());
}

fn read_parameter(r: &mut BinaryReader<'_>) -> Result<ParameterInfo> {
    Ok(ParameterInfo {
        name: r.read_string()?,
        type_ref: read_type_ref(r)?,
        default_value: r.read_opt_string()?,
        attributes: r.read_opt_string()?,
        flags: ParamFlags::from_bits(r.read_u8()?)
            .ok_or_else(|| Error::corrupt("invalid parameter flags"))?,
    })
}

fn write_event(event: &EventInfo, w: &mut BinaryWriter) {
    w.write_string(&event.name);
    w.write_bool(event.is_static);
    w.write_bool(event.is_hidden);
    write_list(&event.signature, w, write_type_ref);
    write_access(event.access, w);
    w.write_string_list(&event.comment);
    w.write_opt_string(event.attributes.as_deref());
}

fn read_event(r: &mut BinaryReader<'_>) -> Result<EventInfo> {
    Ok(EventInfo {
        name: r.read_string()?,
        is_static: r.read_bool()?,
        is_hidden: r.read_bool()?,
        signature: read_list(r, read_type_ref)?,
        access: read_access(r)?,
        comment: r.read_string_list()?,
        attributes: r.read_opt_string()?,
    })
}

fn write_serialized_member(member: &SerializedMember, w: &mut BinaryWriter) {
    w.write_u8(match member.kind {
        SerializedKind::Field => 0,
        SerializedKind::Property => 1,
    });
    w.write_string(&member.name);
    write_type_ref(&member.type_ref, w);
}

fn read_serialized_member(r: &mut BinaryReader<'_>) -> Result<SerializedMember> {
    let kind = match r.read_u8()? {
        0 => SerializedKind::Field,
        1 => SerializedKind::Property,
        other => return Err(Error::corrupt(format!("invalid member kind {other}"))),
    };
    Ok(SerializedMember {
        kind,
        name: r.read_string()?,
        type_ref: read_type_ref(r)?,
    })
}

// =============================================================================
// Type references and small helpers
// =============================================================================

pub fn write_type_ref(t: &TypeRef, w: &mut BinaryWriter) {
    w.write_string(&t.type_name);
    w.write_bool(t.is_const);
    w.write_bool(t.is_ref);
    w.write_bool(t.is_move_ref);
    w.write_bool(t.is_ptr);
    w.write_bool(t.is_array);
    w.write_bool(t.is_bit_field);
    w.write_opt_string(t.array_size.as_deref());
    match t.bit_size {
        Some(size) => {
            w.write_bool(true);
            w.write_u32(size);
        }
        None => w.write_bool(false),
    }
    w.write_u32(t.generic_args.len() as u32);
    for arg in &t.generic_args {
        write_type_ref(arg, w);
    }
}

pub fn read_type_ref(r: &mut BinaryReader<'_>) -> Result<TypeRef> {
    let type_name = r.read_string()?;
    let is_const = r.read_bool()?;
    let is_ref = r.read_bool()?;
    let is_move_ref = r.read_bool()?;
    let is_ptr = r.read_bool()?;
    let is_array = r.read_bool()?;
    let is_bit_field = r.read_bool()?;
    let array_size = r.read_opt_string()?;
    let bit_size = if r.read_bool()? {
        Some(r.read_u32()?)
    } else {
        None
    };
    let arg_count = r.read_list_len()?;
    if arg_count > apigen_common::limits::MAX_GENERIC_DEPTH * 8 {
        return Err(Error::corrupt("generic argument list too long"));
    }
    let mut generic_args = Vec::with_capacity(arg_count);
    for _ in 0..arg_count {
        generic_args.push(read_type_ref(r)?);
    }
    Ok(TypeRef {
        type_name,
        is_const,
        is_ref,
        is_move_ref,
        is_ptr,
        is_array,
        is_bit_field,
        array_size,
        bit_size,
        generic_args,
    })
}

fn write_opt_type_ref(t: Option<&TypeRef>, w: &mut BinaryWriter) {
    match t {
        Some(t) => {
            w.write_bool(true);
            write_type_ref(t, w);
        }
        None => w.write_bool(false),
    }
}

fn read_opt_type_ref(r: &mut BinaryReader<'_>) -> Result<Option<TypeRef>> {
    if r.read_bool()? {
        Ok(Some(read_type_ref(r)?))
    } else {
        Ok(None)
    }
}

fn write_access(access: Access, w: &mut BinaryWriter) {
    w.write_u8(match access {
        Access::Public => 0,
        Access::Protected => 1,
        Access::Private => 2,
        Access::Internal => 3,
    });
}

fn read_access(r: &mut BinaryReader<'_>) -> Result<Access> {
    match r.read_u8()? {
        0 => Ok(Access::Public),
        1 => Ok(Access::Protected),
        2 => Ok(Access::Private),
        3 => Ok(Access::Internal),
        other => Err(Error::corrupt(format!("invalid access ordinal {other}"))),
    }
}

fn write_opt<T>(item: &Option<T>, w: &mut BinaryWriter, write: impl Fn(&T, &mut BinaryWriter)) {
    match item {
        Some(item) => {
            w.write_bool(true);
            write(item, w);
        }
        None => w.write_bool(false),
    }
}

fn read_opt<T>(
    r: &mut BinaryReader<'_>,
    read: impl Fn(&mut BinaryReader<'_>) -> Result<T>,
) -> Result<Option<T>> {
    if r.read_bool()? {
        Ok(Some(read(r)?))
    } else {
        Ok(None)
    }
}

fn write_list<T>(items: &[T], w: &mut BinaryWriter, write: impl Fn(&T, &mut BinaryWriter)) {
    w.write_u32(items.len() as u32);
    for item in items {
        write(item, w);
    }
}

fn read_list<T>(
    r: &mut BinaryReader<'_>,
    read: impl Fn(&mut BinaryReader<'_>) -> Result<T>,
) -> Result<Vec<T>> {
    let count = r.read_list_len()?;
    let mut items = Vec::with_capacity(count.min(256));
    for _ in 0..count {
        items.push(read(r)?);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::members::{FieldInfo, FunctionInfo, ParameterInfo};
    use crate::node::{FileInfo, ModuleInfo};

    fn sample_module(arena: &mut ApiArena) -> NodeIndex {
        let module = arena.alloc(Node::new(
            "Core",
            NodeKind::Module(ModuleInfo {
                path: "Core.Build.json".to_string(),
                build_flags: vec!["USE_EDITOR".to_string()],
            }),
        ));
        let file = arena.alloc(Node::new(
            "Actor.h",
            NodeKind::File(FileInfo {
                path: "Source/Actor.h".to_string(),
            }),
        ));
        arena.get_mut(file).namespace = Some("Engine".to_string());
        arena.add_child(module, file);

        let mut class = ClassInfo {
            base: Some(TypeRef::named("ScriptingObject")),
            is_scripting_object: true,
            script_vtable_size: 2,
            script_vtable_offset: 1,
            ..ClassInfo::default()
        };
        let mut bar = FunctionInfo::new("Bar", TypeRef::named("int32"));
        bar.parameters
            .push(ParameterInfo::new("x", TypeRef::named("float")));
        class.functions.push(bar);
        class
            .fields
            .push(FieldInfo::new("Name", TypeRef::named("String")));
        let mut node = Node::new("Actor", NodeKind::Class(class));
        node.comment = vec!["/// <summary>An actor.</summary>".to_string()];
        node.tags.insert("Category".to_string(), "Level".to_string());
        let class = arena.alloc(node);
        arena.add_child(file, class);
        module
    }

    #[test]
    fn module_subtree_round_trips_bit_for_bit() {
        let mut arena = ApiArena::new();
        let module = sample_module(&mut arena);

        let mut writer = BinaryWriter::new();
        write_node(&arena, module, &mut writer);
        let bytes = writer.into_bytes();

        let mut restored = ApiArena::new();
        let mut reader = BinaryReader::new(&bytes);
        let new_module = read_node(&mut restored, &mut reader).unwrap();
        assert!(reader.is_at_end());

        assert_eq!(arena.dump(module), restored.dump(new_module));

        // Parent links are recovered while reading children.
        let file = restored.get(new_module).children[0];
        assert_eq!(restored.get(file).parent, Some(new_module));
        let class = restored.get(file).children[0];
        assert_eq!(restored.get(class).parent, Some(file));

        // Writing the restored tree again yields identical bytes.
        let mut writer = BinaryWriter::new();
        write_node(&restored, new_module, &mut writer);
        assert_eq!(writer.into_bytes(), bytes);
    }

    #[test]
    fn type_refs_round_trip_with_equality() {
        let mut t = TypeRef::named("Dictionary");
        t.is_const = true;
        t.is_ref = true;
        t.generic_args.push(TypeRef::named("String"));
        let mut value = TypeRef::named("Array");
        value.generic_args.push(TypeRef::named("int32"));
        t.generic_args.push(value);

        let mut writer = BinaryWriter::new();
        write_type_ref(&t, &mut writer);
        let bytes = writer.into_bytes();
        let mut reader = BinaryReader::new(&bytes);
        let restored = read_type_ref(&mut reader).unwrap();
        assert_eq!(t, restored);
    }

    #[test]
    fn unknown_discriminator_aborts_with_its_name() {
        let mut writer = BinaryWriter::new();
        writer.write_string("apigen.model.Mystery");
        writer.write_string("name");
        writer.write_opt_string(None);
        writer.write_opt_string(None);
        writer.write_string_list(&[] as &[String]);
        writer.write_opt_string(None);
        writer.write_opt_string(None);
        writer.write_u32(0);
        write_access(Access::Public, &mut writer);
        writer.write_bool(false);
        let bytes = writer.into_bytes();
        let mut reader = BinaryReader::new(&bytes);
        let mut arena = ApiArena::new();
        let err = read_node(&mut arena, &mut reader).unwrap_err();
        assert!(err.message.contains("apigen.model.Mystery"), "{err}");
    }

    #[test]
    fn truncated_payload_is_corruption() {
        let mut arena = ApiArena::new();
        let module = sample_module(&mut arena);
        let mut writer = BinaryWriter::new();
        write_node(&arena, module, &mut writer);
        let bytes = writer.into_bytes();

        let mut restored = ApiArena::new();
        let mut reader = BinaryReader::new(&bytes[..bytes.len() / 2]);
        assert!(read_node(&mut restored, &mut reader).is_err());
    }
}
