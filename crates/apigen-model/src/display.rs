//! Textual model dump.
//!
//! `ApiArena::dump` renders a subtree as stable indented text covering every
//! field that matters for identity. The cache round-trip test compares dumps
//! of the written and re-read model, so additions to the model should be
//! reflected here.

use std::fmt::Write as _;

use crate::arena::{ApiArena, NodeIndex};
use crate::members::{EventInfo, FieldInfo, FunctionInfo, PropertyInfo, SerializedKind};
use crate::node::NodeKind;

impl ApiArena {
    /// Render the subtree rooted at `root` as stable indented text.
    pub fn dump(&self, root: NodeIndex) -> String {
        let mut out = String::new();
        self.dump_node(root, 0, &mut out);
        out
    }

    fn dump_node(&self, index: NodeIndex, depth: usize, out: &mut String) {
        let node = self.get(index);
        let pad = "  ".repeat(depth);
        let _ = write!(out, "{pad}{} {}", node.kind.label(), node.name);
        if let Some(native) = &node.native_name {
            let _ = write!(out, " (native {native})");
        }
        if let Some(ns) = &node.namespace {
            let _ = write!(out, " ns={ns}");
        }
        let _ = write!(out, " access={}", node.access.keyword());
        if let Some(message) = &node.deprecated {
            let _ = write!(out, " deprecated={message:?}");
        }
        if let Some(attributes) = &node.attributes {
            let _ = write!(out, " attributes={attributes:?}");
        }
        if !node.tags.is_empty() {
            let _ = write!(out, " tags={{");
            for (i, (key, value)) in node.tags.iter().enumerate() {
                if i > 0 {
                    let _ = write!(out, ", ");
                }
                let _ = write!(out, "{key}={value}");
            }
            let _ = write!(out, "}}");
        }
        out.push('\n');
        for line in &node.comment {
            let _ = writeln!(out, "{pad}  {line}");
        }

        let member_pad = format!("{pad}  ");
        match &node.kind {
            NodeKind::Module(info) => {
                let _ = writeln!(out, "{member_pad}path={}", info.path);
                if !info.build_flags.is_empty() {
                    let _ = writeln!(out, "{member_pad}flags={}", info.build_flags.join(","));
                }
            }
            NodeKind::File(info) => {
                let _ = writeln!(out, "{member_pad}path={}", info.path);
            }
            NodeKind::Class(info) => {
                if let Some(base) = &info.base {
                    let _ = writeln!(
                        out,
                        "{member_pad}base={} ({})",
                        base,
                        info.base_access.keyword()
                    );
                }
                for interface in &info.interfaces {
                    let _ = writeln!(
                        out,
                        "{member_pad}implements={} ({})",
                        interface.type_ref,
                        interface.access.keyword()
                    );
                }
                let _ = writeln!(
                    out,
                    "{member_pad}flags static={} sealed={} abstract={} noSpawn={} noCtor={} autoSer={} template={}",
                    info.is_static,
                    info.is_sealed,
                    info.is_abstract,
                    info.no_spawn,
                    info.no_constructor,
                    info.is_auto_serialization,
                    info.is_template
                );
                let _ = writeln!(
                    out,
                    "{member_pad}derived scriptingObject={} baseHidden={} vtable={}+{}",
                    info.is_scripting_object,
                    info.is_base_type_hidden,
                    info.script_vtable_offset,
                    info.script_vtable_size
                );
                self.dump_members(
                    &info.fields,
                    &info.properties,
                    &info.functions,
                    &info.events,
                    &member_pad,
                    out,
                );
                for member in &info.serialization {
                    let kind = match member.kind {
                        SerializedKind::Field => "field",
                        SerializedKind::Property => "property",
                    };
                    let _ = writeln!(
                        out,
                        "{member_pad}serialize {kind} {}: {}",
                        member.name, member.type_ref
                    );
                }
            }
            NodeKind::Struct(info) => {
                if let Some(base) = &info.base {
                    let _ = writeln!(out, "{member_pad}base={base}");
                }
                for interface in &info.interfaces {
                    let _ = writeln!(out, "{member_pad}implements={}", interface.type_ref);
                }
                let _ = writeln!(
                    out,
                    "{member_pad}flags autoSer={} forceNoPod={} noDefault={} template={} pod={:?}",
                    info.is_auto_serialization,
                    info.force_no_pod,
                    info.no_default,
                    info.is_template,
                    info.is_pod
                );
                self.dump_members(&info.fields, &[], &info.functions, &[], &member_pad, out);
            }
            NodeKind::Enum(info) => {
                if let Some(underlying) = &info.underlying {
                    let _ = writeln!(out, "{member_pad}underlying={underlying}");
                }
                for entry in &info.entries {
                    let _ = write!(out, "{member_pad}entry {}", entry.name);
                    if let Some(value) = &entry.value {
                        let _ = write!(out, " = {value}");
                    }
                    out.push('\n');
                    for line in &entry.comment {
                        let _ = writeln!(out, "{member_pad}  {line}");
                    }
                }
            }
            NodeKind::Interface(info) => {
                let _ = writeln!(out, "{member_pad}vtableSize={}", info.vtable_size);
                self.dump_members(&info.fields, &[], &info.functions, &[], &member_pad, out);
            }
            NodeKind::Typedef(info) => {
                let _ = writeln!(
                    out,
                    "{member_pad}target={} alias={}",
                    info.target, info.is_alias
                );
            }
            NodeKind::InjectCode(info) => {
                let _ = writeln!(
                    out,
                    "{member_pad}language={} bytes={}",
                    info.language,
                    info.code.len()
                );
            }
            NodeKind::LangType(_) => {}
        }

        for &child in &node.children {
            self.dump_node(child, depth + 1, out);
        }
    }

    fn dump_members(
        &self,
        fields: &[FieldInfo],
        properties: &[PropertyInfo],
        functions: &[FunctionInfo],
        events: &[EventInfo],
        pad: &str,
        out: &mut String,
    ) {
        for field in fields {
            let _ = write!(
                out,
                "{pad}field {}: {} access={}",
                field.name,
                field.type_ref,
                field.access.keyword()
            );
            if field.is_static {
                let _ = write!(out, " static");
            }
            if field.is_constexpr {
                let _ = write!(out, " constexpr");
            }
            if field.is_read_only {
                let _ = write!(out, " readonly");
            }
            if field.no_array {
                let _ = write!(out, " noArray");
            }
            if field.is_hidden {
                let _ = write!(out, " hidden");
            }
            if let Some(default) = &field.default_value {
                let _ = write!(out, " = {default}");
            }
            out.push('\n');
            if let Some(getter) = &field.getter {
                dump_function(getter, &format!("{pad}  getter "), out);
            }
            if let Some(setter) = &field.setter {
                dump_function(setter, &format!("{pad}  setter "), out);
            }
        }
        for property in properties {
            let _ = writeln!(
                out,
                "{pad}property {}: {} access={}",
                property.name,
                property.type_ref,
                property.access.keyword()
            );
            if let Some(getter) = &property.getter {
                dump_function(getter, &format!("{pad}  getter "), out);
            }
            if let Some(setter) = &property.setter {
                dump_function(setter, &format!("{pad}  setter "), out);
            }
        }
        for function in functions {
            dump_function(function, &format!("{pad}function "), out);
        }
        for event in events {
            let signature = event
                .signature
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(
                out,
                "{pad}event {}<{}> static={} access={}",
                event.name,
                signature,
                event.is_static,
                event.access.keyword()
            );
        }
    }
}

fn dump_function(function: &FunctionInfo, prefix: &str, out: &mut String) {
    let params = function
        .parameters
        .iter()
        .map(|p| {
            let mut text = format!("{}: {}", p.name, p.type_ref);
            if !p.flags.is_empty() {
                let _ = write!(text, " [{:?}]", p.flags);
            }
            if let Some(default) = &p.default_value {
                let _ = write!(text, " = {default}");
            }
            text
        })
        .collect::<Vec<_>>()
        .join(", ");
    let _ = write!(
        out,
        "{prefix}{} ({}) -> {} access={}",
        function.unique_name,
        params,
        function.return_type,
        function.access.keyword()
    );
    if function.name != function.unique_name {
        let _ = write!(out, " name={}", function.name);
    }
    if function.is_virtual {
        let _ = write!(out, " virtual");
    }
    if function.is_const {
        let _ = write!(out, " const");
    }
    if function.is_static {
        let _ = write!(out, " static");
    }
    if function.no_proxy {
        let _ = write!(out, " noProxy");
    }
    if function.is_hidden {
        let _ = write!(out, " hidden");
    }
    out.push('\n');
}
