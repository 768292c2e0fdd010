//! Native glue emission, one module per output file.
//!
//! Layout of the generated file: a header comment, the sorted include set,
//! one anonymous namespace holding managed mirrors and per-type `*Internal`
//! helper classes, then file-scope type initializers and auto-serialization
//! bodies. Traversal is depth-first in source order; nothing is reordered,
//! so regenerated files diff stably.

use std::collections::BTreeSet;

use apigen_binder::BuildContext;
use apigen_common::{Error, ErrorKind, Result};
use apigen_model::{
    Access, ClassInfo, EventInfo, FieldInfo, FunctionInfo, InterfaceInfo, NodeIndex, NodeKind,
    ParameterInfo, SerializedKind, StructInfo, TypeRef,
};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::abi::{self, Marshal};
use crate::writer::SourceWriter;

/// Emit the native glue source for one module.
pub fn emit_native_module(build: &mut BuildContext, module: NodeIndex) -> Result<String> {
    NativeGlueEmitter::new(build, module).emit()
}

/// Per-module emission state.
pub struct NativeGlueEmitter<'a> {
    build: &'a mut BuildContext,
    module: NodeIndex,
    includes: BTreeSet<String>,
    /// Managed mirrors and converters, in first-use order.
    mirrors: SourceWriter,
    mirrors_emitted: FxHashSet<NodeIndex>,
    /// Wrapper classes, bridges, trampolines.
    glue: SourceWriter,
    /// Type initializers and serialization bodies, outside the anonymous
    /// namespace.
    trailer: SourceWriter,
}

impl<'a> NativeGlueEmitter<'a> {
    pub fn new(build: &'a mut BuildContext, module: NodeIndex) -> Self {
        NativeGlueEmitter {
            build,
            module,
            includes: BTreeSet::new(),
            mirrors: SourceWriter::new(),
            mirrors_emitted: FxHashSet::default(),
            glue: SourceWriter::new(),
            trailer: SourceWriter::new(),
        }
    }

    pub fn emit(mut self) -> Result<String> {
        let module_name = self.build.arena.get(self.module).name.clone();
        debug!("emitting native glue for module '{module_name}'");

        let files = self.build.arena.get(self.module).children.clone();
        for file in files {
            let types = self.build.arena.get(file).children.clone();
            for index in types {
                self.emit_type(index)?;
            }
        }

        let mut out = SourceWriter::new();
        out.write_line(
            "// This code was auto-generated by the scripting bindings generator. Do not modify it manually.",
        );
        out.blank_line();
        out.write_line(&format!("#include \"{}\"", abi::GLUE_HEADER));
        for include in &self.includes {
            out.write_line(&format!("#include \"{include}\""));
        }
        out.blank_line();
        out.write_line("namespace {");
        out.blank_line();
        if !self.mirrors.is_empty() {
            out.append_raw(&self.mirrors.into_string());
            out.blank_line();
        }
        out.append_raw(&self.glue.into_string());
        out.blank_line();
        out.write_line("} // namespace");
        out.blank_line();
        out.append_raw(&self.trailer.into_string());
        Ok(out.into_string())
    }

    // =========================================================================
    // Type dispatch
    // =========================================================================

    fn emit_type(&mut self, index: NodeIndex) -> Result<()> {
        let kind = self.build.arena.get(index).kind.clone();
        match kind {
            NodeKind::Class(info) => {
                if !info.is_template && !self.is_inbuild(index) {
                    self.emit_class(index, &info)?;
                }
            }
            NodeKind::Struct(info) => {
                if !info.is_template && !self.is_inbuild(index) {
                    self.emit_struct(index, &info)?;
                }
            }
            NodeKind::Interface(info) => {
                self.emit_interface(index, &info)?;
            }
            NodeKind::Typedef(info) => {
                // Only template instantiations get glue; aliases add none.
                if !info.is_alias {
                    self.build.ensure_typedef_resolved(index)?;
                    if let Some(backing) = self.build.typedef_backing(index) {
                        let backing_kind = self.build.arena.get(backing).kind.clone();
                        match backing_kind {
                            NodeKind::Class(info) => self.emit_class(backing, &info)?,
                            NodeKind::Struct(info) => self.emit_struct(backing, &info)?,
                            _ => {}
                        }
                    }
                }
            }
            NodeKind::InjectCode(info) => {
                if info.language.eq_ignore_ascii_case("cpp") {
                    self.glue.append_raw(&info.code);
                    self.glue.blank_line();
                }
            }
            _ => {}
        }

        // Nested types (structs/enums declared inside classes). Template
        // children only exist through instantiations, so they are skipped.
        let node = self.build.arena.get(index);
        let is_template = match &node.kind {
            NodeKind::Class(info) => info.is_template,
            NodeKind::Struct(info) => info.is_template,
            _ => false,
        };
        if !is_template {
            let children = node.children.clone();
            for child in children {
                self.emit_type(child)?;
            }
        }
        Ok(())
    }

    fn is_inbuild(&self, index: NodeIndex) -> bool {
        self.build.arena.get(index).tags.contains_key("inbuild")
    }

    fn include_declaring_header(&mut self, index: NodeIndex) {
        let mut current = Some(index);
        while let Some(node) = current {
            if let NodeKind::File(info) = &self.build.arena.get(node).kind {
                self.includes.insert(info.path.clone());
                return;
            }
            current = self.build.arena.get(node).parent;
        }
    }

    /// Flattened managed name used for generated helper identifiers.
    fn flat_name(&self, index: NodeIndex) -> String {
        abi::mirror_name(self.build, index)
    }

    // =========================================================================
    // Classes
    // =========================================================================

    fn emit_class(&mut self, index: NodeIndex, info: &ClassInfo) -> Result<()> {
        self.include_declaring_header(index);
        let managed_full = self.build.arena.full_name_managed(index);
        let native_full = self.build.arena.full_name_native(index);
        let internal = format!("{}Internal", self.flat_name(index));
        let mut registrations: Vec<String> = Vec::new();

        self.glue.write_line(&format!("class {internal}"));
        self.glue.write_line("{");
        self.glue.write_line("public:");
        self.glue.indent();

        for function in &info.functions {
            if function.is_hidden {
                continue;
            }
            self.emit_function_wrapper(index, &native_full, function)?;
            registrations.push(function.unique_name.clone());
        }
        for property in &info.properties {
            if property.is_hidden() {
                continue;
            }
            for accessor in [&property.getter, &property.setter].into_iter().flatten() {
                self.emit_function_wrapper(index, &native_full, accessor)?;
                registrations.push(accessor.unique_name.clone());
            }
        }
        for field in &info.fields {
            if field.is_hidden || field.no_proxy {
                continue;
            }
            self.emit_field_wrappers(index, &native_full, field, &mut registrations)?;
        }
        for event in &info.events {
            if event.is_hidden {
                continue;
            }
            self.emit_event_bridge(index, &native_full, &managed_full, &internal, event)?;
            registrations.push(format!("{}_Bind", event.name));
            registrations.push(format!("{}_BindGeneric", event.name));
        }

        // Virtual dispatch trampolines fill script-vtable slots.
        let virtuals: Vec<(u32, FunctionInfo)> = info
            .functions
            .iter()
            .filter(|f| f.is_virtual)
            .enumerate()
            .map(|(i, f)| (info.script_vtable_offset + i as u32, f.clone()))
            .collect();
        if !info.is_sealed {
            for (slot, function) in &virtuals {
                self.emit_virtual_trampoline(index, &native_full, &internal, *slot, function)?;
            }
            if !virtuals.is_empty() {
                self.glue.write_line("static void SetupScriptVTable(void** vtable)");
                self.glue.open_block();
                for (slot, function) in &virtuals {
                    self.glue.write_line(&format!(
                        "vtable[{slot}] = (void*)&{internal}::{}_Trampoline;",
                        function.unique_name
                    ));
                }
                self.glue.close_block("");
                self.glue.blank_line();
            }
        }

        // Lifecycle callbacks.
        let spawnable = !info.no_spawn && !info.is_abstract && !info.is_static;
        if spawnable {
            self.glue.write_line(
                "static ScriptingObject* Spawn(const ScriptingObjectSpawnParams& params)",
            );
            self.glue.open_block();
            self.glue.write_line(&format!("return ::New<{native_full}>(params);"));
            self.glue.close_block("");
            self.glue.blank_line();
        }

        self.emit_init_runtime(&managed_full, &internal, &registrations);

        self.glue.unindent();
        self.glue.write_line("};");
        self.glue.blank_line();

        // Interface implementation table.
        let mut interface_table = String::from("nullptr");
        let public_interfaces: Vec<&TypeRef> = info
            .interfaces
            .iter()
            .filter(|i| i.access == Access::Public)
            .map(|i| &i.type_ref)
            .collect();
        if !public_interfaces.is_empty() {
            let table_name = format!("{}InterfaceTable", self.flat_name(index));
            self.trailer.write_line(&format!(
                "static const ScriptingType::InterfaceImplementation {table_name}[] = {{"
            ));
            self.trailer.indent();
            for interface in &public_interfaces {
                let name = &interface.type_name;
                self.trailer.write_line(&format!(
                    "{{ &{name}::TypeInitializer, (int32)((intptr_t)static_cast<{name}*>(({native_full}*)sizeof(void*)) - (intptr_t)sizeof(void*)) }},"
                ));
            }
            self.trailer.write_line("{ nullptr, 0 },");
            self.trailer.unindent();
            self.trailer.write_line("};");
            interface_table = table_name;
        }

        // The static type initializer.
        let base_initializer = self.base_initializer(info);
        let spawn = if spawnable {
            format!("&{internal}::Spawn")
        } else {
            "nullptr".to_string()
        };
        let vtable_setup = if !info.is_sealed && !virtuals.is_empty() {
            format!("&{internal}::SetupScriptVTable")
        } else {
            "nullptr".to_string()
        };
        self.trailer.write_line(&format!(
            "ScriptingTypeInitializer {native_full}::TypeInitializer(\"{managed_full}\", sizeof({native_full}), &{internal}::InitRuntime, {spawn}, {base_initializer}, {vtable_setup}, {interface_table});"
        ));
        self.trailer.blank_line();

        if info.is_auto_serialization {
            self.emit_serialization(&native_full, &info.serialization);
        }
        Ok(())
    }

    fn base_initializer(&self, info: &ClassInfo) -> String {
        if info.is_base_type_hidden && !info.is_scripting_object {
            return "nullptr".to_string();
        }
        // Roots like ScriptingObject live outside the parsed set but still
        // carry an initializer.
        match &info.base {
            Some(base) => format!("&{}::TypeInitializer", base.type_name),
            None => "nullptr".to_string(),
        }
    }

    fn emit_init_runtime(&mut self, managed_full: &str, internal: &str, registrations: &[String]) {
        self.glue.write_line("static void InitRuntime()");
        self.glue.open_block();
        for wrapper in registrations {
            self.glue.write_line(&format!(
                "ADD_INTERNAL_CALL(\"{managed_full}::Internal_{wrapper}\", &{internal}::{wrapper});"
            ));
        }
        self.glue.close_block("");
    }

    // =========================================================================
    // Structs
    // =========================================================================

    fn emit_struct(&mut self, index: NodeIndex, info: &StructInfo) -> Result<()> {
        self.include_declaring_header(index);
        let managed_full = self.build.arena.full_name_managed(index);
        let native_full = self.build.arena.full_name_native(index);
        let internal = format!("{}Internal", self.flat_name(index));

        if info.is_pod == Some(false) {
            self.ensure_mirror(index)?;
        }

        let mut registrations: Vec<String> = Vec::new();
        self.glue.write_line(&format!("class {internal}"));
        self.glue.write_line("{");
        self.glue.write_line("public:");
        self.glue.indent();

        for function in &info.functions {
            if function.is_hidden {
                continue;
            }
            self.emit_function_wrapper(index, &native_full, function)?;
            registrations.push(function.unique_name.clone());
        }

        self.emit_init_runtime(&managed_full, &internal, &registrations);
        self.glue.unindent();
        self.glue.write_line("};");
        self.glue.blank_line();

        self.trailer.write_line(&format!(
            "ScriptingTypeInitializer {native_full}::TypeInitializer(\"{managed_full}\", sizeof({native_full}), &{internal}::InitRuntime);"
        ));
        self.trailer.blank_line();

        if info.is_auto_serialization {
            self.emit_serialization(&native_full, &info.serialization);
        }
        Ok(())
    }

    // =========================================================================
    // Interfaces
    // =========================================================================

    fn emit_interface(&mut self, index: NodeIndex, info: &InterfaceInfo) -> Result<()> {
        self.include_declaring_header(index);
        let managed_full = self.build.arena.full_name_managed(index);
        let native_full = self.build.arena.full_name_native(index);
        let internal = format!("{}Internal", self.flat_name(index));

        let mut registrations: Vec<String> = Vec::new();
        self.glue.write_line(&format!("class {internal}"));
        self.glue.write_line("{");
        self.glue.write_line("public:");
        self.glue.indent();

        for function in &info.functions {
            if function.is_hidden {
                continue;
            }
            self.emit_function_wrapper(index, &native_full, function)?;
            registrations.push(function.unique_name.clone());
        }
        for field in &info.fields {
            if field.is_hidden || field.no_proxy {
                continue;
            }
            self.emit_field_wrappers(index, &native_full, field, &mut registrations)?;
        }

        self.emit_init_runtime(&managed_full, &internal, &registrations);
        self.glue.unindent();
        self.glue.write_line("};");
        self.glue.blank_line();

        self.trailer.write_line(&format!(
            "ScriptingTypeInitializer {native_full}::TypeInitializer(\"{managed_full}\", sizeof({native_full}), &{internal}::InitRuntime);"
        ));
        self.trailer.blank_line();
        Ok(())
    }

    // =========================================================================
    // Method wrappers
    // =========================================================================

    fn emit_function_wrapper(
        &mut self,
        scope: NodeIndex,
        native_full: &str,
        function: &FunctionInfo,
    ) -> Result<()> {
        let return_marshal = if function.return_type.is_void() {
            None
        } else {
            Some(abi::classify(self.build, &function.return_type, scope))
        };
        let return_by_pointer = return_marshal.is_some_and(Marshal::returns_by_pointer);

        // Signature.
        let mut params: Vec<String> = Vec::new();
        if !function.is_static {
            params.push(format!("{native_full}* __obj"));
        }
        let mut conversions: Vec<ParamPlan> = Vec::new();
        for parameter in &function.parameters {
            let plan = self.plan_parameter(scope, parameter)?;
            params.push(format!("{} {}", plan.wire_type, parameter.name));
            conversions.push(plan);
        }
        if return_by_pointer {
            let marshal = return_marshal.expect("checked above");
            let wire = abi::wire_type(self.build, marshal, &function.return_type);
            params.push(format!("{wire} __resultAsRef"));
        }

        let wire_return = match (&return_marshal, return_by_pointer) {
            (None, _) | (_, true) => "void".to_string(),
            (Some(marshal), false) => {
                abi::wire_type(self.build, *marshal, &function.return_type)
            }
        };

        self.glue.write_line(&format!(
            "static {wire_return} {}({})",
            function.unique_name,
            params.join(", ")
        ));
        self.glue.open_block();

        // Null-object guard for instance calls.
        if !function.is_static {
            match (&return_marshal, return_by_pointer) {
                (Some(marshal), false) => {
                    let default = abi::default_return_value(*marshal, &function.return_type);
                    self.glue
                        .write_line(&format!("INTERNAL_CALL_CHECK_RETURN(__obj, {default});"));
                }
                _ => self.glue.write_line("INTERNAL_CALL_CHECK(__obj);"),
            }
        }

        // Out-parameter temporaries.
        for plan in &conversions {
            if let Some(temp) = &plan.out_temp_decl {
                self.glue.write_line(temp);
            }
        }

        // The native call.
        let args: Vec<String> = conversions.iter().map(|p| p.call_arg.clone()).collect();
        let callee = if function.is_static {
            format!("{native_full}::{}", function.name)
        } else {
            format!("__obj->{}", function.name)
        };
        let call = format!("{callee}({})", args.join(", "));

        let has_out_write_back = conversions.iter().any(|p| p.out_write_back.is_some());
        match (&return_marshal, return_by_pointer) {
            (None, _) => self.glue.write_line(&format!("{call};")),
            (Some(marshal), true) => {
                let converted = self.convert_to_wire(*marshal, &function.return_type, &call);
                self.glue.write_line(&format!("*__resultAsRef = {converted};"));
            }
            (Some(marshal), false) => {
                let converted = self.convert_to_wire(*marshal, &function.return_type, &call);
                if has_out_write_back {
                    self.glue.write_line(&format!("auto __result = {converted};"));
                } else {
                    self.glue.write_line(&format!("return {converted};"));
                }
            }
        }

        // Write back converted out-parameters after the call.
        for plan in &conversions {
            if let Some(write_back) = &plan.out_write_back {
                self.glue.write_line(write_back);
            }
        }
        if has_out_write_back && return_marshal.is_some() && !return_by_pointer {
            self.glue.write_line("return __result;");
        }

        self.glue.close_block("");
        self.glue.blank_line();
        Ok(())
    }

    /// Decide wire type, call argument, and out-parameter handling for one
    /// parameter.
    fn plan_parameter(&mut self, scope: NodeIndex, parameter: &ParameterInfo) -> Result<ParamPlan> {
        let marshal = abi::classify(self.build, &parameter.type_ref, scope);
        let name = &parameter.name;
        let is_out = parameter.flags.is_by_ref_out();

        if is_out {
            if marshal == Marshal::HashSet {
                return Err(Error::new(
                    ErrorKind::Semantic,
                    format!("output parameter '{name}' of type HashSet is not supported"),
                ));
            }
            return Ok(self.plan_out_parameter(marshal, parameter));
        }

        let wire = abi::wire_type(self.build, marshal, &parameter.type_ref);
        let call_arg = match marshal {
            Marshal::Direct | Marshal::ScriptingObject => name.clone(),
            Marshal::String => format!("MUtils::ToNativeString({name})"),
            Marshal::Array => {
                let element = element_spelling(&parameter.type_ref, 0);
                format!("MUtils::ToNativeArray<{element}>({name})")
            }
            Marshal::Dictionary => {
                let key = element_spelling(&parameter.type_ref, 0);
                let value = element_spelling(&parameter.type_ref, 1);
                format!("MUtils::ToNativeDictionary<{key}, {value}>({name})")
            }
            Marshal::HashSet => {
                let element = element_spelling(&parameter.type_ref, 0);
                format!("MUtils::ToNativeHashSet<{element}>({name})")
            }
            Marshal::Variant => format!("MUtils::UnboxVariant({name})"),
            Marshal::ObjectHandle => {
                if parameter.type_ref.is_object_reference() {
                    let target = element_spelling(&parameter.type_ref, 0);
                    format!("({target}*)ScriptingObject::ToNative({name})")
                } else {
                    format!("MUtils::ToNativeDelegate({name})")
                }
            }
            Marshal::PodStruct(_) => format!("*{name}"),
            Marshal::NonPodStruct(index) => {
                self.ensure_mirror(index)?;
                format!("{}ToNative(*{name})", self.flat_name(index))
            }
        };
        Ok(ParamPlan {
            wire_type: wire,
            call_arg,
            out_temp_decl: None,
            out_write_back: None,
        })
    }

    fn plan_out_parameter(&mut self, marshal: Marshal, parameter: &ParameterInfo) -> ParamPlan {
        let name = &parameter.name;
        match marshal {
            // POD layouts are written through directly.
            Marshal::PodStruct(_) => ParamPlan {
                wire_type: abi::wire_type(self.build, marshal, &parameter.type_ref),
                call_arg: format!("*{name}"),
                out_temp_decl: None,
                out_write_back: None,
            },
            Marshal::Direct => ParamPlan {
                wire_type: format!("{}*", abi::native_spelling(&parameter.type_ref)),
                call_arg: format!("*{name}"),
                out_temp_decl: None,
                out_write_back: None,
            },
            Marshal::ScriptingObject => {
                let wire = abi::wire_type(self.build, marshal, &parameter.type_ref);
                ParamPlan {
                    wire_type: format!("{wire}*"),
                    out_temp_decl: Some(format!("{wire} __{name} = nullptr;")),
                    call_arg: format!("__{name}"),
                    out_write_back: Some(format!("*{name} = __{name};")),
                }
            }
            Marshal::String => ParamPlan {
                wire_type: "MonoString**".to_string(),
                out_temp_decl: Some(format!("String __{name};")),
                call_arg: format!("__{name}"),
                out_write_back: Some(format!("*{name} = MUtils::ToManagedString(__{name});")),
            },
            Marshal::Array => {
                let element = element_spelling(&parameter.type_ref, 0);
                ParamPlan {
                    wire_type: "MonoArray**".to_string(),
                    out_temp_decl: Some(format!("Array<{element}> __{name};")),
                    call_arg: format!("__{name}"),
                    out_write_back: Some(format!(
                        "*{name} = MUtils::ToManagedArray<{element}>(__{name});"
                    )),
                }
            }
            Marshal::Dictionary => {
                let key = element_spelling(&parameter.type_ref, 0);
                let value = element_spelling(&parameter.type_ref, 1);
                ParamPlan {
                    wire_type: "MonoObject**".to_string(),
                    out_temp_decl: Some(format!("Dictionary<{key}, {value}> __{name};")),
                    call_arg: format!("__{name}"),
                    out_write_back: Some(format!(
                        "*{name} = MUtils::ToManagedDictionary<{key}, {value}>(__{name});"
                    )),
                }
            }
            Marshal::Variant => ParamPlan {
                wire_type: "MonoObject**".to_string(),
                out_temp_decl: Some(format!("Variant __{name};")),
                call_arg: format!("__{name}"),
                out_write_back: Some(format!("*{name} = MUtils::BoxVariant(__{name});")),
            },
            Marshal::NonPodStruct(index) => {
                // Mirror emission cannot fail once classification resolved
                // the struct.
                let _ = self.ensure_mirror(index);
                let flat = self.flat_name(index);
                let native = self.build.arena.get(index).native_name().to_string();
                ParamPlan {
                    wire_type: format!("{flat}Managed*"),
                    out_temp_decl: Some(format!("{native} __{name};")),
                    call_arg: format!("__{name}"),
                    out_write_back: Some(format!("*{name} = {flat}ToManaged(__{name});")),
                }
            }
            // Rejected before this point.
            Marshal::HashSet | Marshal::ObjectHandle => ParamPlan {
                wire_type: "MonoObject**".to_string(),
                call_arg: name.clone(),
                out_temp_decl: None,
                out_write_back: None,
            },
        }
    }

    /// Expression converting a native value to its wire form.
    fn convert_to_wire(&mut self, marshal: Marshal, type_ref: &TypeRef, value: &str) -> String {
        match marshal {
            Marshal::Direct | Marshal::ScriptingObject => value.to_string(),
            Marshal::String => format!("MUtils::ToManagedString({value})"),
            Marshal::Array => {
                let element = element_spelling(type_ref, 0);
                format!("MUtils::ToManagedArray<{element}>({value})")
            }
            Marshal::Dictionary => {
                let key = element_spelling(type_ref, 0);
                let val = element_spelling(type_ref, 1);
                format!("MUtils::ToManagedDictionary<{key}, {val}>({value})")
            }
            Marshal::HashSet => {
                let element = element_spelling(type_ref, 0);
                format!("MUtils::ToManagedHashSet<{element}>({value})")
            }
            Marshal::Variant => format!("MUtils::BoxVariant({value})"),
            Marshal::ObjectHandle => {
                format!("ScriptingObject::ToManaged((ScriptingObject*){value}.Get())")
            }
            Marshal::PodStruct(_) => value.to_string(),
            Marshal::NonPodStruct(index) => {
                let _ = self.ensure_mirror(index);
                format!("{}ToManaged({value})", self.flat_name(index))
            }
        }
    }

    // =========================================================================
    // Field wrappers
    // =========================================================================

    fn emit_field_wrappers(
        &mut self,
        scope: NodeIndex,
        native_full: &str,
        field: &FieldInfo,
        registrations: &mut Vec<String>,
    ) -> Result<()> {
        let access_expr = if field.is_static {
            format!("{native_full}::{}", field.name)
        } else {
            format!("__obj->{}", field.name)
        };
        let obj_param = if field.is_static {
            String::new()
        } else {
            format!("{native_full}* __obj")
        };

        if let Some(getter) = &field.getter {
            if field.type_ref.is_array && !field.no_array {
                // Fixed-size native buffer exposed as a managed array.
                let element = abi::native_spelling(&TypeRef {
                    is_array: false,
                    array_size: None,
                    ..field.type_ref.clone()
                });
                let extent = field.type_ref.array_size.as_deref().unwrap_or("0");
                self.glue.write_line(&format!(
                    "static MonoArray* {}({obj_param})",
                    getter.unique_name
                ));
                self.glue.open_block();
                if !field.is_static {
                    self.glue
                        .write_line("INTERNAL_CALL_CHECK_RETURN(__obj, nullptr);");
                }
                self.glue.write_line(&format!(
                    "return MUtils::ToManagedArray<{element}>(Span<{element}>({access_expr}, {extent}));"
                ));
                self.glue.close_block("");
                self.glue.blank_line();
            } else {
                let marshal = abi::classify(self.build, &field.type_ref, scope);
                let wire = abi::wire_type(self.build, marshal, &field.type_ref);
                let sep = if obj_param.is_empty() { "" } else { ", " };
                if marshal.returns_by_pointer() {
                    // By-reference values arrive through a trailing
                    // out-pointer, same as function wrappers.
                    self.glue.write_line(&format!(
                        "static void {}({obj_param}{sep}{wire} __resultAsRef)",
                        getter.unique_name
                    ));
                    self.glue.open_block();
                    if !field.is_static {
                        self.glue.write_line("INTERNAL_CALL_CHECK(__obj);");
                    }
                    let converted = self.convert_to_wire(marshal, &field.type_ref, &access_expr);
                    self.glue
                        .write_line(&format!("*__resultAsRef = {converted};"));
                    self.glue.close_block("");
                    self.glue.blank_line();
                } else {
                    self.glue.write_line(&format!(
                        "static {wire} {}({obj_param})",
                        getter.unique_name
                    ));
                    self.glue.open_block();
                    if !field.is_static {
                        let default = abi::default_return_value(marshal, &field.type_ref);
                        self.glue
                            .write_line(&format!("INTERNAL_CALL_CHECK_RETURN(__obj, {default});"));
                    }
                    let converted = self.convert_to_wire(marshal, &field.type_ref, &access_expr);
                    self.glue.write_line(&format!("return {converted};"));
                    self.glue.close_block("");
                    self.glue.blank_line();
                }
            }
            registrations.push(getter.unique_name.clone());
        }

        self.emit_field_setter(scope, field, &access_expr, &obj_param, registrations)
    }

    fn emit_field_setter(
        &mut self,
        scope: NodeIndex,
        field: &FieldInfo,
        access_expr: &str,
        obj_param: &str,
        registrations: &mut Vec<String>,
    ) -> Result<()> {
        let Some(setter) = &field.setter else {
            return Ok(());
        };
        let plan = self.plan_parameter(
            scope,
            &ParameterInfo::new("value", field.type_ref.clone()),
        )?;
        let sep = if obj_param.is_empty() { "" } else { ", " };
        self.glue.write_line(&format!(
            "static void {}({obj_param}{sep}{} value)",
            setter.unique_name, plan.wire_type
        ));
        self.glue.open_block();
        if !field.is_static {
            self.glue.write_line("INTERNAL_CALL_CHECK(__obj);");
        }
        self.glue
            .write_line(&format!("{access_expr} = {};", plan.call_arg));
        self.glue.close_block("");
        self.glue.blank_line();
        registrations.push(setter.unique_name.clone());
        Ok(())
    }

    // =========================================================================
    // Events
    // =========================================================================

    fn emit_event_bridge(
        &mut self,
        scope: NodeIndex,
        native_full: &str,
        managed_full: &str,
        internal: &str,
        event: &EventInfo,
    ) -> Result<()> {
        let name = &event.name;
        let arg_count = event.signature.len();

        // Invoker: marshals the native argument list into the managed
        // runtime.
        let params: Vec<String> = event
            .signature
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{} arg{i}", abi::native_spelling(t)))
            .collect();
        self.glue
            .write_line(&format!("static void {name}_Invoke({})", params.join(", ")));
        self.glue.open_block();
        if arg_count > 0 {
            self.glue
                .write_line(&format!("MObject* params[{arg_count}];"));
            for (i, type_ref) in event.signature.iter().enumerate() {
                let marshal = abi::classify(self.build, type_ref, scope);
                let boxed = self.box_value(marshal, type_ref, &format!("arg{i}"));
                self.glue.write_line(&format!("params[{i}] = {boxed};"));
            }
            self.glue.write_line(&format!(
                "ScriptingEvents::Invoke(\"{managed_full}\", \"{name}\", params, {arg_count});"
            ));
        } else {
            self.glue.write_line(&format!(
                "ScriptingEvents::Invoke(\"{managed_full}\", \"{name}\", nullptr, 0);"
            ));
        }
        self.glue.close_block("");
        self.glue.blank_line();

        // Bind/unbind pair attaching the invoker to the native delegate.
        let event_expr = if event.is_static {
            format!("{native_full}::{name}")
        } else {
            format!("__obj->{name}")
        };
        let obj_param = if event.is_static {
            "bool bind".to_string()
        } else {
            format!("{native_full}* __obj, bool bind")
        };
        self.glue
            .write_line(&format!("static void {name}_Bind({obj_param})"));
        self.glue.open_block();
        if !event.is_static {
            self.glue.write_line("INTERNAL_CALL_CHECK(__obj);");
        }
        self.glue.write_line("if (bind)");
        self.glue.indent();
        self.glue
            .write_line(&format!("{event_expr}.Bind<&{internal}::{name}_Invoke>();"));
        self.glue.unindent();
        self.glue.write_line("else");
        self.glue.indent();
        self.glue
            .write_line(&format!("{event_expr}.Unbind<&{internal}::{name}_Invoke>();"));
        self.glue.unindent();
        self.glue.close_block("");
        self.glue.blank_line();

        // Parallel generic scripting-event pair.
        let generic_target = if event.is_static {
            "nullptr".to_string()
        } else {
            "__obj".to_string()
        };
        self.glue
            .write_line(&format!("static void {name}_BindGeneric({obj_param})"));
        self.glue.open_block();
        if !event.is_static {
            self.glue.write_line("INTERNAL_CALL_CHECK(__obj);");
        }
        self.glue.write_line(&format!(
            "ScriptingEvents::Bind({generic_target}, \"{managed_full}\", \"{name}\", bind);"
        ));
        self.glue.close_block("");
        self.glue.blank_line();
        Ok(())
    }

    /// Expression boxing a native value into an `MObject*`.
    fn box_value(&mut self, marshal: Marshal, type_ref: &TypeRef, value: &str) -> String {
        match marshal {
            Marshal::String => format!("(MObject*)MUtils::ToManagedString({value})"),
            Marshal::Array => {
                let element = element_spelling(type_ref, 0);
                format!("(MObject*)MUtils::ToManagedArray<{element}>({value})")
            }
            Marshal::ScriptingObject => {
                format!("(MObject*)ScriptingObject::ToManaged((ScriptingObject*){value})")
            }
            Marshal::Variant => format!("MUtils::BoxVariant({value})"),
            Marshal::NonPodStruct(index) => {
                let _ = self.ensure_mirror(index);
                format!("{}Box({value})", self.flat_name(index))
            }
            Marshal::PodStruct(index) => {
                let managed = self.build.arena.full_name_managed(index);
                format!("MUtils::Box(&{value}, \"{managed}\")")
            }
            _ => {
                let spelling = abi::native_spelling(type_ref);
                format!("MUtils::Box(&{value}, \"{spelling}\")")
            }
        }
    }

    // =========================================================================
    // Virtual dispatch
    // =========================================================================

    fn emit_virtual_trampoline(
        &mut self,
        scope: NodeIndex,
        native_full: &str,
        _internal: &str,
        slot: u32,
        function: &FunctionInfo,
    ) -> Result<()> {
        let name = &function.unique_name;
        let returns = !function.return_type.is_void();
        let ret_spelling = abi::native_spelling(&function.return_type);

        let mut params = vec![format!("{native_full}* __obj")];
        for parameter in &function.parameters {
            params.push(format!(
                "{} {}",
                abi::native_spelling(&parameter.type_ref),
                parameter.name
            ));
        }
        let wire_return = if returns {
            ret_spelling.clone()
        } else {
            "void".to_string()
        };
        self.glue.write_line(&format!(
            "static {wire_return} {name}_Trampoline({})",
            params.join(", ")
        ));
        self.glue.open_block();

        // Re-entrancy guard: an override calling back into the native
        // implementation must not bounce into the managed override again.
        self.glue
            .write_line("static THREADLOCAL bool __reentrant = false;");
        self.glue.write_line("if (!__reentrant)");
        self.glue.open_block();
        self.glue.write_line(
            "auto __managed = ScriptingObject::ToManaged((ScriptingObject*)__obj);",
        );
        self.glue.write_line(&format!(
            "auto __method = ScriptingObject::GetScriptVTable(__managed, {slot});"
        ));
        self.glue.write_line("if (__method)");
        self.glue.open_block();
        self.glue.write_line("__reentrant = true;");
        let arg_count = function.parameters.len();
        if arg_count > 0 {
            self.glue
                .write_line(&format!("MObject* __params[{arg_count}];"));
            for (i, parameter) in function.parameters.iter().enumerate() {
                let marshal = abi::classify(self.build, &parameter.type_ref, scope);
                let boxed = self.box_value(marshal, &parameter.type_ref, &parameter.name);
                self.glue.write_line(&format!("__params[{i}] = {boxed};"));
            }
        }
        let params_arg = if arg_count > 0 { "__params" } else { "nullptr" };
        if returns {
            self.glue.write_line(&format!(
                "MObject* __result = MCore::Invoke(__method, __managed, {params_arg});"
            ));
            self.glue.write_line("__reentrant = false;");
            self.glue.write_line(&format!(
                "return MUtils::Unbox<{ret_spelling}>(__result);"
            ));
        } else {
            self.glue.write_line(&format!(
                "MCore::Invoke(__method, __managed, {params_arg});"
            ));
            self.glue.write_line("__reentrant = false;");
            self.glue.write_line("return;");
        }
        self.glue.close_block("");
        self.glue.close_block("");

        // Fall back to the native implementation.
        let args: Vec<String> = function
            .parameters
            .iter()
            .map(|p| p.name.clone())
            .collect();
        let call = format!(
            "__obj->{native_full}::{}({})",
            function.name,
            args.join(", ")
        );
        if returns {
            self.glue.write_line(&format!("return {call};"));
        } else {
            self.glue.write_line(&format!("{call};"));
        }
        self.glue.close_block("");
        self.glue.blank_line();
        Ok(())
    }

    // =========================================================================
    // Non-POD conversion helpers
    // =========================================================================

    /// Emit the managed mirror, converters, and boxing adapter for a
    /// non-POD struct, once.
    fn ensure_mirror(&mut self, index: NodeIndex) -> Result<()> {
        if !self.mirrors_emitted.insert(index) {
            return Ok(());
        }
        self.include_declaring_header(index);

        let node = self.build.arena.get(index);
        let native = node.native_name().to_string();
        let managed_full = self.build.arena.full_name_managed(index);
        let flat = self.flat_name(index);
        let fields: Vec<FieldInfo> = match &self.build.arena.get(index).kind {
            NodeKind::Struct(info) => info
                .fields
                .iter()
                .filter(|f| !f.is_static && !f.is_hidden)
                .cloned()
                .collect(),
            _ => Vec::new(),
        };

        // Mirror layout.
        self.mirrors.write_line(&format!("struct {flat}Managed"));
        self.mirrors.write_line("{");
        self.mirrors.indent();
        let mut plans: Vec<(FieldInfo, Marshal)> = Vec::new();
        for field in fields {
            let marshal = abi::classify(self.build, &field.type_ref, index);
            if let Marshal::NonPodStruct(nested) = marshal {
                self.ensure_mirror(nested)?;
            }
            let mirror_type = match marshal {
                Marshal::NonPodStruct(nested) => format!("{}Managed", self.flat_name(nested)),
                other => abi::wire_type(self.build, other, &field.type_ref),
            };
            // POD structs embed by value in the mirror, not by pointer.
            let mirror_type = match marshal {
                Marshal::PodStruct(_) => abi::native_spelling(&field.type_ref),
                _ => mirror_type,
            };
            self.mirrors
                .write_line(&format!("{mirror_type} {};", field.name));
            plans.push((field, marshal));
        }
        self.mirrors.unindent();
        self.mirrors.write_line("};");
        self.mirrors.blank_line();

        // Native -> managed converter.
        self.mirrors.write_line(&format!(
            "{flat}Managed {flat}ToManaged(const {native}& value)"
        ));
        self.mirrors.open_block();
        self.mirrors.write_line(&format!("{flat}Managed result;"));
        for (field, marshal) in &plans {
            let name = &field.name;
            let expr = match marshal {
                Marshal::Direct | Marshal::PodStruct(_) => format!("value.{name}"),
                Marshal::ScriptingObject => {
                    format!("(MObject*)ScriptingObject::ToManaged((ScriptingObject*)value.{name})")
                }
                Marshal::NonPodStruct(nested) => {
                    format!("{}ToManaged(value.{name})", self.flat_name(*nested))
                }
                other => {
                    let converted =
                        self.convert_to_wire(*other, &field.type_ref, &format!("value.{name}"));
                    converted
                }
            };
            self.mirrors.write_line(&format!("result.{name} = {expr};"));
        }
        self.mirrors.write_line("return result;");
        self.mirrors.close_block("");
        self.mirrors.blank_line();

        // Managed -> native converter.
        self.mirrors.write_line(&format!(
            "{native} {flat}ToNative(const {flat}Managed& value)"
        ));
        self.mirrors.open_block();
        self.mirrors.write_line(&format!("{native} result;"));
        for (field, marshal) in &plans {
            let name = &field.name;
            let expr = match marshal {
                Marshal::Direct | Marshal::PodStruct(_) => format!("value.{name}"),
                Marshal::String => format!("MUtils::ToNativeString(value.{name})"),
                Marshal::Array => {
                    let element = element_spelling(&field.type_ref, 0);
                    format!("MUtils::ToNativeArray<{element}>(value.{name})")
                }
                Marshal::Dictionary => {
                    let key = element_spelling(&field.type_ref, 0);
                    let val = element_spelling(&field.type_ref, 1);
                    format!("MUtils::ToNativeDictionary<{key}, {val}>(value.{name})")
                }
                Marshal::HashSet => {
                    let element = element_spelling(&field.type_ref, 0);
                    format!("MUtils::ToNativeHashSet<{element}>(value.{name})")
                }
                Marshal::Variant => format!("MUtils::UnboxVariant(value.{name})"),
                Marshal::ScriptingObject => {
                    let target = field.type_ref.type_name.clone();
                    format!("({target}*)ScriptingObject::ToNative(value.{name})")
                }
                Marshal::ObjectHandle => {
                    format!("MUtils::ToNativeDelegate(value.{name})")
                }
                Marshal::NonPodStruct(nested) => {
                    format!("{}ToNative(value.{name})", self.flat_name(*nested))
                }
            };
            self.mirrors.write_line(&format!("result.{name} = {expr};"));
        }
        self.mirrors.write_line("return result;");
        self.mirrors.close_block("");
        self.mirrors.blank_line();

        // Boxing adapter.
        self.mirrors
            .write_line(&format!("MObject* {flat}Box(const {native}& value)"));
        self.mirrors.open_block();
        self.mirrors
            .write_line(&format!("auto managed = {flat}ToManaged(value);"));
        self.mirrors.write_line(&format!(
            "return MUtils::Box(&managed, \"{managed_full}\");"
        ));
        self.mirrors.close_block("");
        self.mirrors.blank_line();
        Ok(())
    }

    // =========================================================================
    // Auto-serialization
    // =========================================================================

    fn emit_serialization(
        &mut self,
        native_full: &str,
        members: &[apigen_model::SerializedMember],
    ) {
        self.trailer.write_line(&format!(
            "void {native_full}::Serialize(SerializeStream& stream, const void* otherObj)"
        ));
        self.trailer.open_block();
        self.trailer
            .write_line(&format!("SERIALIZE_GET_OTHER_OBJ({native_full});"));
        for member in members {
            match member.kind {
                SerializedKind::Field => {
                    self.trailer
                        .write_line(&format!("SERIALIZE({});", member.name));
                }
                SerializedKind::Property => {
                    self.trailer
                        .write_line(&format!("SERIALIZE_PROPERTY({});", member.name));
                }
            }
        }
        self.trailer.close_block("");
        self.trailer.blank_line();

        self.trailer.write_line(&format!(
            "void {native_full}::Deserialize(DeserializeStream& stream, ISerializeModifier* modifier)"
        ));
        self.trailer.open_block();
        for member in members {
            match member.kind {
                SerializedKind::Field => {
                    self.trailer
                        .write_line(&format!("DESERIALIZE({});", member.name));
                }
                SerializedKind::Property => {
                    self.trailer
                        .write_line(&format!("DESERIALIZE_PROPERTY({});", member.name));
                }
            }
        }
        self.trailer.close_block("");
        self.trailer.blank_line();
    }
}

/// One parameter's wire plan.
struct ParamPlan {
    wire_type: String,
    call_arg: String,
    out_temp_decl: Option<String>,
    out_write_back: Option<String>,
}

/// Spelling of the nth generic argument, for container conversions.
fn element_spelling(type_ref: &TypeRef, index: usize) -> String {
    type_ref
        .generic_args
        .get(index)
        .map(abi::native_spelling)
        .unwrap_or_else(|| "byte".to_string())
}
