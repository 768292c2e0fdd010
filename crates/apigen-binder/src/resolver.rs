//! The build context and type resolver.
//!
//! Lookup order for a `TypeRef`:
//! 1. In-build primitives (under a hidden in-build module).
//! 2. Scoped ascent: the caller's ancestor chain, scanning each ancestor's
//!    child lists recursively.
//! 3. Global scan across every module in the build.
//! 4. Nested-name resolution for spellings containing `::`.
//!
//! When generic arguments are present, a typedef that instantiates the
//! template is preferred over the template itself; typedef specialization
//! clones and substitutes lazily, guarded by an in-progress set. A failed
//! lookup of a by-reference type is retried without the reference flag.
//! Positive results are memoized by spelling.

use apigen_common::{Error, ErrorKind, Result};
use apigen_model::{
    ApiArena, LangTypeInfo, ModuleInfo, Node, NodeIndex, NodeKind, TypeRef,
};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::inbuild;

/// Build-wide model state: the arena, module roots, and the resolver cache.
pub struct BuildContext {
    pub arena: ApiArena,
    /// Module roots, in build order.
    pub modules: Vec<NodeIndex>,
    /// Hidden module owning the in-build `LangType` nodes.
    inbuild_module: NodeIndex,
    /// Memoized positive lookups, keyed by spelling.
    type_cache: FxHashMap<String, NodeIndex>,
    /// Typedefs currently being inflated (recursion guard).
    inflating: FxHashSet<NodeIndex>,
}

impl Default for BuildContext {
    fn default() -> Self {
        BuildContext::new()
    }
}

impl BuildContext {
    pub fn new() -> Self {
        let mut arena = ApiArena::new();
        let inbuild_module = arena.alloc(Node::new(
            "$InBuild",
            NodeKind::Module(ModuleInfo::default()),
        ));
        for name in inbuild::PRIMITIVES {
            let node = Node::new(*name, NodeKind::LangType(LangTypeInfo));
            let index = arena.alloc(node);
            arena.add_child(inbuild_module, index);
        }
        let pointer = arena.alloc(Node::new(
            inbuild::POINTER_PRIMITIVE,
            NodeKind::LangType(LangTypeInfo),
        ));
        arena.add_child(inbuild_module, pointer);

        BuildContext {
            arena,
            modules: Vec::new(),
            inbuild_module,
            type_cache: FxHashMap::default(),
            inflating: FxHashSet::default(),
        }
    }

    /// Register a module root.
    pub fn add_module(&mut self, module: NodeIndex) {
        debug_assert!(matches!(
            self.arena.get(module).kind,
            NodeKind::Module(_)
        ));
        self.modules.push(module);
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve a type reference from a calling scope. Returns the matching
    /// node, or `None` when nothing in the build exports that name.
    pub fn resolve(&mut self, type_ref: &TypeRef, scope: NodeIndex) -> Option<NodeIndex> {
        if type_ref.type_name.is_empty() {
            return None;
        }

        let key = type_ref.to_string();
        if let Some(&hit) = self.type_cache.get(&key) {
            return Some(hit);
        }

        let found = self.resolve_uncached(type_ref, scope).or_else(|| {
            // Reference-removal retry.
            if type_ref.is_ref {
                self.resolve(&type_ref.without_ref(), scope)
            } else {
                None
            }
        });

        if let Some(index) = found {
            // Insert-on-miss; idempotent by construction.
            self.type_cache.insert(key, index);
        }
        found
    }

    fn resolve_uncached(&mut self, type_ref: &TypeRef, scope: NodeIndex) -> Option<NodeIndex> {
        // In-build primitives.
        if type_ref.is_void_ptr() {
            return self.arena.find_child(self.inbuild_module, inbuild::POINTER_PRIMITIVE);
        }
        if inbuild::is_primitive(&type_ref.type_name) {
            return self.arena.find_child(self.inbuild_module, &type_ref.type_name);
        }

        // Nested-name spellings resolve segment by segment.
        if type_ref.type_name.contains("::") {
            return self.resolve_nested(type_ref, scope);
        }

        // A typedef that instantiates the template wins over the template.
        if !type_ref.generic_args.is_empty() {
            if let Some(typedef) = self.find_instantiating_typedef(type_ref) {
                return Some(typedef);
            }
        }

        let name = type_ref.type_name.as_str();

        // Scoped ascent: the caller's own container first, then up.
        let mut current = Some(scope);
        while let Some(node) = current {
            if let Some(found) = self.arena.find_type(node, name) {
                return Some(found);
            }
            current = self.arena.get(node).parent;
        }

        // Global scan across all modules.
        for module in self.modules.clone() {
            if let Some(found) = self.arena.find_type(module, name) {
                return Some(found);
            }
        }
        None
    }

    fn resolve_nested(&mut self, type_ref: &TypeRef, scope: NodeIndex) -> Option<NodeIndex> {
        let mut segments = type_ref.type_name.split("::");
        let first = segments.next()?;
        let mut current = self.resolve(&TypeRef::named(first), scope)?;
        for segment in segments {
            current = self.arena.find_type(current, segment)?;
        }
        Some(current)
    }

    /// Scan every module for a typedef whose target instantiates the given
    /// template reference (`typedef Vector3Base<float> Float3`).
    fn find_instantiating_typedef(&mut self, type_ref: &TypeRef) -> Option<NodeIndex> {
        let mut found = None;
        'modules: for &module in &self.modules {
            for index in self.arena.descendants(module) {
                if let NodeKind::Typedef(info) = &self.arena.get(index).kind {
                    if info.target.type_name == type_ref.type_name
                        && info.target.generic_args == type_ref.generic_args
                    {
                        found = Some(index);
                        break 'modules;
                    }
                }
            }
        }
        let typedef = found?;
        // Make sure the typedef is usable as a type before handing it out.
        match self.ensure_typedef_resolved(typedef) {
            Ok(()) => Some(typedef),
            Err(_) => None,
        }
    }

    // =========================================================================
    // Typedefs
    // =========================================================================

    /// Resolve a typedef's target: link an alias, or inflate a template
    /// specialization. Lazy; guarded against recursion.
    pub fn ensure_typedef_resolved(&mut self, typedef: NodeIndex) -> Result<()> {
        let info = self
            .arena
            .get(typedef)
            .as_typedef()
            .expect("not a typedef");
        if info.resolved.is_some() {
            return Ok(());
        }
        if !self.inflating.insert(typedef) {
            // Already inflating this typedef further up the stack.
            return Ok(());
        }

        let result = self.resolve_typedef_target(typedef);
        self.inflating.remove(&typedef);

        let resolved = result?;
        self.arena
            .get_mut(typedef)
            .as_typedef_mut()
            .expect("not a typedef")
            .resolved = Some(resolved);
        Ok(())
    }

    fn resolve_typedef_target(&mut self, typedef: NodeIndex) -> Result<NodeIndex> {
        let node = self.arena.get(typedef);
        let info = node.as_typedef().expect("not a typedef");
        let target = info.target.clone();
        let is_alias = info.is_alias;
        let name = node.name.clone();
        let location = node.location.clone();

        // Resolve the target by name alone; resolving with generic
        // arguments would find this very typedef through the
        // instantiation search.
        let target_name = TypeRef::named(target.type_name.clone());
        let Some(target_index) = self.resolve(&target_name, typedef) else {
            return Err(Error {
                kind: ErrorKind::Resolution,
                message: format!("unknown type '{}' referenced by typedef '{name}'", target),
                location,
            });
        };

        if is_alias || target.generic_args.is_empty() {
            return Ok(target_index);
        }

        // Template specialization: clone the template subtree and
        // substitute its parameters with the concrete arguments.
        debug!("inflating template '{}' as '{name}'", target.type_name);
        let clone = self.arena.clone_subtree(target_index);
        let params = match &self.arena.get(clone).kind {
            NodeKind::Class(info) => info.template_params.clone(),
            NodeKind::Struct(info) => info.template_params.clone(),
            _ => {
                return Err(Error {
                    kind: ErrorKind::Semantic,
                    message: format!(
                        "typedef '{name}' target '{}' is not a template type",
                        target.type_name
                    ),
                    location,
                });
            }
        };
        if params.len() != target.generic_args.len() {
            return Err(Error {
                kind: ErrorKind::Semantic,
                message: format!(
                    "typedef '{name}' supplies {} generic argument(s), template '{}' takes {}",
                    target.generic_args.len(),
                    target.type_name,
                    params.len()
                ),
                location,
            });
        }

        let clone_node = self.arena.get_mut(clone);
        clone_node.native_name = Some(target.to_string());
        clone_node.name = name;
        match &mut clone_node.kind {
            NodeKind::Class(info) => {
                info.is_template = false;
                info.template_params.clear();
                substitute_class(info, &params, &target.generic_args);
            }
            NodeKind::Struct(info) => {
                info.is_template = false;
                info.template_params.clear();
                substitute_struct(info, &params, &target.generic_args);
            }
            _ => unreachable!(),
        }
        // The clone inherits the typedef's surroundings for name lookups.
        self.arena.get_mut(clone).parent = self.arena.get(typedef).parent;
        Ok(clone)
    }

    /// The node a typedef stands for, when already resolved.
    pub fn typedef_backing(&self, typedef: NodeIndex) -> Option<NodeIndex> {
        self.arena.get(typedef).as_typedef().and_then(|info| info.resolved)
    }

    /// Follow typedefs to the concrete type node.
    pub fn dealias(&mut self, index: NodeIndex) -> NodeIndex {
        let mut current = index;
        let mut hops = 0;
        loop {
            if !matches!(self.arena.get(current).kind, NodeKind::Typedef(_)) {
                break;
            }
            if self.ensure_typedef_resolved(current).is_err() {
                break;
            }
            match self.typedef_backing(current) {
                Some(next) if next != current && hops < 16 => {
                    current = next;
                    hops += 1;
                }
                _ => break,
            }
        }
        current
    }

    // =========================================================================
    // POD queries
    // =========================================================================

    /// POD-ness of a type reference, per the boundary-marshalling rule:
    /// a resolved API type is authoritative; otherwise pointers and
    /// references are POD; otherwise everything except the recognized
    /// string/container primitives defaults to POD.
    pub fn is_pod_type(&mut self, type_ref: &TypeRef, scope: NodeIndex) -> bool {
        if let Some(resolved) = self.resolve(type_ref, scope) {
            let concrete = self.dealias(resolved);
            if let Some(pod) = self.arena.get(concrete).is_pod() {
                return pod;
            }
        }
        if type_ref.is_ptr || type_ref.is_ref {
            return true;
        }
        !type_ref.is_object_primitive()
    }

    /// Whether a type reference names a scripting object class.
    pub fn is_scripting_object_type(&mut self, type_ref: &TypeRef, scope: NodeIndex) -> bool {
        match self.resolve(type_ref, scope) {
            Some(resolved) => {
                let concrete = self.dealias(resolved);
                self.arena
                    .get(concrete)
                    .as_class()
                    .is_some_and(|info| info.is_scripting_object)
            }
            None => inbuild::is_scripting_object_root(&type_ref.type_name),
        }
    }
}

// =============================================================================
// Template substitution
// =============================================================================

fn substitute_class(info: &mut apigen_model::ClassInfo, params: &[String], args: &[TypeRef]) {
    if let Some(base) = &mut info.base {
        base.substitute(params, args);
    }
    for interface in &mut info.interfaces {
        interface.type_ref.substitute(params, args);
    }
    for field in &mut info.fields {
        field.type_ref.substitute(params, args);
    }
    for property in &mut info.properties {
        property.type_ref.substitute(params, args);
        for accessor in [&mut property.getter, &mut property.setter]
            .into_iter()
            .flatten()
        {
            substitute_function(accessor, params, args);
        }
    }
    for function in &mut info.functions {
        substitute_function(function, params, args);
    }
    for event in &mut info.events {
        for arg in &mut event.signature {
            arg.substitute(params, args);
        }
    }
}

fn substitute_struct(info: &mut apigen_model::StructInfo, params: &[String], args: &[TypeRef]) {
    if let Some(base) = &mut info.base {
        base.substitute(params, args);
    }
    for field in &mut info.fields {
        field.type_ref.substitute(params, args);
    }
    for function in &mut info.functions {
        substitute_function(function, params, args);
    }
    // The specialization is concrete, so POD can now be computed.
    info.is_pod = None;
}

fn substitute_function(function: &mut apigen_model::FunctionInfo, params: &[String], args: &[TypeRef]) {
    function.return_type.substitute(params, args);
    for parameter in &mut function.parameters {
        parameter.type_ref.substitute(params, args);
    }
}
