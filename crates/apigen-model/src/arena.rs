//! Arena storage for model nodes.
//!
//! All nodes of a build live in one `ApiArena`; `NodeIndex` values link
//! parents to children. Workers parsing headers in parallel build subtrees
//! in scratch arenas and graft them into the build arena afterwards, which
//! keeps insertion deterministic without sharing mutable state.

use crate::node::{Node, NodeKind};

/// Index of a node within an `ApiArena`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owns every node of a build.
#[derive(Clone, Debug, Default)]
pub struct ApiArena {
    nodes: Vec<Node>,
}

impl ApiArena {
    pub fn new() -> Self {
        ApiArena { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Store a node and return its index.
    pub fn alloc(&mut self, node: Node) -> NodeIndex {
        let index = NodeIndex(self.nodes.len() as u32);
        self.nodes.push(node);
        index
    }

    pub fn get(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.index()]
    }

    pub fn get_mut(&mut self, index: NodeIndex) -> &mut Node {
        &mut self.nodes[index.index()]
    }

    /// Attach `child` under `parent`, preserving sibling order.
    ///
    /// A child with no namespace inherits the parent's, which is how a
    /// file's namespace reaches every type it declares.
    pub fn add_child(&mut self, parent: NodeIndex, child: NodeIndex) {
        let parent_namespace = self.get(parent).namespace.clone();
        let child_node = self.get_mut(child);
        debug_assert!(child_node.parent.is_none(), "node re-parented");
        child_node.parent = Some(parent);
        if child_node.namespace.is_none() {
            child_node.namespace = parent_namespace;
        }
        self.get_mut(parent).children.push(child);
    }

    /// Allocate a node and attach it under `parent` in one step.
    pub fn alloc_child(&mut self, parent: NodeIndex, node: Node) -> NodeIndex {
        let index = self.alloc(node);
        self.add_child(parent, index);
        index
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// The ancestor chain of a node, nearest first. Always terminates: the
    /// arena is a forest and parents are assigned exactly once.
    pub fn ancestors(&self, index: NodeIndex) -> Ancestors<'_> {
        Ancestors {
            arena: self,
            current: self.get(index).parent,
        }
    }

    /// The module node a descendant belongs to, if any.
    pub fn owning_module(&self, index: NodeIndex) -> Option<NodeIndex> {
        if matches!(self.get(index).kind, NodeKind::Module(_)) {
            return Some(index);
        }
        self.ancestors(index)
            .find(|&idx| matches!(self.get(idx).kind, NodeKind::Module(_)))
    }

    /// Direct child with the given exported name.
    pub fn find_child(&self, parent: NodeIndex, name: &str) -> Option<NodeIndex> {
        self.get(parent)
            .children
            .iter()
            .copied()
            .find(|&child| self.get(child).name == name)
    }

    /// Recursive scan of the child lists under `parent` for a type with the
    /// given exported name.
    pub fn find_type(&self, parent: NodeIndex, name: &str) -> Option<NodeIndex> {
        for &child in &self.get(parent).children {
            let node = self.get(child);
            if node.kind.is_type() && node.name == name {
                return Some(child);
            }
            if let Some(found) = self.find_type(child, name) {
                return Some(found);
            }
        }
        None
    }

    /// Depth-first walk over every descendant of `root`, in sibling order.
    pub fn walk(&self, root: NodeIndex, visit: &mut impl FnMut(&ApiArena, NodeIndex)) {
        for &child in &self.get(root).children {
            visit(self, child);
            self.walk(child, visit);
        }
    }

    /// Collect every descendant index of `root`, depth-first left-to-right.
    pub fn descendants(&self, root: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        self.collect_descendants(root, &mut out);
        out
    }

    fn collect_descendants(&self, root: NodeIndex, out: &mut Vec<NodeIndex>) {
        for &child in &self.get(root).children {
            out.push(child);
            self.collect_descendants(child, out);
        }
    }

    // =========================================================================
    // Names
    // =========================================================================

    /// Managed full name: `.` between namespace and type, `+` between
    /// nested types.
    pub fn full_name_managed(&self, index: NodeIndex) -> String {
        let node = self.get(index);
        let mut nested = vec![node.name.as_str()];
        for ancestor in self.ancestors(index) {
            let ancestor_node = self.get(ancestor);
            if ancestor_node.kind.is_type() {
                nested.push(ancestor_node.name.as_str());
            } else {
                break;
            }
        }
        nested.reverse();
        let type_path = nested.join("+");
        match &node.namespace {
            Some(ns) if !ns.is_empty() => format!("{ns}.{type_path}"),
            _ => type_path,
        }
    }

    /// Native full name: `::` between nested types.
    pub fn full_name_native(&self, index: NodeIndex) -> String {
        let node = self.get(index);
        let mut nested = vec![node.native_name().to_string()];
        for ancestor in self.ancestors(index) {
            let ancestor_node = self.get(ancestor);
            if ancestor_node.kind.is_type() {
                nested.push(ancestor_node.native_name().to_string());
            } else {
                break;
            }
        }
        nested.reverse();
        nested.join("::")
    }

    // =========================================================================
    // Module assembly
    // =========================================================================

    /// Sort a module's file children by path so output order never depends
    /// on parse completion order.
    pub fn sort_files(&mut self, module: NodeIndex) {
        let mut children = std::mem::take(&mut self.get_mut(module).children);
        children.sort_by(|&a, &b| {
            let pa = match &self.get(a).kind {
                NodeKind::File(info) => info.path.as_str(),
                _ => self.get(a).name.as_str(),
            };
            let pb = match &self.get(b).kind {
                NodeKind::File(info) => info.path.as_str(),
                _ => self.get(b).name.as_str(),
            };
            pa.cmp(pb)
        });
        self.get_mut(module).children = children;
    }

    /// Deep-copy the subtree rooted at `src_root` from `src` into this
    /// arena, attaching it under `parent`. Returns the new root index.
    pub fn graft(&mut self, src: &ApiArena, src_root: NodeIndex, parent: NodeIndex) -> NodeIndex {
        let root = self.graft_node(src, src_root);
        self.add_child(parent, root);
        root
    }

    fn graft_node(&mut self, src: &ApiArena, src_index: NodeIndex) -> NodeIndex {
        let mut node = src.get(src_index).clone();
        let src_children = std::mem::take(&mut node.children);
        node.parent = None;
        let index = self.alloc(node);
        for child in src_children {
            let new_child = self.graft_node(src, child);
            // Re-link directly: namespaces were already inherited in the
            // scratch arena.
            self.get_mut(new_child).parent = Some(index);
            self.get_mut(index).children.push(new_child);
        }
        index
    }

    /// Deep-copy a subtree within this arena without attaching it to a
    /// parent. Used by typedef specialization.
    pub fn clone_subtree(&mut self, src_root: NodeIndex) -> NodeIndex {
        let mut node = self.get(src_root).clone();
        let src_children = std::mem::take(&mut node.children);
        node.parent = None;
        let index = self.alloc(node);
        for child in src_children {
            let new_child = self.clone_subtree(child);
            self.get_mut(new_child).parent = Some(index);
            self.get_mut(index).children.push(new_child);
        }
        index
    }
}

/// Iterator over a node's ancestor chain, nearest first.
pub struct Ancestors<'a> {
    arena: &'a ApiArena,
    current: Option<NodeIndex>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<NodeIndex> {
        let current = self.current?;
        self.current = self.arena.get(current).parent;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ClassInfo, FileInfo, ModuleInfo, NodeKind};

    fn module_with_file(arena: &mut ApiArena) -> (NodeIndex, NodeIndex) {
        let module = arena.alloc(Node::new("Core", NodeKind::Module(ModuleInfo::default())));
        let mut file = Node::new(
            "Actor.h",
            NodeKind::File(FileInfo {
                path: "Source/Actor.h".to_string(),
            }),
        );
        file.namespace = Some("Engine".to_string());
        let file = arena.alloc(file);
        arena.add_child(module, file);
        (module, file)
    }

    #[test]
    fn ancestors_terminate_at_the_module() {
        let mut arena = ApiArena::new();
        let (module, file) = module_with_file(&mut arena);
        let class = arena.alloc_child(file, Node::new("Actor", NodeKind::Class(ClassInfo::default())));

        let chain: Vec<_> = arena.ancestors(class).collect();
        assert_eq!(chain, vec![file, module]);
        assert_eq!(arena.owning_module(class), Some(module));
    }

    #[test]
    fn add_child_assigns_the_file_namespace() {
        let mut arena = ApiArena::new();
        let (_, file) = module_with_file(&mut arena);
        let class = arena.alloc_child(file, Node::new("Actor", NodeKind::Class(ClassInfo::default())));
        assert_eq!(arena.get(class).namespace.as_deref(), Some("Engine"));

        let mut own = Node::new("Other", NodeKind::Class(ClassInfo::default()));
        own.namespace = Some("Game".to_string());
        let other = arena.alloc_child(file, own);
        assert_eq!(arena.get(other).namespace.as_deref(), Some("Game"));
    }

    #[test]
    fn managed_full_name_uses_dot_and_plus() {
        let mut arena = ApiArena::new();
        let (_, file) = module_with_file(&mut arena);
        let outer = arena.alloc_child(file, Node::new("Outer", NodeKind::Class(ClassInfo::default())));
        let inner = arena.alloc_child(outer, Node::new("Inner", NodeKind::Class(ClassInfo::default())));

        assert_eq!(arena.full_name_managed(outer), "Engine.Outer");
        assert_eq!(arena.full_name_managed(inner), "Engine.Outer+Inner");
        assert_eq!(arena.full_name_native(inner), "Outer::Inner");
    }

    #[test]
    fn sort_files_orders_by_path() {
        let mut arena = ApiArena::new();
        let module = arena.alloc(Node::new("Core", NodeKind::Module(ModuleInfo::default())));
        for path in ["b/Z.h", "a/A.h", "a/B.h"] {
            let file = Node::new(
                path,
                NodeKind::File(FileInfo {
                    path: path.to_string(),
                }),
            );
            let idx = arena.alloc(file);
            arena.add_child(module, idx);
        }
        arena.sort_files(module);
        let paths: Vec<_> = arena
            .get(module)
            .children
            .iter()
            .map(|&c| match &arena.get(c).kind {
                NodeKind::File(info) => info.path.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(paths, vec!["a/A.h", "a/B.h", "b/Z.h"]);
    }

    #[test]
    fn graft_preserves_structure_and_order() {
        let mut scratch = ApiArena::new();
        let file = scratch.alloc(Node::new(
            "F.h",
            NodeKind::File(FileInfo {
                path: "F.h".to_string(),
            }),
        ));
        scratch.alloc_child(file, Node::new("A", NodeKind::Class(ClassInfo::default())));
        scratch.alloc_child(file, Node::new("B", NodeKind::Class(ClassInfo::default())));

        let mut build = ApiArena::new();
        let module = build.alloc(Node::new("Core", NodeKind::Module(ModuleInfo::default())));
        let new_file = build.graft(&scratch, file, module);

        let names: Vec<_> = build
            .get(new_file)
            .children
            .iter()
            .map(|&c| build.get(c).name.clone())
            .collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(build.get(new_file).parent, Some(module));
    }
}
