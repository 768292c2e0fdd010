//! Parsing context: one header, one scratch arena.

use std::sync::Arc;

use apigen_common::{Error, Result, SourceLocation};
use apigen_model::{Access, ApiArena, FileInfo, Node, NodeIndex, NodeKind};
use apigen_scanner::Tokenizer;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::preprocessor::ExternalDefines;

/// Hook consulted for unrecognized tag parameters. Returning `true` claims
/// the tag; otherwise a warning is logged and the tag is ignored.
pub type UnknownTagHook = fn(tag: &str, value: &str) -> bool;

/// Per-module parse configuration.
#[derive(Clone, Debug, Default)]
pub struct ParseOptions {
    /// Default namespace assigned to the file node (and inherited by types
    /// that declare none).
    pub namespace: Option<String>,
    /// Definition sets from the build environment.
    pub external_defines: ExternalDefines,
    /// Extension point for project-specific tags.
    pub unknown_tag_hook: Option<UnknownTagHook>,
}

/// A brace scope. API type declarations own their frame; other braces
/// (function bodies, initializers, plain C++ types) get anonymous frames so
/// the stack mirrors the source exactly.
#[derive(Clone, Copy, Debug)]
pub struct ScopeFrame {
    /// The API type whose body this scope is, when it is one.
    pub node: Option<NodeIndex>,
    pub access: Access,
}

/// State for parsing a single header.
pub struct ParserContext<'a> {
    pub arena: ApiArena,
    pub file: NodeIndex,
    pub tok: Tokenizer<'a>,
    /// Raw source lines for comment collection.
    pub lines: Vec<&'a str>,
    pub scopes: SmallVec<[ScopeFrame; 8]>,
    /// Local `#define` map.
    pub defines: FxHashMap<String, String>,
    pub options: &'a ParseOptions,
    file_path: Arc<str>,
}

impl<'a> ParserContext<'a> {
    pub fn new(source: &'a str, file_path: &str, options: &'a ParseOptions) -> Self {
        let path: Arc<str> = Arc::from(file_path);
        let mut arena = ApiArena::new();
        let mut file_node = Node::new(
            file_name_of(file_path),
            NodeKind::File(FileInfo {
                path: file_path.to_string(),
            }),
        );
        file_node.namespace = options.namespace.clone();
        file_node.location = Some(SourceLocation::file_start(Arc::clone(&path)));
        let file = arena.alloc(file_node);

        ParserContext {
            arena,
            file,
            tok: Tokenizer::new(source, Arc::clone(&path)),
            lines: source.lines().collect(),
            scopes: SmallVec::new(),
            defines: FxHashMap::default(),
            options,
            file_path: path,
        }
    }

    /// Location at an explicit line.
    pub fn location(&self, line: u32) -> SourceLocation {
        SourceLocation::new(Arc::clone(&self.file_path), line)
    }

    // =========================================================================
    // Scopes and access
    // =========================================================================

    pub fn push_scope(&mut self, node: Option<NodeIndex>, access: Access) {
        self.scopes.push(ScopeFrame { node, access });
    }

    /// Pop on `}`. An empty stack means the braces never matched.
    pub fn pop_scope(&mut self, line: u32) -> Result<ScopeFrame> {
        self.scopes.pop().ok_or_else(|| {
            Error::syntax(self.location(line), "mismatched closing brace '}'")
        })
    }

    pub fn current_access(&self) -> Access {
        self.scopes
            .last()
            .map_or(Access::Public, |frame| frame.access)
    }

    pub fn set_access(&mut self, access: Access) {
        if let Some(frame) = self.scopes.last_mut() {
            frame.access = access;
        }
    }

    /// The innermost API type scope, if the cursor is inside one.
    pub fn current_type(&self) -> Option<NodeIndex> {
        self.scopes.iter().rev().find_map(|frame| frame.node)
    }

    /// Where a new type declaration attaches: the innermost API type, or
    /// the file.
    pub fn type_parent(&self) -> NodeIndex {
        self.current_type().unwrap_or(self.file)
    }

    /// The innermost API type, or a semantic error naming the construct.
    pub fn require_type(&self, construct: &str, line: u32) -> Result<NodeIndex> {
        self.current_type().ok_or_else(|| {
            Error::semantic(
                self.location(line),
                format!("{construct} must be declared inside an API type"),
            )
        })
    }
}

fn file_name_of(path: &str) -> String {
    path.rsplit(['/', '\\'])
        .next()
        .unwrap_or(path)
        .to_string()
}
