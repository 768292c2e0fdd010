//! Type-level constructs: classes, structs, interfaces, enums, typedefs,
//! injected code.

use apigen_common::{Error, Result};
use apigen_model::{
    Access, ClassInfo, EnumEntry, EnumInfo, InjectCodeInfo, InterfaceInfo, InterfaceRef, Node,
    NodeKind, StructInfo, TypeRef, TypedefInfo,
};
use apigen_scanner::TokenKind;

use crate::comments::collect_comment;
use crate::context::ParserContext;
use crate::members::warn_unknown_tag;
use crate::tags::TagParam;
use crate::types::{capture_until, parse_type};

/// Which type-level construct is being parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeConstruct {
    Class,
    Struct,
    Interface,
}

/// Parse `API_CLASS`, `API_STRUCT`, or `API_INTERFACE`.
pub fn parse_type_construct(
    ctx: &mut ParserContext<'_>,
    construct: TypeConstruct,
    tags: &[TagParam],
    comment: Vec<String>,
    line: u32,
) -> Result<()> {
    // Nested classes are rejected up front; nested structs/enums are fine.
    if matches!(construct, TypeConstruct::Class | TypeConstruct::Interface)
        && ctx.current_type().is_some()
    {
        return Err(Error::semantic(
            ctx.location(line),
            "nested classes are not supported; declare the type at file scope",
        ));
    }

    // Optional `template<typename T, ...>` ahead of the keyword.
    let mut template_params: Vec<String> = Vec::new();
    let token = ctx.tok.next_token()?;
    if token.is_ident("template") {
        ctx.tok.expect_token(TokenKind::LeftAngleBracket)?;
        loop {
            let kind = ctx.tok.expect_token(TokenKind::Identifier)?;
            if !matches!(kind.text, "typename" | "class") {
                return Err(ctx.tok.unexpected(&kind, "'typename' or 'class'"));
            }
            let name = ctx.tok.expect_token(TokenKind::Identifier)?;
            template_params.push(name.text.to_string());
            let token = ctx.tok.next_token()?;
            match token.kind {
                TokenKind::Comma => continue,
                TokenKind::RightAngleBracket => break,
                _ => return Err(ctx.tok.unexpected(&token, "',' or '>'")),
            }
        }
    } else {
        ctx.tok.rewind(token);
    }

    // The C++ keyword: structs use `struct`, classes and interfaces `class`.
    let keyword = match construct {
        TypeConstruct::Struct => "struct",
        _ => "class",
    };
    ctx.tok.expect_ident(keyword)?;

    // Declared name, skipping export macros.
    let name = loop {
        let token = ctx.tok.expect_token(TokenKind::Identifier)?;
        if token.text.ends_with("_API") || token.text == "DEPRECATED" {
            continue;
        }
        break token.text.to_string();
    };

    // Inheritance list.
    let mut bases: Vec<(Access, TypeRef)> = Vec::new();
    let token = ctx.tok.next_token()?;
    if token.kind == TokenKind::Colon {
        loop {
            let mut access = Access::Private;
            let token = ctx.tok.next_token()?;
            if let TokenKind::Identifier = token.kind {
                if let Some(parsed) = Access::parse(token.text) {
                    access = parsed;
                } else {
                    ctx.tok.rewind(token);
                }
            } else {
                ctx.tok.rewind(token);
            }
            let base = parse_type(&mut ctx.tok)?;
            bases.push((access, base));

            let token = ctx.tok.next_token()?;
            match token.kind {
                TokenKind::Comma => continue,
                TokenKind::LeftCurlyBrace => break,
                _ => return Err(ctx.tok.unexpected(&token, "',' or '{'")),
            }
        }
    } else if token.kind != TokenKind::LeftCurlyBrace {
        return Err(ctx.tok.unexpected(&token, "'{'"));
    }

    // Build the payload.
    let kind = match construct {
        TypeConstruct::Class => {
            let mut info = ClassInfo {
                is_template: !template_params.is_empty(),
                template_params,
                ..ClassInfo::default()
            };
            split_inheritance(bases, &mut info.base, &mut info.base_access, &mut info.interfaces);
            NodeKind::Class(info)
        }
        TypeConstruct::Struct => {
            let mut info = StructInfo {
                is_template: !template_params.is_empty(),
                template_params,
                ..StructInfo::default()
            };
            let mut base_access = Access::Public;
            split_inheritance(bases, &mut info.base, &mut base_access, &mut info.interfaces);
            NodeKind::Struct(info)
        }
        TypeConstruct::Interface => {
            if !bases.is_empty() {
                return Err(Error::semantic(
                    ctx.location(line),
                    format!("interface '{name}' cannot have base classes"),
                ));
            }
            NodeKind::Interface(InterfaceInfo::default())
        }
    };

    let mut node = Node::new(name, kind);
    node.comment = comment;
    node.location = Some(ctx.location(line));
    apply_type_tags(ctx, &mut node, tags, construct)?;

    let parent = ctx.type_parent();
    let index = ctx.arena.alloc_child(parent, node);

    // Enter the body. Members parse at their own API tags; the `}` pops.
    let default_access = match construct {
        TypeConstruct::Class => Access::Private,
        _ => Access::Public,
    };
    ctx.push_scope(Some(index), default_access);
    Ok(())
}

/// First entry becomes the base unless it looks like an interface;
/// interface-looking entries join the interface list.
fn split_inheritance(
    bases: Vec<(Access, TypeRef)>,
    base: &mut Option<TypeRef>,
    base_access: &mut Access,
    interfaces: &mut Vec<InterfaceRef>,
) {
    for (access, type_ref) in bases {
        let looks_like_interface = {
            let short = type_ref.short_name();
            let mut chars = short.chars();
            chars.next() == Some('I') && chars.next().is_some_and(char::is_uppercase)
        };
        if base.is_none() && !looks_like_interface {
            *base = Some(type_ref);
            *base_access = access;
        } else {
            interfaces.push(InterfaceRef { access, type_ref });
        }
    }
}

fn apply_type_tags(
    ctx: &ParserContext<'_>,
    node: &mut Node,
    tags: &[TagParam],
    construct: TypeConstruct,
) -> Result<()> {
    for tag in tags {
        if let Some(access) = Access::parse(&tag.name) {
            node.access = access;
            continue;
        }
        match tag.name.as_str() {
            "name" => {
                if let Some(value) = &tag.value {
                    node.native_name = Some(std::mem::replace(&mut node.name, value.clone()));
                }
            }
            "namespace" => node.namespace = tag.value.clone(),
            "attributes" => node.attributes = tag.value.clone(),
            "inbuild" => {
                node.tags.insert("inbuild".to_string(), String::new());
            }
            "tag" => {
                if let Some(value) = &tag.value {
                    let (key, val) = value.split_once('=').unwrap_or((value.as_str(), ""));
                    node.tags.insert(key.to_string(), val.to_string());
                }
            }
            "static" if construct == TypeConstruct::Class => {
                if let NodeKind::Class(info) = &mut node.kind {
                    info.is_static = true;
                    info.no_spawn = true;
                }
            }
            "sealed" if construct == TypeConstruct::Class => {
                if let NodeKind::Class(info) = &mut node.kind {
                    info.is_sealed = true;
                }
            }
            "abstract" if construct == TypeConstruct::Class => {
                if let NodeKind::Class(info) = &mut node.kind {
                    info.is_abstract = true;
                }
            }
            "nospawn" if construct == TypeConstruct::Class => {
                if let NodeKind::Class(info) = &mut node.kind {
                    info.no_spawn = true;
                }
            }
            "noconstructor" if construct == TypeConstruct::Class => {
                if let NodeKind::Class(info) = &mut node.kind {
                    info.no_constructor = true;
                }
            }
            "template" => match &mut node.kind {
                NodeKind::Class(info) => info.is_template = true,
                NodeKind::Struct(info) => info.is_template = true,
                _ => {}
            },
            "forcenopod" if construct == TypeConstruct::Struct => {
                if let NodeKind::Struct(info) = &mut node.kind {
                    info.force_no_pod = true;
                }
            }
            "nodefault" if construct == TypeConstruct::Struct => {
                if let NodeKind::Struct(info) = &mut node.kind {
                    info.no_default = true;
                }
            }
            other => warn_unknown_tag(ctx, other, tag.value_or_empty()),
        }
    }
    Ok(())
}

// =============================================================================
// Enums
// =============================================================================

/// Parse `API_ENUM`.
pub fn parse_enum(
    ctx: &mut ParserContext<'_>,
    tags: &[TagParam],
    comment: Vec<String>,
    line: u32,
) -> Result<()> {
    ctx.tok.expect_ident("enum")?;
    let token = ctx.tok.next_token()?;
    if !(token.is_ident("class") || token.is_ident("struct")) {
        ctx.tok.rewind(token);
    }

    let name = loop {
        let token = ctx.tok.expect_token(TokenKind::Identifier)?;
        if token.text.ends_with("_API") {
            continue;
        }
        break token.text.to_string();
    };

    let mut info = EnumInfo::default();
    let token = ctx.tok.next_token()?;
    if token.kind == TokenKind::Colon {
        info.underlying = Some(parse_type(&mut ctx.tok)?);
        ctx.tok.expect_token(TokenKind::LeftCurlyBrace)?;
    } else if token.kind != TokenKind::LeftCurlyBrace {
        return Err(ctx.tok.unexpected(&token, "'{'"));
    }

    // Entries. Sub-types are rejected here: an enum body only contains
    // entry names and values.
    loop {
        let token = ctx.tok.next_token()?;
        match token.kind {
            TokenKind::RightCurlyBrace => break,
            TokenKind::Comma => continue,
            TokenKind::Identifier => {
                if token.text.starts_with("API_") {
                    return Err(Error::semantic(
                        ctx.location(token.line),
                        format!("enum '{name}' cannot host sub-types"),
                    ));
                }
                let mut entry = EnumEntry {
                    name: token.text.to_string(),
                    comment: collect_comment(&ctx.lines, token.line),
                    ..EnumEntry::default()
                };
                let token = ctx.tok.next_token()?;
                if token.kind == TokenKind::Equal {
                    let value = capture_until(
                        &mut ctx.tok,
                        &[TokenKind::Comma, TokenKind::RightCurlyBrace],
                    )?;
                    entry.value = Some(value);
                } else {
                    ctx.tok.rewind(token);
                }
                if entry.name == "MAX" && entry.comment.is_empty() {
                    entry.comment = vec![format!(
                        "/// <summary>The count of items in the {name} enum.</summary>"
                    )];
                }
                info.entries.push(entry);
            }
            _ => return Err(ctx.tok.unexpected(&token, "enum entry")),
        }
    }

    let mut node = Node::new(name, NodeKind::Enum(info));
    node.comment = comment;
    node.location = Some(ctx.location(line));
    apply_enum_tags(ctx, &mut node, tags);

    let parent = ctx.type_parent();
    ctx.arena.alloc_child(parent, node);
    Ok(())
}

fn apply_enum_tags(ctx: &ParserContext<'_>, node: &mut Node, tags: &[TagParam]) {
    for tag in tags {
        if let Some(access) = Access::parse(&tag.name) {
            node.access = access;
            continue;
        }
        match tag.name.as_str() {
            "name" => {
                if let Some(value) = &tag.value {
                    node.native_name = Some(std::mem::replace(&mut node.name, value.clone()));
                }
            }
            "namespace" => node.namespace = tag.value.clone(),
            "attributes" => node.attributes = tag.value.clone(),
            "inbuild" => {
                node.tags.insert("inbuild".to_string(), String::new());
            }
            "tag" => {
                if let Some(value) = &tag.value {
                    let (key, val) = value.split_once('=').unwrap_or((value.as_str(), ""));
                    node.tags.insert(key.to_string(), val.to_string());
                }
            }
            other => warn_unknown_tag(ctx, other, tag.value_or_empty()),
        }
    }
}

// =============================================================================
// Typedefs and injected code
// =============================================================================

/// Parse `API_TYPEDEF`, either the `typedef` or the `using` form.
pub fn parse_typedef(
    ctx: &mut ParserContext<'_>,
    tags: &[TagParam],
    comment: Vec<String>,
    line: u32,
) -> Result<()> {
    let token = ctx.tok.expect_token(TokenKind::Identifier)?;
    let (target, name) = match token.text {
        "typedef" => {
            let target = parse_type(&mut ctx.tok)?;
            let name = ctx.tok.expect_token(TokenKind::Identifier)?.text.to_string();
            (target, name)
        }
        "using" => {
            let name = ctx.tok.expect_token(TokenKind::Identifier)?.text.to_string();
            ctx.tok.expect_token(TokenKind::Equal)?;
            let target = parse_type(&mut ctx.tok)?;
            (target, name)
        }
        _ => return Err(ctx.tok.unexpected(&token, "'typedef' or 'using'")),
    };
    ctx.tok.expect_token(TokenKind::Semicolon)?;

    let mut info = TypedefInfo {
        target,
        ..TypedefInfo::default()
    };
    let mut node_tags: Vec<&TagParam> = Vec::new();
    for tag in tags {
        match tag.name.as_str() {
            "alias" => info.is_alias = true,
            _ => node_tags.push(tag),
        }
    }

    let mut node = Node::new(name, NodeKind::Typedef(info));
    node.comment = comment;
    node.location = Some(ctx.location(line));
    for tag in node_tags {
        if let Some(access) = Access::parse(&tag.name) {
            node.access = access;
            continue;
        }
        match tag.name.as_str() {
            "name" => {
                if let Some(value) = &tag.value {
                    node.native_name = Some(std::mem::replace(&mut node.name, value.clone()));
                }
            }
            "namespace" => node.namespace = tag.value.clone(),
            "attributes" => node.attributes = tag.value.clone(),
            other => warn_unknown_tag(ctx, other, tag.value_or_empty()),
        }
    }

    let parent = ctx.type_parent();
    ctx.arena.alloc_child(parent, node);
    Ok(())
}

/// Parse `API_INJECT_CODE(language, "code")`.
pub fn parse_inject_code(ctx: &mut ParserContext<'_>, line: u32) -> Result<()> {
    ctx.tok.expect_token(TokenKind::LeftParent)?;
    let language = ctx.tok.expect_token(TokenKind::Identifier)?.text.to_string();
    ctx.tok.expect_token(TokenKind::Comma)?;
    let code_token = ctx.tok.expect_token(TokenKind::String)?;
    let code = unquote(code_token.text);
    ctx.tok.expect_token(TokenKind::RightParent)?;

    let mut node = Node::new(
        language.clone(),
        NodeKind::InjectCode(InjectCodeInfo { language, code }),
    );
    node.location = Some(ctx.location(line));
    let parent = ctx.type_parent();
    ctx.arena.alloc_child(parent, node);
    Ok(())
}

/// Set the auto-serialization flag on the current type
/// (`API_AUTO_SERIALIZATION()`).
pub fn parse_auto_serialization(ctx: &mut ParserContext<'_>, line: u32) -> Result<()> {
    let owner = ctx.require_type("API_AUTO_SERIALIZATION", line)?;
    ctx.tok.expect_token(TokenKind::LeftParent)?;
    ctx.tok.expect_token(TokenKind::RightParent)?;
    let token = ctx.tok.next_token()?;
    if token.kind != TokenKind::Semicolon {
        ctx.tok.rewind(token);
    }

    let location = ctx.location(line);
    let node = ctx.arena.get_mut(owner);
    match &mut node.kind {
        NodeKind::Class(info) => info.is_auto_serialization = true,
        NodeKind::Struct(info) => info.is_auto_serialization = true,
        _ => {
            return Err(Error::semantic(
                location,
                format!("'{}' does not support auto-serialization", node.name),
            ));
        }
    }
    Ok(())
}

fn unquote(text: &str) -> String {
    let inner = text
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(text);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}
