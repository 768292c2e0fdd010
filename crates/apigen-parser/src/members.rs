//! Member parsing: functions, fields, properties, events, parameters.

use apigen_common::{Error, Result};
use apigen_model::{
    Access, EventInfo, FieldInfo, FunctionInfo, NodeKind, ParamFlags, ParameterInfo, PropertyInfo,
    TypeRef,
};
use apigen_scanner::TokenKind;

use crate::context::ParserContext;
use crate::tags::{TagParam, parse_tag_params};
use crate::types::{capture_until, parse_type};

/// Declaration prefixes shared by fields and functions.
#[derive(Debug, Default)]
struct Prefixes {
    is_static: bool,
    is_virtual: bool,
    is_constexpr: bool,
    is_deprecated: bool,
}

fn parse_prefixes(ctx: &mut ParserContext<'_>) -> Result<Prefixes> {
    let mut prefixes = Prefixes::default();
    loop {
        let token = ctx.tok.next_token()?;
        if token.kind != TokenKind::Identifier {
            ctx.tok.rewind(token);
            return Ok(prefixes);
        }
        match token.text {
            "static" => prefixes.is_static = true,
            "virtual" => prefixes.is_virtual = true,
            "constexpr" => prefixes.is_constexpr = true,
            "DEPRECATED" => prefixes.is_deprecated = true,
            "inline" | "FORCE_INLINE" | "explicit" | "mutable" => {}
            _ => {
                ctx.tok.rewind(token);
                return Ok(prefixes);
            }
        }
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Parse an `API_FUNCTION` declaration and attach it to the current type.
pub fn parse_function(
    ctx: &mut ParserContext<'_>,
    tags: &[TagParam],
    comment: Vec<String>,
    line: u32,
) -> Result<()> {
    let owner = ctx.require_type("API_FUNCTION", line)?;
    let function = parse_function_signature(ctx, tags, comment, line)?;
    attach_function(ctx, owner, function, line)
}

/// Parse a function signature, through its terminator.
pub fn parse_function_signature(
    ctx: &mut ParserContext<'_>,
    tags: &[TagParam],
    comment: Vec<String>,
    line: u32,
) -> Result<FunctionInfo> {
    let prefixes = parse_prefixes(ctx)?;
    let return_type = parse_type(&mut ctx.tok)?;
    let name = ctx.tok.expect_token(TokenKind::Identifier)?;

    let mut function = FunctionInfo::new(name.text, return_type);
    function.is_static = prefixes.is_static;
    function.is_virtual = prefixes.is_virtual;
    function.is_deprecated = prefixes.is_deprecated;
    function.comment = comment;
    function.access = ctx.current_access();

    // Parameter list.
    ctx.tok.expect_token(TokenKind::LeftParent)?;
    loop {
        let token = ctx.tok.next_token()?;
        if token.kind == TokenKind::RightParent {
            break;
        }
        ctx.tok.rewind(token);

        let index = function.parameters.len();
        let parameter = parse_parameter(ctx, index)?;
        function.parameters.push(parameter);

        let token = ctx.tok.next_token()?;
        match token.kind {
            TokenKind::Comma => continue,
            TokenKind::RightParent => break,
            _ => return Err(ctx.tok.unexpected(&token, "',' or ')'")),
        }
    }

    // Trailing qualifiers.
    loop {
        let token = ctx.tok.next_token()?;
        match token.kind {
            TokenKind::Identifier if token.text == "const" => function.is_const = true,
            TokenKind::Identifier if matches!(token.text, "override" | "final" | "noexcept") => {}
            _ => {
                ctx.tok.rewind(token);
                break;
            }
        }
    }

    // Terminator: `;`, an inline body, or `= 0;` / `= default;`.
    let token = ctx.tok.next_token()?;
    match token.kind {
        TokenKind::Semicolon => {}
        TokenKind::LeftCurlyBrace => skip_balanced_braces(ctx)?,
        TokenKind::Equal => {
            capture_until(&mut ctx.tok, &[TokenKind::Semicolon])?;
            ctx.tok.expect_token(TokenKind::Semicolon)?;
        }
        _ => return Err(ctx.tok.unexpected(&token, "';' or function body")),
    }

    apply_function_tags(ctx, &mut function, tags);
    Ok(function)
}

fn parse_parameter(ctx: &mut ParserContext<'_>, index: usize) -> Result<ParameterInfo> {
    let mut flags = ParamFlags::empty();
    let mut attributes = None;
    let mut tag_default = None;

    // Optional inline API_PARAM(...) tags.
    let token = ctx.tok.next_token()?;
    if token.is_ident("API_PARAM") {
        let params = parse_tag_params(&mut ctx.tok)?;
        for tag in &params {
            match tag.name.as_str() {
                "ref" => flags |= ParamFlags::REF,
                "in" => flags |= ParamFlags::IN,
                "out" => flags |= ParamFlags::OUT,
                "this" => flags |= ParamFlags::THIS,
                "params" => flags |= ParamFlags::PARAMS,
                "attributes" => attributes = tag.value.clone(),
                "defaultvalue" => tag_default = tag.value.clone(),
                other => warn_unknown_tag(ctx, other, tag.value_or_empty()),
            }
        }
    } else {
        ctx.tok.rewind(token);
    }

    let type_ref = parse_type(&mut ctx.tok)?;

    let token = ctx.tok.next_token()?;
    let name = if token.kind == TokenKind::Identifier {
        token.text.to_string()
    } else {
        ctx.tok.rewind(token);
        format!("arg{index}")
    };

    let mut parameter = ParameterInfo::new(name, type_ref);
    parameter.flags = flags;
    parameter.attributes = attributes;

    let token = ctx.tok.next_token()?;
    if token.kind == TokenKind::Equal {
        let text = capture_until(&mut ctx.tok, &[TokenKind::Comma, TokenKind::RightParent])?;
        parameter.default_value = Some(text);
    } else {
        ctx.tok.rewind(token);
    }
    if parameter.default_value.is_none() {
        parameter.default_value = tag_default;
    }

    Ok(parameter)
}

fn apply_function_tags(ctx: &ParserContext<'_>, function: &mut FunctionInfo, tags: &[TagParam]) {
    for tag in tags {
        if let Some(access) = Access::parse(&tag.name) {
            function.access = access;
            continue;
        }
        match tag.name.as_str() {
            "static" => function.is_static = true,
            "virtual" => function.is_virtual = true,
            "noproxy" => function.no_proxy = true,
            "hidden" => function.is_hidden = true,
            "sealed" => function.is_virtual = false,
            "attributes" => function.attributes = tag.value.clone(),
            "deprecated" => {
                function.is_deprecated = true;
                function.deprecated_message = tag.value.clone();
            }
            other => warn_unknown_tag(ctx, other, tag.value_or_empty()),
        }
    }
}

/// Consume tokens until the brace opened by the caller closes.
pub fn skip_balanced_braces(ctx: &mut ParserContext<'_>) -> Result<()> {
    let mut depth = 1u32;
    loop {
        let token = ctx.tok.next_token()?;
        match token.kind {
            TokenKind::LeftCurlyBrace => depth += 1,
            TokenKind::RightCurlyBrace => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            TokenKind::EndOfFile => return Err(ctx.tok.unexpected(&token, "'}'")),
            _ => {}
        }
    }
}

fn attach_function(
    ctx: &mut ParserContext<'_>,
    owner: apigen_model::NodeIndex,
    function: FunctionInfo,
    line: u32,
) -> Result<()> {
    let location = ctx.location(line);
    let node = ctx.arena.get_mut(owner);
    match &mut node.kind {
        NodeKind::Class(info) => info.functions.push(function),
        NodeKind::Struct(info) => info.functions.push(function),
        NodeKind::Interface(info) => info.functions.push(function),
        _ => {
            return Err(Error::semantic(
                location,
                format!("'{}' cannot declare functions", node.name),
            ));
        }
    }
    Ok(())
}

// =============================================================================
// Fields
// =============================================================================

/// Parse an `API_FIELD` declaration and attach it to the current type.
pub fn parse_field(
    ctx: &mut ParserContext<'_>,
    tags: &[TagParam],
    comment: Vec<String>,
    line: u32,
) -> Result<()> {
    let owner = ctx.require_type("API_FIELD", line)?;

    let prefixes = parse_prefixes(ctx)?;
    let type_ref = parse_type(&mut ctx.tok)?;
    let name = ctx.tok.expect_token(TokenKind::Identifier)?;

    let mut field = FieldInfo::new(name.text, type_ref);
    field.is_static = prefixes.is_static;
    field.is_constexpr = prefixes.is_constexpr;
    field.comment = comment;
    field.access = ctx.current_access();

    loop {
        let token = ctx.tok.next_token()?;
        match token.kind {
            TokenKind::Semicolon => break,
            TokenKind::LeftBracket => {
                field.type_ref.is_array = true;
                let size = capture_until(&mut ctx.tok, &[TokenKind::RightBracket])?;
                field.type_ref.array_size = Some(size);
                ctx.tok.expect_token(TokenKind::RightBracket)?;
            }
            TokenKind::Colon => {
                let width = ctx.tok.expect_token(TokenKind::Number)?;
                if width.text != "1" {
                    return Err(Error::semantic(
                        ctx.location(width.line),
                        format!(
                            "bit-field '{}' is wider than 1 bit; only 1-bit fields are supported",
                            field.name
                        ),
                    ));
                }
                field.type_ref.is_bit_field = true;
                field.type_ref.bit_size = Some(1);
            }
            TokenKind::Equal => {
                let text = capture_until(&mut ctx.tok, &[TokenKind::Semicolon])?;
                field.default_value = Some(text);
            }
            TokenKind::Comma => {
                return Err(Error::syntax(
                    ctx.location(token.line),
                    "multiple declarators in one API_FIELD are not supported",
                ));
            }
            _ => return Err(ctx.tok.unexpected(&token, "';'")),
        }
    }

    apply_field_tags(ctx, &mut field, tags);

    let location = ctx.location(line);
    let node = ctx.arena.get_mut(owner);
    match &mut node.kind {
        NodeKind::Class(info) => info.fields.push(field),
        NodeKind::Struct(info) => info.fields.push(field),
        NodeKind::Interface(info) => info.fields.push(field),
        _ => {
            return Err(Error::semantic(
                location,
                format!("'{}' cannot declare fields", node.name),
            ));
        }
    }
    Ok(())
}

fn apply_field_tags(ctx: &ParserContext<'_>, field: &mut FieldInfo, tags: &[TagParam]) {
    for tag in tags {
        if let Some(access) = Access::parse(&tag.name) {
            field.access = access;
            continue;
        }
        match tag.name.as_str() {
            "static" => field.is_static = true,
            "readonly" => field.is_read_only = true,
            "hidden" => field.is_hidden = true,
            "noproxy" => field.no_proxy = true,
            "noarray" => field.no_array = true,
            "attributes" => field.attributes = tag.value.clone(),
            "defaultvalue" => field.default_value = tag.value.clone(),
            "marshalas" => {
                field.marshal_as = tag.value.as_deref().map(parse_type_text);
            }
            other => warn_unknown_tag(ctx, other, tag.value_or_empty()),
        }
    }
}

/// Parse a type spelling given as tag-value text (`Array<float>`, `Actor*`).
fn parse_type_text(text: &str) -> TypeRef {
    let mut tok = apigen_scanner::Tokenizer::new(text, "<tag>");
    parse_type(&mut tok).unwrap_or_else(|_| TypeRef::named(text))
}

// =============================================================================
// Properties
// =============================================================================

/// Parse an `API_PROPERTY` accessor and merge it into its property.
pub fn parse_property(
    ctx: &mut ParserContext<'_>,
    tags: &[TagParam],
    comment: Vec<String>,
    line: u32,
) -> Result<()> {
    let owner = ctx.require_type("API_PROPERTY", line)?;
    let function = parse_function_signature(ctx, tags, comment, line)?;

    let is_getter = function.parameters.is_empty() && !function.return_type.is_void();
    let is_setter = function.parameters.len() == 1 && function.return_type.is_void();
    if !is_getter && !is_setter {
        return Err(Error::semantic(
            ctx.location(line),
            format!(
                "property accessor '{}' must be a getter (no parameters, non-void return) \
                 or a setter (single value parameter, void return)",
                function.name
            ),
        ));
    }

    let Some(property_name) = function
        .name
        .strip_prefix("Get")
        .or_else(|| function.name.strip_prefix("Set"))
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
    else {
        return Err(Error::semantic(
            ctx.location(line),
            format!(
                "property accessor '{}' must be named with a Get or Set prefix",
                function.name
            ),
        ));
    };

    let location = ctx.location(line);
    let node = ctx.arena.get_mut(owner);
    let NodeKind::Class(info) = &mut node.kind else {
        return Err(Error::semantic(
            location,
            format!("'{}' cannot declare properties", node.name),
        ));
    };

    let property = match info.properties.iter_mut().find(|p| p.name == property_name) {
        Some(existing) => existing,
        None => {
            info.properties.push(PropertyInfo {
                name: property_name.clone(),
                access: function.access,
                ..PropertyInfo::default()
            });
            info.properties.last_mut().unwrap()
        }
    };

    if is_getter {
        if property.getter.is_some() {
            return Err(Error::semantic(
                location,
                format!("property '{property_name}' already has a getter"),
            ));
        }
        property.type_ref = function.return_type.clone();
        if property.comment.is_empty() {
            property.comment = function.comment.clone();
        }
        property.getter = Some(function);
    } else {
        if property.setter.is_some() {
            return Err(Error::semantic(
                location,
                format!("property '{property_name}' already has a setter"),
            ));
        }
        if property.getter.is_none() {
            property.type_ref = function.parameters[0].type_ref.clone();
            if property.comment.is_empty() {
                property.comment = function.comment.clone();
            }
        }
        property.setter = Some(function);
    }
    Ok(())
}

// =============================================================================
// Events
// =============================================================================

/// Parse an `API_EVENT` declaration.
pub fn parse_event(
    ctx: &mut ParserContext<'_>,
    tags: &[TagParam],
    comment: Vec<String>,
    line: u32,
) -> Result<()> {
    let owner = ctx.require_type("API_EVENT", line)?;

    let prefixes = parse_prefixes(ctx)?;
    let type_ref = parse_type(&mut ctx.tok)?;

    // Only the closed delegate sum is accepted.
    let signature = match type_ref.type_name.as_str() {
        "Action" if type_ref.generic_args.is_empty() => Vec::new(),
        "Delegate" if !type_ref.generic_args.is_empty() => type_ref.generic_args.clone(),
        _ => {
            return Err(Error::semantic(
                ctx.location(line),
                format!(
                    "event must be declared as Action or Delegate<...>, got '{type_ref}'"
                ),
            ));
        }
    };

    let name = ctx.tok.expect_token(TokenKind::Identifier)?;
    let mut event = EventInfo {
        name: name.text.to_string(),
        is_static: prefixes.is_static,
        signature,
        access: ctx.current_access(),
        comment,
        ..EventInfo::default()
    };
    ctx.tok.expect_token(TokenKind::Semicolon)?;

    for tag in tags {
        if let Some(access) = Access::parse(&tag.name) {
            event.access = access;
            continue;
        }
        match tag.name.as_str() {
            "static" => event.is_static = true,
            "hidden" => event.is_hidden = true,
            "attributes" => event.attributes = tag.value.clone(),
            other => warn_unknown_tag(ctx, other, tag.value_or_empty()),
        }
    }

    let location = ctx.location(line);
    let node = ctx.arena.get_mut(owner);
    let NodeKind::Class(info) = &mut node.kind else {
        return Err(Error::semantic(
            location,
            format!("'{}' cannot declare events", node.name),
        ));
    };
    info.events.push(event);
    Ok(())
}

// =============================================================================
// Shared
// =============================================================================

/// Route an unrecognized tag through the hook, or log a warning.
pub fn warn_unknown_tag(ctx: &ParserContext<'_>, tag: &str, value: &str) {
    if let Some(hook) = ctx.options.unknown_tag_hook {
        if hook(tag, value) {
            return;
        }
    }
    tracing::warn!(
        "{}: unknown tag '{tag}' ignored",
        ctx.location(ctx.tok.line())
    );
}
