//! The main parse loop: scan for `API_*` tokens, track scopes and access
//! labels between them, and interpret the minimal preprocessor subset.

use apigen_common::{Error, Result, limits};
use apigen_model::{Access, ApiArena, NodeIndex};
use apigen_scanner::TokenKind;
use tracing::debug;

use crate::comments::collect_comment;
use crate::constructs::{
    TypeConstruct, parse_auto_serialization, parse_enum, parse_inject_code, parse_type_construct,
    parse_typedef,
};
use crate::context::{ParseOptions, ParserContext};
use crate::members::{parse_event, parse_field, parse_function, parse_property, warn_unknown_tag};
use crate::preprocessor::{evaluate, is_defined};
use crate::tags::parse_tag_params;

/// Parse one header into a scratch arena rooted at a `File` node.
///
/// Errors carry the header path and line; the caller decides whether the
/// module survives.
pub fn parse_header(
    source: &str,
    file_path: &str,
    options: &ParseOptions,
) -> Result<(ApiArena, NodeIndex)> {
    debug!("parsing {file_path}");
    let mut ctx = ParserContext::new(source, file_path, options);
    run(&mut ctx)?;
    let ParserContext { arena, file, .. } = ctx;
    Ok((arena, file))
}

fn run(ctx: &mut ParserContext<'_>) -> Result<()> {
    loop {
        let token = ctx.tok.next_token()?;
        match token.kind {
            TokenKind::EndOfFile => {
                if !ctx.scopes.is_empty() {
                    return Err(Error::syntax(
                        ctx.location(token.line),
                        format!("{} unclosed brace(s) at end of file", ctx.scopes.len()),
                    ));
                }
                return Ok(());
            }
            TokenKind::Preprocessor => handle_directive(ctx)?,
            TokenKind::LeftCurlyBrace => {
                if ctx.scopes.len() >= limits::MAX_SCOPE_DEPTH {
                    return Err(Error::syntax(
                        ctx.location(token.line),
                        "brace nesting too deep",
                    ));
                }
                ctx.push_scope(None, ctx.current_access());
            }
            TokenKind::RightCurlyBrace => {
                ctx.pop_scope(token.line)?;
            }
            TokenKind::Identifier => {
                if let Some(access) = Access::parse(token.text) {
                    // `public:` / `protected:` / `private:` labels.
                    let next = ctx.tok.next_token()?;
                    if next.kind == TokenKind::Colon {
                        ctx.set_access(access);
                    } else {
                        ctx.tok.rewind(next);
                    }
                } else if token.text.starts_with("API_") {
                    dispatch(ctx, token.text, token.line)?;
                }
            }
            _ => {}
        }
    }
}

/// Dispatch one `API_*` construct.
fn dispatch(ctx: &mut ParserContext<'_>, name: &str, line: u32) -> Result<()> {
    // Constructs without a tag-parameter list first.
    match name {
        "API_INJECT_CODE" => return parse_inject_code(ctx, line),
        "API_AUTO_SERIALIZATION" => return parse_auto_serialization(ctx, line),
        _ => {}
    }

    let comment = collect_comment(&ctx.lines, line);
    let tags = parse_tag_params(&mut ctx.tok)?;

    match name {
        "API_CLASS" => parse_type_construct(ctx, TypeConstruct::Class, &tags, comment, line),
        "API_STRUCT" => parse_type_construct(ctx, TypeConstruct::Struct, &tags, comment, line),
        "API_INTERFACE" => {
            parse_type_construct(ctx, TypeConstruct::Interface, &tags, comment, line)
        }
        "API_ENUM" => parse_enum(ctx, &tags, comment, line),
        "API_FUNCTION" => parse_function(ctx, &tags, comment, line),
        "API_PROPERTY" => parse_property(ctx, &tags, comment, line),
        "API_FIELD" => parse_field(ctx, &tags, comment, line),
        "API_EVENT" => parse_event(ctx, &tags, comment, line),
        "API_TYPEDEF" => parse_typedef(ctx, &tags, comment, line),
        other => {
            // Unknown API tokens are ignored after their parameter list, so
            // project-specific macros do not break parsing.
            warn_unknown_tag(ctx, other, "");
            Ok(())
        }
    }
}

// =============================================================================
// Preprocessor directives
// =============================================================================

fn handle_directive(ctx: &mut ParserContext<'_>) -> Result<()> {
    let token = ctx.tok.next_token_on_line()?;
    if token.kind != TokenKind::Identifier {
        // `#` on its own line, or something exotic.
        if token.kind != TokenKind::Newline && token.kind != TokenKind::EndOfFile {
            skip_to_newline(ctx)?;
        }
        return Ok(());
    }

    match token.text {
        "define" => {
            let name = ctx.tok.next_token_on_line()?;
            if name.kind == TokenKind::Identifier {
                let name = name.text.to_string();
                let value = capture_line(ctx)?;
                ctx.defines.insert(name, value);
            } else if name.kind != TokenKind::Newline {
                skip_to_newline(ctx)?;
            }
        }
        "if" => {
            let condition = capture_line(ctx)?;
            if !evaluate(&condition, &ctx.defines, &ctx.options.external_defines) {
                skip_inactive_branch(ctx)?;
            }
        }
        "ifdef" => {
            let name = ctx.tok.next_token_on_line()?;
            let defined = name.kind == TokenKind::Identifier
                && is_defined(name.text, &ctx.defines, &ctx.options.external_defines);
            if name.kind != TokenKind::Newline {
                skip_to_newline(ctx)?;
            }
            if !defined {
                skip_inactive_branch(ctx)?;
            }
        }
        // `#ifndef` (include guards), `#endif` of an active block, `#else`,
        // `#include`, `#pragma`, ...: uninterpreted.
        _ => skip_to_newline(ctx)?,
    }
    Ok(())
}

/// Capture the raw remainder of the directive line, without trailing
/// comments.
fn capture_line(ctx: &mut ParserContext<'_>) -> Result<String> {
    let start = ctx.tok.capture_offset();
    let mut end = start;
    loop {
        let token = ctx.tok.lex()?;
        match token.kind {
            TokenKind::Newline | TokenKind::EndOfFile => break,
            TokenKind::CommentSingleLine | TokenKind::CommentMultiLine => {}
            _ => end = ctx.tok.capture_offset(),
        }
    }
    Ok(ctx.tok.source()[start..end].trim().to_string())
}

fn skip_to_newline(ctx: &mut ParserContext<'_>) -> Result<()> {
    loop {
        let token = ctx.tok.lex()?;
        if matches!(token.kind, TokenKind::Newline | TokenKind::EndOfFile) {
            return Ok(());
        }
    }
}

/// Skip an inactive `#if`/`#ifdef` branch, balancing nested conditionals.
fn skip_inactive_branch(ctx: &mut ParserContext<'_>) -> Result<()> {
    let start = ctx.location(ctx.tok.line());
    let mut depth = 1usize;
    loop {
        let token = ctx.tok.lex()?;
        match token.kind {
            TokenKind::EndOfFile => {
                return Err(Error::syntax(start, "unterminated #if block"));
            }
            TokenKind::Preprocessor => {
                let directive = ctx.tok.next_token_on_line()?;
                if directive.kind == TokenKind::Identifier {
                    match directive.text {
                        "if" | "ifdef" | "ifndef" => {
                            depth += 1;
                            if depth > limits::MAX_PREPROCESSOR_DEPTH {
                                return Err(Error::syntax(start, "#if nesting too deep"));
                            }
                        }
                        "endif" => {
                            depth -= 1;
                            if depth == 0 {
                                return skip_to_newline(ctx);
                            }
                        }
                        _ => {}
                    }
                }
                if directive.kind != TokenKind::Newline && directive.kind != TokenKind::EndOfFile {
                    skip_to_newline(ctx)?;
                }
            }
            _ => {}
        }
    }
}
