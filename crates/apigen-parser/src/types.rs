//! Parsing of type spellings.
//!
//! Covers the subset of C++ type syntax reachable from API declarations:
//! `const`, qualified names (`A::B`), generic argument lists, pointers,
//! lvalue/rvalue references, and `Function<Ret(Args)>` signatures whose
//! parenthesized part is kept as spelling text.

use apigen_common::Result;
use apigen_model::TypeRef;
use apigen_scanner::{TokenKind, Tokenizer};

/// Parse a type reference starting at the current token.
pub fn parse_type(tok: &mut Tokenizer<'_>) -> Result<TypeRef> {
    let mut type_ref = TypeRef::default();

    // Leading qualifiers.
    loop {
        let token = tok.next_token()?;
        match token.kind {
            TokenKind::Identifier => match token.text {
                "const" => type_ref.is_const = true,
                "volatile" | "typename" => {}
                "unsigned" | "signed" => {
                    type_ref.type_name = normalize_plain_int(tok, token.text == "unsigned")?;
                    break;
                }
                other => {
                    type_ref.type_name = normalize_primitive(other).to_string();
                    break;
                }
            },
            _ => return Err(tok.unexpected(&token, "type name")),
        }
    }

    // Qualified name segments.
    loop {
        let token = tok.next_token()?;
        if token.kind == TokenKind::DoubleColon {
            let segment = tok.expect_token(TokenKind::Identifier)?;
            type_ref.type_name.push_str("::");
            type_ref.type_name.push_str(segment.text);
        } else {
            tok.rewind(token);
            break;
        }
    }

    // Generic arguments.
    let token = tok.next_token()?;
    if token.kind == TokenKind::LeftAngleBracket {
        loop {
            let mut arg = parse_type(tok)?;
            // A function signature argument keeps its parenthesized part as
            // spelling text (`Function<void(Actor*)>`).
            let next = tok.next_token()?;
            if next.kind == TokenKind::LeftParent {
                arg.type_name.push('(');
                capture_balanced_parens(tok, &mut arg.type_name)?;
            } else {
                tok.rewind(next);
            }
            type_ref.generic_args.push(arg);

            let token = tok.next_token()?;
            match token.kind {
                TokenKind::Comma => continue,
                TokenKind::RightAngleBracket => break,
                _ => return Err(tok.unexpected(&token, "',' or '>'")),
            }
        }
    } else {
        tok.rewind(token);
    }

    // Trailing qualifiers.
    loop {
        let token = tok.next_token()?;
        match token.kind {
            TokenKind::Multiply => type_ref.is_ptr = true,
            TokenKind::And => {
                if type_ref.is_ref {
                    type_ref.is_ref = false;
                    type_ref.is_move_ref = true;
                } else {
                    type_ref.is_ref = true;
                }
            }
            TokenKind::Identifier if token.text == "const" => type_ref.is_const = true,
            _ => {
                tok.rewind(token);
                break;
            }
        }
    }

    Ok(type_ref)
}

/// Map plain C++ integer spellings to the sized in-build primitives.
fn normalize_primitive(name: &str) -> &str {
    match name {
        "int" => "int32",
        "short" => "int16",
        _ => name,
    }
}

/// `unsigned`/`signed` followed by an optional width keyword.
fn normalize_plain_int(tok: &mut Tokenizer<'_>, unsigned: bool) -> Result<String> {
    let token = tok.next_token()?;
    let width = if token.kind == TokenKind::Identifier {
        match token.text {
            "int" => "32",
            "short" => "16",
            "char" => "8",
            _ => {
                tok.rewind(token);
                "32"
            }
        }
    } else {
        tok.rewind(token);
        "32"
    };
    Ok(if unsigned {
        format!("uint{width}")
    } else {
        format!("int{width}")
    })
}

/// Append tokens to `out` until the parenthesis opened by the caller
/// closes, including the final `)`.
fn capture_balanced_parens(tok: &mut Tokenizer<'_>, out: &mut String) -> Result<()> {
    let mut depth = 1u32;
    loop {
        let token = tok.next_token()?;
        match token.kind {
            TokenKind::LeftParent => depth += 1,
            TokenKind::RightParent => depth -= 1,
            TokenKind::EndOfFile => return Err(tok.unexpected(&token, "')'")),
            _ => {}
        }
        out.push_str(token.text);
        if depth == 0 {
            return Ok(());
        }
    }
}

/// Capture raw source text until a top-level token of one of the given
/// kinds. The terminator is rewound, not consumed. Nesting of `()`, `[]`,
/// and `{}` hides terminators inside; angle brackets are left alone so
/// shift expressions (`1 << 2`) capture correctly.
pub fn capture_until(tok: &mut Tokenizer<'_>, terminators: &[TokenKind]) -> Result<String> {
    let start = tok.capture_offset();
    let mut end = start;
    let mut depth = 0u32;
    loop {
        let token = tok.next_token()?;
        if depth == 0 && terminators.contains(&token.kind) {
            tok.rewind(token);
            break;
        }
        match token.kind {
            TokenKind::LeftParent | TokenKind::LeftBracket | TokenKind::LeftCurlyBrace => {
                depth += 1;
            }
            TokenKind::RightParent | TokenKind::RightBracket | TokenKind::RightCurlyBrace => {
                depth = depth.saturating_sub(1);
            }
            TokenKind::EndOfFile => return Err(tok.unexpected(&token, "expression")),
            _ => {}
        }
        end = tok.capture_offset();
    }
    Ok(tok.source()[start..end].trim().to_string())
}
