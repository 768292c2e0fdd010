//! Tag-parameter lists.
//!
//! Every `API_*` token is followed by a parenthesized list of parameters:
//! `(tag[=value], ...)`. Values are unquoted identifiers/numbers or
//! double-quoted strings with `\"` unescaping, optionally followed by a `*`
//! or `<...>` suffix appended to the value. Tag names match
//! case-insensitively.

use apigen_scanner::{TokenKind, Tokenizer};

use apigen_common::Result;

/// One parsed tag parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagParam {
    /// Lower-cased tag name.
    pub name: String,
    /// Raw value text, unescaped when it was quoted.
    pub value: Option<String>,
}

impl TagParam {
    pub fn new(name: &str, value: Option<String>) -> Self {
        TagParam {
            name: name.to_ascii_lowercase(),
            value,
        }
    }

    pub fn value_or_empty(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

/// Parse the `(tag[=value], ...)` list that follows an `API_*` token.
pub fn parse_tag_params(tok: &mut Tokenizer<'_>) -> Result<Vec<TagParam>> {
    tok.expect_token(TokenKind::LeftParent)?;
    let mut params = Vec::new();

    loop {
        let token = tok.next_token()?;
        match token.kind {
            TokenKind::RightParent => break,
            TokenKind::Comma => continue,
            TokenKind::Identifier | TokenKind::Number => {
                let name = token.text.to_string();
                let next = tok.next_token()?;
                if next.kind == TokenKind::Equal {
                    let value = parse_tag_value(tok)?;
                    params.push(TagParam::new(&name, Some(value)));
                } else {
                    tok.rewind(next);
                    params.push(TagParam::new(&name, None));
                }
            }
            _ => return Err(tok.unexpected(&token, "tag parameter")),
        }
    }

    Ok(params)
}

/// Parse a tag value after `=`.
fn parse_tag_value(tok: &mut Tokenizer<'_>) -> Result<String> {
    let token = tok.next_token()?;
    let mut value = match token.kind {
        TokenKind::String => unescape(token.text),
        TokenKind::Identifier | TokenKind::Number => token.text.to_string(),
        TokenKind::Sub => {
            // Negative number literal.
            let number = tok.expect_token(TokenKind::Number)?;
            format!("-{}", number.text)
        }
        _ => return Err(tok.unexpected(&token, "tag value")),
    };

    // `tag=key=value` style: a nested `=` extends the value.
    loop {
        let next = tok.next_token()?;
        match next.kind {
            TokenKind::Equal => {
                value.push('=');
                let part = tok.next_token()?;
                match part.kind {
                    TokenKind::String => value.push_str(&unescape(part.text)),
                    TokenKind::Identifier | TokenKind::Number => value.push_str(part.text),
                    _ => return Err(tok.unexpected(&part, "tag value")),
                }
            }
            // Pointer or template suffix sticks to the value.
            TokenKind::Multiply => value.push('*'),
            TokenKind::LeftAngleBracket => {
                value.push('<');
                let mut depth = 1u32;
                while depth > 0 {
                    let part = tok.next_token()?;
                    match part.kind {
                        TokenKind::LeftAngleBracket => depth += 1,
                        TokenKind::RightAngleBracket => depth -= 1,
                        TokenKind::EndOfFile => {
                            return Err(tok.unexpected(&part, "'>'"));
                        }
                        _ => {}
                    }
                    if depth > 0 || part.kind == TokenKind::RightAngleBracket {
                        value.push_str(part.text);
                    }
                }
            }
            _ => {
                tok.rewind(next);
                break;
            }
        }
    }

    Ok(value)
}

/// Strip quotes and resolve `\"` / `\\` escapes.
fn unescape(quoted: &str) -> String {
    let inner = quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(quoted);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
