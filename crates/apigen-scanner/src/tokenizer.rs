//! The tokenizer.
//!
//! Produces tokens on demand with one-deep rewind. The rewound token is held
//! as a saved value together with its start offset, so rewinding never
//! re-reads source bytes and `skip_until` capture stays exact.

use std::sync::Arc;

use apigen_common::{Error, Result, SourceLocation};
use memchr::memchr;

use crate::token::{Token, TokenKind};

/// Streaming tokenizer over a single header's text.
pub struct Tokenizer<'a> {
    source: &'a str,
    file: Arc<str>,
    /// Byte offset of the next unread character.
    pos: usize,
    /// 1-based line of the next unread character.
    line: u32,
    /// One-deep rewind slot: the token and the byte offset it started at.
    rewound: Option<(Token<'a>, usize)>,
    /// Byte offset where the most recently returned token started.
    last_start: usize,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer for one header.
    pub fn new(source: &'a str, file: impl Into<Arc<str>>) -> Self {
        Tokenizer {
            source,
            file: file.into(),
            pos: 0,
            line: 1,
            rewound: None,
            last_start: 0,
        }
    }

    /// The full source text this tokenizer reads.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// The current 1-based line number.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Location of the current read position.
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(Arc::clone(&self.file), self.line)
    }

    // =========================================================================
    // Token stream
    // =========================================================================

    /// Next token, skipping whitespace, newlines, and comments.
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        loop {
            let token = self.lex()?;
            match token.kind {
                TokenKind::Whitespace
                | TokenKind::Newline
                | TokenKind::CommentSingleLine
                | TokenKind::CommentMultiLine => continue,
                _ => return Ok(token),
            }
        }
    }

    /// Next token, skipping only whitespace.
    ///
    /// Newlines come through, which is what terminates a preprocessor
    /// directive.
    pub fn next_token_on_line(&mut self) -> Result<Token<'a>> {
        loop {
            let token = self.lex()?;
            if token.kind != TokenKind::Whitespace {
                return Ok(token);
            }
        }
    }

    /// Look at the next significant token without consuming it.
    pub fn peek_token(&mut self) -> Result<Token<'a>> {
        let token = self.next_token()?;
        self.rewind(token);
        Ok(token)
    }

    /// Push a token back. Depth one: pushing twice without an intervening
    /// read is a logic error and panics in debug builds.
    pub fn rewind(&mut self, token: Token<'a>) {
        debug_assert!(self.rewound.is_none(), "tokenizer rewind depth exceeded");
        self.rewound = Some((token, self.last_start));
    }

    /// Consume the next significant token and require it to be `kind`.
    pub fn expect_token(&mut self, kind: TokenKind) -> Result<Token<'a>> {
        let token = self.next_token()?;
        if token.kind == kind {
            Ok(token)
        } else {
            Err(self.unexpected(&token, kind.describe()))
        }
    }

    /// Consume the next significant token and require an exact identifier.
    pub fn expect_ident(&mut self, text: &str) -> Result<Token<'a>> {
        let token = self.next_token()?;
        if token.is_ident(text) {
            Ok(token)
        } else {
            Err(self.unexpected(&token, &format!("'{text}'")))
        }
    }

    /// Skip tokens until one of kind `kind` has been consumed.
    pub fn skip_until(&mut self, kind: TokenKind) -> Result<Token<'a>> {
        loop {
            let token = self.next_token()?;
            if token.kind == kind {
                return Ok(token);
            }
            if token.kind == TokenKind::EndOfFile {
                return Err(self.unexpected(&token, kind.describe()));
            }
        }
    }

    /// Skip tokens until `kind`, returning the elided source text verbatim
    /// (everything between the current position and the target token).
    pub fn skip_until_captured(&mut self, kind: TokenKind) -> Result<(Token<'a>, String)> {
        let start = self.pos_for_capture();
        loop {
            let before = self.pos_for_capture();
            let token = self.next_token()?;
            if token.kind == kind {
                let text = self.source[start..before].trim().to_string();
                return Ok((token, text));
            }
            if token.kind == TokenKind::EndOfFile {
                return Err(self.unexpected(&token, kind.describe()));
            }
        }
    }

    /// A syntax error pointing at the given token.
    pub fn unexpected(&self, token: &Token<'a>, expected: &str) -> Error {
        let found = match token.kind {
            TokenKind::EndOfFile => "end of file".to_string(),
            _ => format!("'{}'", token.text),
        };
        Error::syntax(
            SourceLocation::new(Arc::clone(&self.file), token.line),
            format!("expected {expected}, got {found}"),
        )
    }

    /// Byte offset the next returned token will start at (accounts for a
    /// rewound token). Callers slicing `source()` use this to capture raw
    /// text spans, e.g. default-value expressions.
    pub fn capture_offset(&self) -> usize {
        self.pos_for_capture()
    }

    fn pos_for_capture(&self) -> usize {
        match &self.rewound {
            Some((_, start)) => *start,
            None => self.pos,
        }
    }

    // =========================================================================
    // Lexing
    // =========================================================================

    /// Lex the next raw token, including whitespace, newlines, and comments.
    pub fn lex(&mut self) -> Result<Token<'a>> {
        if let Some((token, start)) = self.rewound.take() {
            self.last_start = start;
            return Ok(token);
        }

        let bytes = self.source.as_bytes();
        self.last_start = self.pos;
        let start = self.pos;
        let line = self.line;

        let Some(&c) = bytes.get(self.pos) else {
            return Ok(Token::eof(line));
        };

        match c {
            b'\n' => {
                self.pos += 1;
                self.line += 1;
                Ok(self.token(TokenKind::Newline, start, line))
            }
            b'\r' => {
                self.pos += 1;
                if bytes.get(self.pos) == Some(&b'\n') {
                    self.pos += 1;
                }
                self.line += 1;
                Ok(self.token(TokenKind::Newline, start, line))
            }
            b' ' | b'\t' => {
                while matches!(bytes.get(self.pos), Some(b' ' | b'\t')) {
                    self.pos += 1;
                }
                Ok(self.token(TokenKind::Whitespace, start, line))
            }
            b'/' => match bytes.get(self.pos + 1) {
                Some(b'/') => {
                    let rest = &bytes[self.pos..];
                    let len = memchr(b'\n', rest).unwrap_or(rest.len());
                    self.pos += len;
                    Ok(self.token(TokenKind::CommentSingleLine, start, line))
                }
                Some(b'*') => self.lex_multi_line_comment(start, line),
                _ => {
                    self.pos += 1;
                    Ok(self.token(TokenKind::Unknown, start, line))
                }
            },
            b'"' => self.lex_string(start, line),
            b'#' => {
                self.pos += 1;
                Ok(self.token(TokenKind::Preprocessor, start, line))
            }
            b':' => {
                self.pos += 1;
                if bytes.get(self.pos) == Some(&b':') {
                    self.pos += 1;
                    Ok(self.token(TokenKind::DoubleColon, start, line))
                } else {
                    Ok(self.token(TokenKind::Colon, start, line))
                }
            }
            b'(' => self.single(TokenKind::LeftParent, start, line),
            b')' => self.single(TokenKind::RightParent, start, line),
            b'{' => self.single(TokenKind::LeftCurlyBrace, start, line),
            b'}' => self.single(TokenKind::RightCurlyBrace, start, line),
            b'[' => self.single(TokenKind::LeftBracket, start, line),
            b']' => self.single(TokenKind::RightBracket, start, line),
            b',' => self.single(TokenKind::Comma, start, line),
            b';' => self.single(TokenKind::Semicolon, start, line),
            b'<' => self.single(TokenKind::LeftAngleBracket, start, line),
            b'>' => self.single(TokenKind::RightAngleBracket, start, line),
            b'&' => self.single(TokenKind::And, start, line),
            b'*' => self.single(TokenKind::Multiply, start, line),
            b'=' => self.single(TokenKind::Equal, start, line),
            b'-' => self.single(TokenKind::Sub, start, line),
            b'+' => self.single(TokenKind::Add, start, line),
            b'|' => self.single(TokenKind::Or, start, line),
            b'.' => self.single(TokenKind::Dot, start, line),
            b'0'..=b'9' => self.lex_number(start, line),
            b'A'..=b'Z' | b'a'..=b'z' | b'_' => {
                while matches!(
                    bytes.get(self.pos),
                    Some(b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_')
                ) {
                    self.pos += 1;
                }
                Ok(self.token(TokenKind::Identifier, start, line))
            }
            _ => {
                // Advance over one UTF-8 scalar so multi-byte characters in
                // stray text cannot wedge the scanner.
                let ch_len = self.source[self.pos..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
                self.pos += ch_len;
                Ok(self.token(TokenKind::Unknown, start, line))
            }
        }
    }

    fn single(&mut self, kind: TokenKind, start: usize, line: u32) -> Result<Token<'a>> {
        self.pos += 1;
        Ok(self.token(kind, start, line))
    }

    fn token(&self, kind: TokenKind, start: usize, line: u32) -> Token<'a> {
        Token::new(kind, &self.source[start..self.pos], line)
    }

    fn lex_number(&mut self, start: usize, line: u32) -> Result<Token<'a>> {
        let bytes = self.source.as_bytes();
        // Digits, hex digits, suffixes, and dots; an exponent may carry a
        // sign directly after 'e'/'E'.
        while let Some(&c) = bytes.get(self.pos) {
            match c {
                b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'_' => self.pos += 1,
                b'+' | b'-' if matches!(bytes.get(self.pos - 1), Some(b'e' | b'E')) => {
                    self.pos += 1;
                }
                _ => break,
            }
        }
        Ok(self.token(TokenKind::Number, start, line))
    }

    fn lex_string(&mut self, start: usize, line: u32) -> Result<Token<'a>> {
        let bytes = self.source.as_bytes();
        self.pos += 1; // opening quote
        while let Some(&c) = bytes.get(self.pos) {
            match c {
                b'"' => {
                    self.pos += 1;
                    return Ok(self.token(TokenKind::String, start, line));
                }
                b'\\' => {
                    // Escape: skip the next character too.
                    self.pos += 2;
                }
                b'\n' => break,
                _ => self.pos += 1,
            }
        }
        Err(Error::syntax(
            SourceLocation::new(Arc::clone(&self.file), line),
            "unterminated string literal",
        ))
    }

    fn lex_multi_line_comment(&mut self, start: usize, line: u32) -> Result<Token<'a>> {
        let bytes = self.source.as_bytes();
        self.pos += 2; // "/*"
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'*' if bytes.get(self.pos + 1) == Some(&b'/') => {
                    self.pos += 2;
                    return Ok(self.token(TokenKind::CommentMultiLine, start, line));
                }
                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
        Err(Error::syntax(
            SourceLocation::new(Arc::clone(&self.file), line),
            "unterminated multi-line comment",
        ))
    }
}
