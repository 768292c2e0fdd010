//! Token kinds and the token value type.

/// The kind of a lexed token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `[A-Za-z_][A-Za-z0-9_]*`
    Identifier,
    /// Integer or floating literal, including hex and type suffixes.
    Number,
    /// Double-quoted string literal with backslash escapes.
    String,
    /// `// ...` up to end of line (text excludes the newline).
    CommentSingleLine,
    /// `/* ... */` including the delimiters.
    CommentMultiLine,
    /// `#` starting a preprocessor directive.
    Preprocessor,
    /// A single `\n` (or `\r\n`).
    Newline,
    /// A run of spaces/tabs.
    Whitespace,

    // Punctuation
    LeftParent,
    RightParent,
    LeftCurlyBrace,
    RightCurlyBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Semicolon,
    Colon,
    /// `::`
    DoubleColon,
    LeftAngleBracket,
    RightAngleBracket,
    And,
    Multiply,
    Equal,
    Sub,
    Add,
    Or,
    Dot,

    /// Any other single character.
    Unknown,
    /// End of the source text.
    EndOfFile,
}

impl TokenKind {
    /// Human-readable name used in "expected X, got Y" diagnostics.
    pub const fn describe(self) -> &'static str {
        match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Number => "number",
            TokenKind::String => "string literal",
            TokenKind::CommentSingleLine => "comment",
            TokenKind::CommentMultiLine => "comment",
            TokenKind::Preprocessor => "'#'",
            TokenKind::Newline => "end of line",
            TokenKind::Whitespace => "whitespace",
            TokenKind::LeftParent => "'('",
            TokenKind::RightParent => "')'",
            TokenKind::LeftCurlyBrace => "'{'",
            TokenKind::RightCurlyBrace => "'}'",
            TokenKind::LeftBracket => "'['",
            TokenKind::RightBracket => "']'",
            TokenKind::Comma => "','",
            TokenKind::Semicolon => "';'",
            TokenKind::Colon => "':'",
            TokenKind::DoubleColon => "'::'",
            TokenKind::LeftAngleBracket => "'<'",
            TokenKind::RightAngleBracket => "'>'",
            TokenKind::And => "'&'",
            TokenKind::Multiply => "'*'",
            TokenKind::Equal => "'='",
            TokenKind::Sub => "'-'",
            TokenKind::Add => "'+'",
            TokenKind::Or => "'|'",
            TokenKind::Dot => "'.'",
            TokenKind::Unknown => "token",
            TokenKind::EndOfFile => "end of file",
        }
    }
}

/// A lexed token: kind, exact source text, and 1-based line number.
///
/// The text borrows from the source buffer; tokens are cheap to copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub line: u32,
}

impl<'a> Token<'a> {
    pub const fn new(kind: TokenKind, text: &'a str, line: u32) -> Self {
        Token { kind, text, line }
    }

    /// The end-of-file token, reused after the source is exhausted.
    pub const fn eof(line: u32) -> Self {
        Token::new(TokenKind::EndOfFile, "", line)
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// True for identifier tokens with exactly this text.
    pub fn is_ident(&self, text: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == text
    }
}
