//! C++ header tokenizer for the apigen bindings generator.
//!
//! This is not a full C++ lexer. It produces exactly the token stream the
//! tag-driven parser needs: identifiers, numbers, string literals, comments,
//! preprocessor markers, and single-character punctuation, each carrying its
//! source text and line number. Whitespace and newlines are skipped by
//! default but can be requested explicitly (preprocessor directives end at a
//! newline).

pub mod token;
pub use token::{Token, TokenKind};

pub mod tokenizer;
pub use tokenizer::Tokenizer;
