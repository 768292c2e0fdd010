//! Centralized limits and thresholds.
//!
//! Kept in one place so parser, binder, and cache agree on the bounds they
//! enforce.

/// Maximum nesting depth of braces the parser will track before giving up.
pub const MAX_SCOPE_DEPTH: usize = 128;

/// Maximum nesting depth of generic argument lists in a single `TypeRef`.
pub const MAX_GENERIC_DEPTH: usize = 16;

/// Maximum nesting depth of skipped `#if`/`#endif` blocks.
pub const MAX_PREPROCESSOR_DEPTH: usize = 64;

/// Maximum recursion depth when reading cached node trees.
pub const MAX_NODE_DEPTH: usize = 64;

/// Widest bit-field the model accepts. Wider bit-fields are rejected with a
/// precise error rather than guessed at.
pub const MAX_BIT_FIELD_SIZE: u32 = 1;
