//! Tag-driven C++ header parser for the apigen bindings generator.
//!
//! The parser drives the tokenizer over one header at a time, looking for
//! `API_*` constructs and modeling only what they reach. Everything else is
//! consumed as opaque tokens; braces and access labels are still tracked so
//! members attach to the right type with the right access level.
//!
//! Each header parses into a scratch arena rooted at a `File` node, which
//! the driver grafts into the build arena. This keeps parallel parsing free
//! of shared mutable state.

pub mod comments;
pub mod preprocessor;
pub use preprocessor::ExternalDefines;

pub mod tags;
pub use tags::TagParam;

pub mod context;
pub use context::{ParseOptions, ParserContext};

pub mod types;

mod constructs;
mod members;
mod parser;

pub use parser::parse_header;
