//! Type resolution and semantic analysis for the apigen bindings generator.
//!
//! Two pieces live here:
//! - `BuildContext` - the build-wide arena plus the type resolver: in-build
//!   primitives, scoped/global/nested lookup, typedef inflation with a
//!   recursion guard, and a memo cache keyed by spelling.
//! - `Analyzer` - the post-parse initialization pass: scripting-object
//!   ancestry, POD computation, accessor synthesis, property validation,
//!   unique-name assignment, script-vtable layout, and the ordered
//!   auto-serialization lists.

pub mod inbuild;

pub mod resolver;
pub use resolver::BuildContext;

pub mod analyzer;
pub use analyzer::Analyzer;
