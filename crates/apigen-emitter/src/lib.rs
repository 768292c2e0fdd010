//! Native glue emitter.
//!
//! For each module this crate produces one C++ source that registers every
//! exported type with the scripting runtime: method wrappers bridging the
//! marshalling ABI, managed mirrors and converters for non-POD structs,
//! event bridges, virtual-dispatch trampolines with a re-entrancy guard, a
//! runtime-init block of internal calls, and per-type initializers. A small
//! binary-module descriptor pair is emitted alongside.
//!
//! Output is deterministic: traversal follows source order, includes are
//! sorted, and emitting twice from one model is byte-identical.

pub mod writer;
pub use writer::SourceWriter;

pub mod abi;

pub mod native;
pub use native::{NativeGlueEmitter, emit_native_module};

pub mod descriptor;
pub use descriptor::emit_binary_module_descriptor;

pub mod output;
pub use output::write_if_changed;
