//! CLI driver for the apigen bindings generator.
//!
//! Loads a JSON build manifest describing the modules to scan, then runs
//! the parse → analyze → cache → emit pipeline per module.

pub mod args;
pub mod config;
pub mod driver;

pub use driver::{BindingsResult, run_build};
