//! Common types and utilities for the apigen bindings generator.
//!
//! This crate provides foundational types used across all apigen crates:
//! - Source locations (`SourceLocation`) in click-through form
//! - Error/diagnostic types (`Error`, `ErrorKind`, `Result`)
//! - Binary reader/writer primitives for the module cache protocol
//! - Centralized limits and thresholds

// Source locations for diagnostics
pub mod location;
pub use location::SourceLocation;

// Error and diagnostic types
pub mod diagnostics;
pub use diagnostics::{Error, ErrorKind, Result};

// Binary serialization primitives for the cache protocol
pub mod binary;
pub use binary::{BinaryReader, BinaryWriter};

// Centralized limits and thresholds
pub mod limits;
