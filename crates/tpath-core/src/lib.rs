//! Core types for the tpath language.
//!
//! This crate provides the foundational types shared by the compiler and
//! runtime:
//! - Source positions and file-qualified locations
//! - Diagnostics and severity levels

pub mod diagnostic;
pub mod location;

pub use diagnostic::{Diagnostic, Severity};
pub use location::{Location, SourceFileLocation, SourceLocation};
