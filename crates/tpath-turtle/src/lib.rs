//! The turtle host for the tpath language.
//!
//! This crate is the external collaborator the execution engine drives: a 2-D
//! turtle over an affine matrix stack that emits the contents of an SVG
//! `path` element.
//!
//! - [`PathTurtle`] — the turtle state machine and all drawing commands
//! - [`TurtleOp`] — the fixed-arity builtin command set, dispatched by match
//! - [`PathWriter`] / [`OutputSink`] — path-data formatting over a shared sink
//! - [`SvgConfig`] — the optional `<svg>` document envelope

pub mod error;
pub mod math;
pub mod matrix;
pub mod ops;
pub mod svg;
pub mod turtle;
pub mod writer;

pub use error::TurtleError;
pub use matrix::Matrix2d;
pub use ops::TurtleOp;
pub use svg::SvgConfig;
pub use turtle::{PathTurtle, TurtleSnapshot};
pub use writer::{BufferHandle, OutputFormat, OutputSink, PathWriter};
