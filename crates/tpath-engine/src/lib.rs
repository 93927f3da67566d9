//! The tpath execution engine.
//!
//! The engine is not a bytecode interpreter: the parser drives the compile
//! API ([`Engine::compile_push_value`] and friends) while parsing, and the
//! engine assembles the program as chunks of pre-bound statements whose
//! stack offsets were computed by simulating the runtime stacks at parse
//! time. Executing a chunk is a plain match-and-dispatch over the statement
//! variants.
//!
//! - [`stack`] / [`frames`] — the dual frame stack (locals + captures)
//! - [`expr`] — the constant-folding expression tree
//! - [`chunk`] — chunks and the statement op set
//! - [`engine`] — the compile API and `execute_main`
//! - [`debug`] — engine locations and the debug sink traits

pub mod chunk;
pub mod debug;
pub mod engine;
pub mod error;
mod exec;
pub mod expr;
pub mod frames;
pub mod stack;

pub use chunk::{Chunk, Statement, ValueDomain};
pub use debug::{EngineDebugSink, EngineLocation, ParserDebugSink, TraceInfo, NO_CHUNK};
pub use engine::Engine;
pub use error::RuntimeError;
pub use expr::{BinaryOp, Expr, UnaryOp};
pub use frames::{EngineStack, StackSize};
pub use stack::FrameStack;
