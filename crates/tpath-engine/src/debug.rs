//! Engine locations and the debug sink traits.
//!
//! The engine reports compile-time and runtime events to an
//! [`EngineDebugSink`]; the parser reports source cursor movement to a
//! [`ParserDebugSink`]. A debugger implements both and correlates them: the
//! parser stamps a source location, the engine announces the statement that
//! location belongs to.

use std::cell::RefCell;
use std::rc::Rc;

use tpath_core::SourceLocation;
use tpath_turtle::TurtleSnapshot;

/// Sentinel chunk index meaning "no chunk".
pub const NO_CHUNK: usize = usize::MAX;

/// A position inside the compiled program: which chunk, which statement.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct EngineLocation {
    pub chunk: usize,
    pub statement: usize,
}

impl EngineLocation {
    pub fn new(chunk: usize, statement: usize) -> Self {
        Self { chunk, statement }
    }

    pub fn none() -> Self {
        Self {
            chunk: NO_CHUNK,
            statement: 0,
        }
    }

    pub fn is_none(self) -> bool {
        self.chunk == NO_CHUNK
    }
}

/// Payload for statement-level events.
pub struct TraceInfo {
    pub loc: EngineLocation,
    pub turtle: TurtleSnapshot,
    /// Empty unless the sink asked for stack descriptions.
    pub stacks: String,
}

/// Receiver for engine events, both while compiling and while executing.
pub trait EngineDebugSink {
    // -- Compiling ----------------------------------------

    /// A new chunk was opened. Builtin chunks are not announced.
    fn new_chunk(&mut self, chunk: usize, is_call_frame: bool);

    /// A statement was appended to a (non-builtin) chunk.
    fn new_statement(&mut self, info: &TraceInfo);

    // -- Executing ----------------------------------------

    /// Whether trace events should carry stack descriptions (they are
    /// expensive to build).
    fn want_stack_description(&self) -> bool;

    /// About to execute a statement.
    fn trace_point(&mut self, info: &TraceInfo);

    /// The pen height first became negative here.
    fn pen_height_error(&mut self, loc: EngineLocation);

    /// A `breakpoint` statement executed.
    fn breakpoint(&mut self, loc: EngineLocation);
}

/// Receiver for parser events.
pub trait ParserDebugSink {
    /// A source file was registered under `file_id`.
    fn add_source_file(&mut self, file_id: usize, filename: &str);

    /// The parser moved its source cursor. `label` is a short static tag
    /// naming the construct being compiled.
    fn set_source_location(&mut self, loc: SourceLocation, label: &'static str);
}

/// Shared handle types; the engine and parser each hold a clone of the
/// driver's debugger.
pub type EngineSink = Rc<RefCell<dyn EngineDebugSink>>;
pub type ParserSink = Rc<RefCell<dyn ParserDebugSink>>;
