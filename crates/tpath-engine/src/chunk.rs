//! Chunks and the statement op set.
//!
//! A chunk is either a call frame (a user function or a builtin command) or
//! a local block (the body of `if`, `else`, or `for`). Each holds a list of
//! pre-bound statements; a statement is one variant of [`Statement`] with
//! every offset and chunk index fixed at compile time.

use tpath_turtle::TurtleOp;

use crate::expr::Expr;
use crate::frames::StackSize;

/// Which stack view an offset refers to.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ValueDomain {
    /// Locals by absolute index.
    Global,
    /// Through the current closure.
    Capture,
    /// Locals relative to the current frame.
    Local,
}

/// Call-frame data shared by user functions and builtins.
#[derive(Copy, Clone, Debug, Default)]
pub struct FrameInfo {
    pub params_size: i32,

    /// Offset of the closure within the capture frame that builds it;
    /// `None` for functions that capture nothing.
    pub closure_offset: Option<i32>,
}

/// Local-block data: how much of each stack to unwind on exit.
#[derive(Copy, Clone, Debug, Default)]
pub struct BlockInfo {
    pub unwind: StackSize,
}

#[derive(Clone, Debug)]
pub enum ChunkKind {
    Builtin(FrameInfo),
    Function(FrameInfo),
    LocalBlock(BlockInfo),
}

#[derive(Clone, Debug)]
pub struct Chunk {
    pub kind: ChunkKind,
    pub statements: Vec<Statement>,
}

impl Chunk {
    pub fn new(kind: ChunkKind) -> Self {
        Self {
            kind,
            statements: Vec::new(),
        }
    }

    pub fn is_call_frame(&self) -> bool {
        matches!(self.kind, ChunkKind::Builtin(_) | ChunkKind::Function(_))
    }

    pub fn is_local_block(&self) -> bool {
        matches!(self.kind, ChunkKind::LocalBlock(_))
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.kind, ChunkKind::Builtin(_))
    }

    pub fn frame_info(&self) -> &FrameInfo {
        match &self.kind {
            ChunkKind::Builtin(f) | ChunkKind::Function(f) => f,
            ChunkKind::LocalBlock(_) => panic!("local block has no frame info"),
        }
    }

    pub(crate) fn frame_info_mut(&mut self) -> &mut FrameInfo {
        match &mut self.kind {
            ChunkKind::Builtin(f) | ChunkKind::Function(f) => f,
            ChunkKind::LocalBlock(_) => panic!("local block has no frame info"),
        }
    }

    pub fn block_info(&self) -> &BlockInfo {
        match &self.kind {
            ChunkKind::LocalBlock(b) => b,
            _ => panic!("call frame has no block info"),
        }
    }

    pub(crate) fn block_info_mut(&mut self) -> &mut BlockInfo {
        match &mut self.kind {
            ChunkKind::LocalBlock(b) => b,
            _ => panic!("call frame has no block info"),
        }
    }

    pub fn is_closure(&self) -> bool {
        self.is_call_frame() && self.frame_info().closure_offset.is_some()
    }
}

/// A pre-bound executable statement.
#[derive(Clone, Debug)]
pub enum Statement {
    /// Evaluate and push one value onto locals or captures.
    PushValue { dest: ValueDomain, expr: Expr },

    /// Copy `size` consecutive slots from a source domain.
    PushCopy {
        dest: ValueDomain,
        source: ValueDomain,
        offset: i32,
        size: i32,
    },

    /// Push the 2-slot lambda value `(chunk_index, closure_position)`.
    PushLambda {
        dest: ValueDomain,
        chunk: usize,
        self_recursion: bool,
    },

    /// Push the closure position for a direct call about to be assembled
    /// (only emitted for closure functions).
    StartFnCall { chunk: usize, self_recursion: bool },

    /// Push the closure position of a lambda value (its second slot).
    StartLambdaCall { source: ValueDomain, offset: i32 },

    /// Call a chunk directly.
    CallFn { chunk: usize, args: StackSize },

    /// Call through a lambda value: the chunk index is read from the stack.
    CallLambda {
        source: ValueDomain,
        offset: i32,
        args: StackSize,
    },

    If {
        condition: Expr,
        then_block: usize,
        else_block: Option<usize>,
    },

    /// `for N { ... }` — N evaluated once, cast to int.
    ForCount {
        count: Expr,
        block: usize,
        named_var: bool,
    },

    /// `for a..b` / `for a..s..b` — bounds evaluated once; direction from
    /// `start <= end`, descending loops subtract `|step|`.
    ForRange {
        start: Expr,
        step: Option<Expr>,
        end: Expr,
        block: usize,
        named_var: bool,
    },

    Breakpoint,

    /// Dispatch a builtin turtle command; arguments are the frame's
    /// parameter slots.
    Turtle(TurtleOp),
}
