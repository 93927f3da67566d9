//! The engine: chunk construction at parse time, execution afterwards.
//!
//! During parsing the engine plays the runtime stack motions forward on the
//! real [`crate::frames::EngineStack`] (the "fake stack"), so every
//! `compile_*` call can return the offset its value will occupy at runtime.
//! Nothing is relocated later; runtime reads are direct indexing.

use tpath_turtle::{OutputFormat, OutputSink, PathTurtle, PathWriter, TurtleOp};

use crate::chunk::{BlockInfo, Chunk, ChunkKind, FrameInfo, Statement, ValueDomain};
use crate::debug::{EngineLocation, EngineSink, TraceInfo, NO_CHUNK};
use crate::error::RuntimeError;
use crate::exec::RunState;
use crate::expr::{Eval, Expr};
use crate::frames::StackSize;

/// Both stacks must stay below this many entries.
pub(crate) const INFINITE_RECURSION_LIMIT: i32 = 1_000_000;

pub struct Engine {
    // -- Program under construction -----------------------
    chunks: Vec<Chunk>,
    current_chunk: usize,
    chunk_stack: Vec<usize>,

    /// What the parse-time stack simulation pushes; the parser feeds the
    /// current line number here so trace output can show where each slot
    /// came from.
    parser_push_val: f64,

    /// Closure building is non-nested (it happens right after each function
    /// definition), so a single offset suffices.
    current_closure_start: i32,

    is_executing: bool,

    // -- Runtime state ------------------------------------
    run: RunState,
}

impl Engine {
    pub fn new(sink: OutputSink, debugger: Option<EngineSink>) -> Self {
        let turtle = PathTurtle::new(PathWriter::new(sink));

        Self {
            chunks: Vec::new(),
            current_chunk: NO_CHUNK,
            chunk_stack: Vec::new(),
            parser_push_val: 0.0,
            current_closure_start: 0,
            is_executing: false,
            run: RunState::new(turtle, debugger),
        }
    }

    pub fn set_output_format(&mut self, format: OutputFormat) {
        self.run.turtle.writer_mut().set_format(format);
    }

    pub fn set_decimal_places(&mut self, n: i32) {
        self.run.turtle.writer_mut().set_decimal_places(n);
    }

    // -- Chunk bookkeeping --------------------------------

    fn current(&mut self) -> &mut Chunk {
        debug_assert!(!self.is_executing);

        &mut self.chunks[self.current_chunk]
    }

    fn add_statement(&mut self, stmt: Statement) {
        let index = self.current_chunk;

        self.chunks[index].statements.push(stmt);

        if self.chunks[index].is_builtin() {
            return;
        }

        if let Some(dbg) = self.run.debugger.clone() {
            let info = TraceInfo {
                loc: EngineLocation::new(index, self.chunks[index].statements.len() - 1),
                turtle: self.run.turtle.snapshot(),
                stacks: self.run.stack_description(false),
            };

            dbg.borrow_mut().new_statement(&info);
        }
    }

    fn push_chunk(&mut self, kind: ChunkKind) -> usize {
        debug_assert!(!self.is_executing);

        self.chunk_stack.push(self.current_chunk);
        self.current_chunk = self.chunks.len();

        let mut chunk = Chunk::new(kind);

        // Local blocks record the frame size at entry; the pop computes the
        // actual unwind size from the difference.
        if let ChunkKind::LocalBlock(info) = &mut chunk.kind {
            info.unwind = self.run.stack.frame_size();
        }

        let is_call_frame = chunk.is_call_frame();
        let is_builtin = chunk.is_builtin();

        self.chunks.push(chunk);

        if !is_builtin {
            if let Some(dbg) = self.run.debugger.clone() {
                dbg.borrow_mut().new_chunk(self.current_chunk, is_call_frame);
            }
        }

        self.current_chunk
    }

    fn pop_chunk(&mut self) {
        debug_assert!(!self.is_executing);

        if self.chunks[self.current_chunk].is_local_block() {
            let start = self.chunks[self.current_chunk].block_info().unwind;
            let unwind = self.run.stack.frame_size() - start;

            self.chunks[self.current_chunk].block_info_mut().unwind = unwind;

            // Parse-time simulation of the block exit.
            self.run.stack.pop(unwind);
        }

        self.current_chunk = self.chunk_stack.pop().unwrap_or(NO_CHUNK);
    }

    pub fn push_builtin_fn_chunk(&mut self, params_size: i32) -> usize {
        let index = self.push_chunk(ChunkKind::Builtin(FrameInfo::default()));

        self.current().frame_info_mut().params_size = params_size;

        index
    }

    pub fn pop_builtin_fn_chunk(&mut self) {
        self.pop_chunk();
    }

    pub fn push_call_frame_chunk(&mut self) -> usize {
        self.run.stack.push_frame();

        self.push_chunk(ChunkKind::Function(FrameInfo::default()))
    }

    pub fn pop_call_frame_chunk(&mut self) {
        self.pop_chunk();
        self.run.stack.pop_frame();
    }

    pub fn push_local_block_chunk(&mut self) -> usize {
        self.push_chunk(ChunkKind::LocalBlock(BlockInfo::default()))
    }

    pub fn pop_local_block_chunk(&mut self) {
        self.pop_chunk();
    }

    // -- Parse-time stack simulation ----------------------

    pub fn set_parser_push_val(&mut self, val: f64) {
        self.parser_push_val = val;
    }

    pub fn frame_size(&self) -> StackSize {
        self.run.stack.frame_size()
    }

    /// Reserve `count` slots on the parse-time stack; returns the offset
    /// the first slot will have at runtime.
    fn push_for_parser(&mut self, dest: ValueDomain, count: i32) -> i32 {
        let val = self.parser_push_val;

        match dest {
            ValueDomain::Local => {
                let offset = self.run.stack.frame_size().locals;

                for _ in 0..count {
                    self.run.stack.push(val);
                }

                offset
            }

            ValueDomain::Capture => {
                let offset = self.closure_capture_offset();

                for _ in 0..count {
                    self.run.stack.push_capture(val);
                }

                offset
            }

            ValueDomain::Global => unreachable!("cannot push to the global domain"),
        }
    }

    fn unwind_stack_for_parser(&mut self, args: StackSize) {
        self.run.stack.pop(args);
    }

    fn closure_capture_offset(&self) -> i32 {
        self.run.stack.frame_size().captures - self.current_closure_start
    }

    // -- Value accessors ----------------------------------

    pub fn compile_access_constant(val: f64) -> Expr {
        Expr::constant(val)
    }

    pub fn compile_access_value(&self, source: ValueDomain, offset: i32) -> Expr {
        Expr::read(source, offset)
    }

    pub fn compile_turtle_x_expr(&self) -> Expr {
        Expr::Eval(Box::new(Eval::TurtleX))
    }

    pub fn compile_turtle_y_expr(&self) -> Expr {
        Expr::Eval(Box::new(Eval::TurtleY))
    }

    pub fn compile_turtle_dir_expr(&self) -> Expr {
        Expr::Eval(Box::new(Eval::TurtleDir))
    }

    pub fn compile_unique_val_expr(&self) -> Expr {
        Expr::Eval(Box::new(Eval::Unique))
    }

    // -- Instructions -------------------------------------

    /// Reserve one parameter of `size` slots; returns its offset.
    pub fn compile_add_param(&mut self, size: i32) -> i32 {
        debug_assert!(self.chunks[self.current_chunk].is_call_frame());

        let offset = self.push_for_parser(ValueDomain::Local, size);

        self.current().frame_info_mut().params_size += size;

        offset
    }

    pub fn compile_push_value(&mut self, dest: ValueDomain, expr: Expr) -> i32 {
        let offset = self.push_for_parser(dest, 1);

        self.add_statement(Statement::PushValue { dest, expr });

        offset
    }

    pub fn compile_push_constant(&mut self, dest: ValueDomain, val: f64) -> i32 {
        self.compile_push_value(dest, Expr::constant(val))
    }

    pub fn compile_push_copy(
        &mut self,
        dest: ValueDomain,
        source: ValueDomain,
        offset: i32,
        size: i32,
    ) -> i32 {
        debug_assert!(size > 0);

        let offset_of_copy = self.push_for_parser(dest, size);

        self.add_statement(Statement::PushCopy {
            dest,
            source,
            offset,
            size,
        });

        offset_of_copy
    }

    pub fn compile_push_lambda(
        &mut self,
        dest: ValueDomain,
        chunk: usize,
        self_recursion: bool,
    ) -> i32 {
        let offset = self.push_for_parser(dest, 2);

        self.add_statement(Statement::PushLambda {
            dest,
            chunk,
            self_recursion,
        });

        offset
    }

    /// Reserve the slot for a named loop variable. The value is pushed at
    /// run time by the loop statement, but its offset is needed while the
    /// body parses.
    pub fn compile_named_loop_var(&mut self) -> i32 {
        self.push_for_parser(ValueDomain::Local, 1)
    }

    /// Mark where the given function's closure starts on the captures
    /// stack. Subsequent capture pushes populate it.
    pub fn create_closure(&mut self, fn_index: usize) {
        debug_assert!(self.chunks[fn_index].is_call_frame());

        let closure_offset = self.run.stack.frame_size().captures;

        self.current_closure_start = closure_offset;
        self.chunks[fn_index].frame_info_mut().closure_offset = Some(closure_offset);
    }

    pub fn compile_start_fn_call(&mut self, fn_index: usize, self_recursion: bool) {
        self.add_statement(Statement::StartFnCall {
            chunk: fn_index,
            self_recursion,
        });
    }

    pub fn compile_call_fn(&mut self, fn_index: usize, args: StackSize) {
        self.unwind_stack_for_parser(args);

        self.add_statement(Statement::CallFn {
            chunk: fn_index,
            args,
        });
    }

    pub fn compile_start_lambda_call(&mut self, source: ValueDomain, offset: i32) {
        debug_assert!(source != ValueDomain::Global);

        self.add_statement(Statement::StartLambdaCall { source, offset });
    }

    pub fn compile_call_lambda_fn(&mut self, source: ValueDomain, offset: i32, args: StackSize) {
        debug_assert!(source != ValueDomain::Global);

        self.unwind_stack_for_parser(args);

        self.add_statement(Statement::CallLambda {
            source,
            offset,
            args,
        });
    }

    pub fn compile_if_statement(
        &mut self,
        condition: Expr,
        then_block: usize,
        else_block: Option<usize>,
    ) {
        self.add_statement(Statement::If {
            condition,
            then_block,
            else_block,
        });
    }

    /// `end == None` selects the bare-count form; a step without an end is
    /// rejected by the parser.
    pub fn compile_for_loop(
        &mut self,
        start: Expr,
        step: Option<Expr>,
        end: Option<Expr>,
        block: usize,
        named_var: bool,
    ) {
        debug_assert!(end.is_some() || step.is_none());

        match end {
            None => self.add_statement(Statement::ForCount {
                count: start,
                block,
                named_var,
            }),
            Some(end) => self.add_statement(Statement::ForRange {
                start,
                step,
                end,
                block,
                named_var,
            }),
        }
    }

    pub fn compile_breakpoint(&mut self) {
        self.add_statement(Statement::Breakpoint);
    }

    /// The body of a builtin chunk: dispatch one turtle command reading its
    /// arguments from the frame's parameter slots.
    pub fn compile_turtle_command(&mut self, op: TurtleOp) {
        self.add_statement(Statement::Turtle(op));
    }

    // -- Execution ----------------------------------------

    pub fn execute_main(&mut self, chunk_index: usize) -> Result<(), RuntimeError> {
        debug_assert!(chunk_index != NO_CHUNK);

        self.run.stack.reset();
        self.is_executing = true;

        self.run.call_fn(&self.chunks, chunk_index, StackSize::ZERO)?;

        self.run.turtle.finish()?;
        Ok(())
    }

    pub fn had_pen_height_error(&self) -> bool {
        self.run.pen_height_negative
    }

    // -- Debugging ----------------------------------------

    /// The innermost non-builtin position currently executing.
    pub fn engine_location(&self) -> EngineLocation {
        self.run.engine_location(&self.chunks)
    }

    /// The call-stack trace, innermost last, with trailing builtin frames
    /// dropped, plus a stack description.
    pub fn backtrace(&self) -> (Vec<EngineLocation>, String) {
        let mut stack = self.run.debug_pc.clone();

        while stack
            .last()
            .is_some_and(|pc| self.chunks[pc.chunk].is_builtin())
        {
            stack.pop();
        }

        (stack, self.run.stack_description(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tpath_turtle::BufferHandle;

    fn engine() -> (Engine, BufferHandle) {
        let (sink, buf) = OutputSink::buffer();
        let mut e = Engine::new(sink, None);
        e.set_decimal_places(2);
        (e, buf)
    }

    fn forward_builtin(e: &mut Engine) -> usize {
        let chunk = e.push_builtin_fn_chunk(1);
        e.compile_turtle_command(TurtleOp::Forward);
        e.pop_builtin_fn_chunk();
        chunk
    }

    #[test]
    fn assembles_and_runs_a_builtin_call() {
        let (mut e, buf) = engine();

        let forward = forward_builtin(&mut e);

        let main = e.push_call_frame_chunk();
        e.compile_start_fn_call(forward, false);
        e.compile_push_constant(ValueDomain::Local, 10.0);
        e.compile_call_fn(forward, StackSize::new(1, 0));
        e.pop_call_frame_chunk();

        e.execute_main(main).unwrap();

        assert_eq!(buf.contents(), "M0 0 L10 0\n");
    }

    #[test]
    fn stacks_are_empty_after_execution() {
        let (mut e, _buf) = engine();

        let forward = forward_builtin(&mut e);

        let main = e.push_call_frame_chunk();
        e.compile_start_fn_call(forward, false);
        e.compile_push_constant(ValueDomain::Local, 3.0);
        e.compile_call_fn(forward, StackSize::new(1, 0));
        e.pop_call_frame_chunk();

        e.execute_main(main).unwrap();

        assert_eq!(e.run.stack.stack_size(), StackSize::ZERO);
        assert_eq!(e.run.stack.num_frames(), 1);
    }

    #[test]
    fn parse_time_offsets_match_runtime_reads() {
        let (mut e, buf) = engine();

        let forward = forward_builtin(&mut e);

        let main = e.push_call_frame_chunk();

        // x = 7 at offset 0, then forward(x + 1).
        let offset = e.compile_push_constant(ValueDomain::Local, 7.0);
        assert_eq!(offset, 0);

        e.compile_start_fn_call(forward, false);
        let arg = Expr::binary(
            crate::expr::BinaryOp::Add,
            e.compile_access_value(ValueDomain::Local, offset),
            Expr::constant(1.0),
        );
        e.compile_push_value(ValueDomain::Local, arg);
        e.compile_call_fn(forward, StackSize::new(1, 0));

        e.pop_call_frame_chunk();

        e.execute_main(main).unwrap();

        assert_eq!(buf.contents(), "M0 0 L8 0\n");
    }

    #[test]
    fn unique_counter_starts_at_one() {
        let (mut e, buf) = engine();

        let forward = forward_builtin(&mut e);

        let main = e.push_call_frame_chunk();
        for _ in 0..2 {
            e.compile_start_fn_call(forward, false);
            let u = e.compile_unique_val_expr();
            e.compile_push_value(ValueDomain::Local, u);
            e.compile_call_fn(forward, StackSize::new(1, 0));
        }
        e.pop_call_frame_chunk();

        e.execute_main(main).unwrap();

        // forward(1) then forward(2).
        assert_eq!(buf.contents(), "M0 0 L1 0 L3 0\n");
    }

    #[test]
    fn for_count_runs_block_n_times() {
        let (mut e, buf) = engine();

        let forward = forward_builtin(&mut e);

        let main = e.push_call_frame_chunk();

        let block = e.push_local_block_chunk();
        e.compile_start_fn_call(forward, false);
        e.compile_push_constant(ValueDomain::Local, 2.0);
        e.compile_call_fn(forward, StackSize::new(1, 0));
        e.pop_local_block_chunk();

        e.compile_for_loop(Expr::constant(3.0), None, None, block, false);
        e.pop_call_frame_chunk();

        e.execute_main(main).unwrap();

        assert_eq!(buf.contents(), "M0 0 L2 0 L4 0 L6 0\n");
    }
}
