//! The runtime half of the engine.
//!
//! [`RunState`] owns everything that moves during execution — the dual
//! stack, the turtle, the unique counter, the debug program counter — while
//! the chunk store is borrowed immutably alongside it.

use smallvec::SmallVec;

use tpath_turtle::PathTurtle;

use crate::chunk::{Chunk, Statement, ValueDomain};
use crate::debug::{EngineLocation, EngineSink, TraceInfo};
use crate::engine::INFINITE_RECURSION_LIMIT;
use crate::error::RuntimeError;
use crate::expr::{Eval, Expr};
use crate::frames::{EngineStack, StackSize};

pub(crate) struct RunState {
    pub(crate) stack: EngineStack,
    pub(crate) turtle: PathTurtle,

    next_unique: i64,
    pub(crate) pen_height_negative: bool,

    pub(crate) debugger: Option<EngineSink>,
    pub(crate) debug_pc: Vec<EngineLocation>,
}

impl RunState {
    pub(crate) fn new(turtle: PathTurtle, debugger: Option<EngineSink>) -> Self {
        Self {
            stack: EngineStack::new(),
            turtle,
            next_unique: 1,
            pen_height_negative: false,
            debugger,
            debug_pc: Vec::new(),
        }
    }

    // -- Expression evaluation ----------------------------

    pub(crate) fn eval(&mut self, expr: &Expr) -> f64 {
        match expr {
            Expr::Const(v) => *v,

            Expr::Eval(node) => match &**node {
                Eval::Local(offset) => self.stack.get(*offset),
                Eval::Global(offset) => self.stack.read_global(*offset),
                Eval::Capture(offset) => self.stack.read_capture(*offset),

                Eval::TurtleX => self.turtle.x(),
                Eval::TurtleY => self.turtle.y(),
                Eval::TurtleDir => self.turtle.dir(),

                Eval::Unique => {
                    let v = self.next_unique;
                    self.next_unique += 1;
                    v as f64
                }

                Eval::Unary(op, rhs) => {
                    let r = self.eval(rhs);
                    op.apply(r)
                }

                // Both operands always evaluate; && and || do not
                // short-circuit.
                Eval::Binary(op, lhs, rhs) => {
                    let l = self.eval(lhs);
                    let r = self.eval(rhs);
                    op.apply(l, r)
                }

                Eval::Ternary(cond, then, otherwise) => {
                    if self.eval(cond) != 0.0 {
                        self.eval(then)
                    } else {
                        self.eval(otherwise)
                    }
                }
            },
        }
    }

    // -- Stack helpers ------------------------------------

    fn push_to(&mut self, dest: ValueDomain, val: f64) {
        match dest {
            ValueDomain::Local => self.stack.push(val),
            ValueDomain::Capture => self.stack.push_capture(val),
            ValueDomain::Global => unreachable!("cannot push to the global domain"),
        }
    }

    fn read_from(&self, source: ValueDomain, offset: i32) -> f64 {
        match source {
            ValueDomain::Local => self.stack.get(offset),
            ValueDomain::Global => self.stack.read_global(offset),
            ValueDomain::Capture => self.stack.read_capture(offset),
        }
    }

    // -- Calls --------------------------------------------

    /// Push the pieces of a call or lambda value: the chunk index (lambda
    /// values only) and the closure position (closure functions only; zero
    /// filler for non-closures in lambda values).
    fn start_call(
        &mut self,
        chunks: &[Chunk],
        dest: ValueDomain,
        chunk_index: usize,
        self_recursion: bool,
        is_lambda: bool,
    ) {
        if is_lambda {
            self.push_to(dest, chunk_index as f64);
        }

        let c = &chunks[chunk_index];

        if let Some(closure_offset) = c.frame_info().closure_offset {
            let pos = if self_recursion {
                // The caller's own closure is exactly the callee's.
                self.stack.closure_position()
            } else {
                self.stack.capture_frame_start() + closure_offset
            };

            debug_assert!(pos >= 0);

            self.push_to(dest, pos as f64);
        } else if is_lambda {
            self.push_to(dest, 0.0);
        }
    }

    pub(crate) fn call_fn(
        &mut self,
        chunks: &[Chunk],
        index: usize,
        args: StackSize,
    ) -> Result<(), RuntimeError> {
        let c = &chunks[index];

        debug_assert!(c.is_call_frame());

        if self.debugger.is_some() {
            self.push_debug_frame(index);
        }

        self.fn_body(
            chunks,
            args,
            c.frame_info().params_size,
            c.is_closure(),
            &c.statements,
        )?;

        if self.debugger.is_some() {
            self.pop_debug_frame();
        }

        Ok(())
    }

    fn call_lambda(
        &mut self,
        chunks: &[Chunk],
        index: usize,
        args: StackSize,
    ) -> Result<(), RuntimeError> {
        let c = &chunks[index];

        debug_assert!(c.is_call_frame());

        if self.debugger.is_some() {
            self.push_debug_frame(index);
        }

        // A lambda call always pushed a closure position, even for functions
        // that capture nothing.
        self.fn_body(chunks, args, c.frame_info().params_size, true, &c.statements)?;

        if self.debugger.is_some() {
            self.pop_debug_frame();
        }

        Ok(())
    }

    fn fn_body(
        &mut self,
        chunks: &[Chunk],
        args: StackSize,
        params_size: i32,
        has_closure_position: bool,
        statements: &[Statement],
    ) -> Result<(), RuntimeError> {
        // Closure objects are not passed into functions, only the closure
        // position; the captures frame starts empty.
        self.stack.push_frame_args(
            StackSize::new(args.locals, 0),
            StackSize::new(params_size, 0),
        );

        self.exec_statements(chunks, statements)?;

        self.stack.pop_frame();

        // Unwinding the call also discards the closure position (if one was
        // pushed) and the closures built for anonymous functions in the
        // arguments.
        self.stack.pop(StackSize::new(
            if has_closure_position { 1 } else { 0 },
            args.captures,
        ));

        Ok(())
    }

    fn call_local_block(&mut self, chunks: &[Chunk], index: usize) -> Result<(), RuntimeError> {
        let c = &chunks[index];

        debug_assert!(c.is_local_block());

        if self.debugger.is_some() {
            self.push_debug_frame(index);
        }

        self.exec_statements(chunks, &c.statements)?;

        self.stack.pop(c.block_info().unwind);

        if self.debugger.is_some() {
            self.pop_debug_frame();
        }

        Ok(())
    }

    // -- Statement execution ------------------------------

    pub(crate) fn exec_statements(
        &mut self,
        chunks: &[Chunk],
        statements: &[Statement],
    ) -> Result<(), RuntimeError> {
        if !self.stack.check_stack_size(INFINITE_RECURSION_LIMIT) {
            return Err(RuntimeError::InfiniteRecursion);
        }

        if self.debugger.is_none() {
            for stmt in statements {
                self.exec_statement(chunks, stmt)?;
            }
        } else {
            for stmt in statements {
                self.trace_statement(chunks);

                self.exec_statement(chunks, stmt)?;

                self.increment_debug_statement();
            }
        }

        Ok(())
    }

    fn exec_statement(&mut self, chunks: &[Chunk], stmt: &Statement) -> Result<(), RuntimeError> {
        match stmt {
            Statement::PushValue { dest, expr } => {
                let val = self.eval(expr);
                self.push_to(*dest, val);
            }

            Statement::PushCopy {
                dest,
                source,
                offset,
                size,
            } => {
                for i in *offset..*offset + *size {
                    let val = self.read_from(*source, i);
                    self.push_to(*dest, val);
                }
            }

            Statement::PushLambda {
                dest,
                chunk,
                self_recursion,
            } => self.start_call(chunks, *dest, *chunk, *self_recursion, true),

            Statement::StartFnCall {
                chunk,
                self_recursion,
            } => self.start_call(chunks, ValueDomain::Local, *chunk, *self_recursion, false),

            Statement::StartLambdaCall { source, offset } => {
                let closure_position = self.read_from(*source, *offset + 1);
                self.stack.push(closure_position);
            }

            Statement::CallFn { chunk, args } => self.call_fn(chunks, *chunk, *args)?,

            Statement::CallLambda {
                source,
                offset,
                args,
            } => {
                let fn_index = self.read_from(*source, *offset);

                debug_assert!(fn_index >= 0.0);
                debug_assert!(fn_index.fract() == 0.0);

                self.call_lambda(chunks, fn_index as usize, *args)?;
            }

            Statement::If {
                condition,
                then_block,
                else_block,
            } => {
                if self.eval(condition) != 0.0 {
                    self.call_local_block(chunks, *then_block)?;
                } else if let Some(block) = else_block {
                    self.call_local_block(chunks, *block)?;
                }
            }

            Statement::ForCount {
                count,
                block,
                named_var,
            } => {
                let count = self.eval(count) as i32;

                for i in 0..count {
                    if *named_var {
                        self.stack.push(i as f64);
                    }

                    self.call_local_block(chunks, *block)?;
                }
            }

            Statement::ForRange {
                start,
                step,
                end,
                block,
                named_var,
            } => {
                let mut s = self.eval(start);
                let step = step.as_ref().map(|e| self.eval(e));
                let end = self.eval(end);

                if s <= end {
                    let inc = step.unwrap_or(1.0);

                    while s <= end {
                        if *named_var {
                            self.stack.push(s);
                        }

                        self.call_local_block(chunks, *block)?;

                        s += inc;
                    }
                } else {
                    // Descending: the step direction is inferred, so an
                    // explicit sign is discarded.
                    let inc = step.unwrap_or(1.0).abs();

                    while s >= end {
                        if *named_var {
                            self.stack.push(s);
                        }

                        self.call_local_block(chunks, *block)?;

                        s -= inc;
                    }
                }
            }

            Statement::Breakpoint => self.exec_breakpoint(chunks),

            Statement::Turtle(op) => {
                let mut args: SmallVec<[f64; 6]> = SmallVec::new();

                for i in 0..op.arity() {
                    args.push(self.stack.get(i as i32));
                }

                self.turtle.run_op(*op, &args)?;
            }
        }

        // Latch the first pen-height excursion below zero.
        if !self.pen_height_negative && self.turtle.pen_height() < 0 {
            self.pen_height_negative = true;

            if let Some(dbg) = self.debugger.clone() {
                let loc = self.engine_location(chunks);
                dbg.borrow_mut().pen_height_error(loc);
            }
        }

        Ok(())
    }

    fn exec_breakpoint(&mut self, chunks: &[Chunk]) {
        if let Some(dbg) = self.debugger.clone() {
            let loc = self.engine_location(chunks);
            dbg.borrow_mut().breakpoint(loc);
        }
    }

    // -- Debug support ------------------------------------

    /// The innermost program-counter entry that is not a builtin chunk.
    pub(crate) fn engine_location(&self, chunks: &[Chunk]) -> EngineLocation {
        for pc in self.debug_pc.iter().rev() {
            if !chunks[pc.chunk].is_builtin() {
                return *pc;
            }
        }

        debug_assert!(false, "no non-builtin frame on the debug stack");
        EngineLocation::none()
    }

    fn trace_statement(&mut self, chunks: &[Chunk]) {
        let Some(dbg) = self.debugger.clone() else {
            return;
        };

        let Some(pc) = self.debug_pc.last().copied() else {
            return;
        };

        if chunks[pc.chunk].is_builtin() {
            return;
        }

        let info = TraceInfo {
            loc: self.engine_location(chunks),
            turtle: self.turtle.snapshot(),
            stacks: self.stack_description(false),
        };

        dbg.borrow_mut().trace_point(&info);
    }

    pub(crate) fn stack_description(&self, force: bool) -> String {
        if !force {
            let wanted = self
                .debugger
                .as_ref()
                .is_some_and(|d| d.borrow().want_stack_description());

            if !wanted {
                return String::new();
            }
        }

        self.stack.describe()
    }

    fn push_debug_frame(&mut self, chunk: usize) {
        self.debug_pc.push(EngineLocation::new(chunk, 0));
    }

    fn pop_debug_frame(&mut self) {
        debug_assert!(!self.debug_pc.is_empty());

        self.debug_pc.pop();
    }

    fn increment_debug_statement(&mut self) {
        if let Some(pc) = self.debug_pc.last_mut() {
            pc.statement += 1;
        }
    }
}
