//! The parser / semantic analyzer.
//!
//! Hand-written recursive descent with a Pratt loop for expressions. This is
//! a single-pass compiler: every statement parsed is immediately compiled
//! through the engine's compile API, and every name reference is resolved to
//! a fixed stack offset on the spot.
//!
//! Error handling has two unwind styles, carried on `Result`:
//! [`Abort::Sync`] is caught at statement level (skip to the next statement
//! starter and continue), [`Abort::Fatal`] aborts the whole parse. Ordinary
//! diagnostics are collected without unwinding and the program is marked
//! failed.

use std::collections::BTreeMap;
use std::fs;

use tpath_core::{Diagnostic, Location, SourceFileLocation, SourceLocation};
use tpath_engine::debug::ParserSink;
use tpath_engine::{BinaryOp, Engine, Expr, UnaryOp, ValueDomain};

use crate::builtins::install_builtins;
use crate::files::FileMap;
use crate::lexer::Lexer;
use crate::names::{NameDef, NameId, NameTable};
use crate::scope::{Context, ScopeStack};
use crate::signature::{Checker, Signature};
use crate::token::{Token, TokenKind};

const MAX_EXPR_DEPTH: usize = 2000;

/// Prefix `-` and `!` bind at this postfix precedence.
const PREFIX_PRECEDENCE: i32 = 3;

const WEAKEST_PRECEDENCE: i32 = i32::MAX;

/// How a failing parse path unwinds.
#[derive(Copy, Clone, Debug)]
enum Abort {
    /// Recoverable: resynchronize at statement level.
    Sync,
    /// Unrecoverable: abort the parse.
    Fatal,
}

type Parse<T> = Result<T, Abort>;

/// The parse aborted on an internal or too-complex-input condition. The
/// details are in the collected diagnostics.
#[derive(Debug)]
pub struct FatalError;

impl std::fmt::Display for FatalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parsing aborted")
    }
}

impl std::error::Error for FatalError {}

/// The result of a successful (possibly error-flagged) parse.
pub struct ProgramInfo {
    /// Chunk index of the program's root call frame.
    pub main_chunk: usize,
    /// Whether any diagnostics of error severity were produced.
    pub has_error: bool,
}

/// Parse `source` and compile it into `engine`. Diagnostics accumulate in
/// order; `has_error` in the result says whether execution is allowed.
pub fn parse_program(
    source: &str,
    filename: &str,
    engine: &mut Engine,
    names: &mut NameTable,
    files: &mut FileMap,
    diagnostics: &mut Vec<Diagnostic>,
    debugger: Option<ParserSink>,
) -> Result<ProgramInfo, FatalError> {
    let builtins = install_builtins(engine, names);

    let (file_id, is_new) = files.add_file(filename);

    debug_assert!(is_new);

    if let Some(d) = &debugger {
        d.borrow_mut().add_source_file(file_id, filename);
    }

    let mut parser = Parser {
        lexer: Lexer::new(source),
        token: Token::eof(),
        peeked: None,
        engine,
        names,
        files,
        diagnostics,
        builtins,
        scopes: ScopeStack::new(),
        is_imported_module: false,
        has_error: false,
        file_id,
        context_depth: 0,
        fn_def_stack: Vec::new(),
        expr_depth: 0,
        debugger,
    };

    match parser.run() {
        Ok(main_chunk) => Ok(ProgramInfo {
            main_chunk,
            has_error: parser.has_error,
        }),
        Err(_) => Err(FatalError),
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    token: Token,
    peeked: Option<Token>,

    engine: &'a mut Engine,
    names: &'a mut NameTable,
    files: &'a mut FileMap,
    diagnostics: &'a mut Vec<Diagnostic>,

    builtins: BTreeMap<String, NameId>,
    scopes: ScopeStack,

    is_imported_module: bool,
    has_error: bool,
    file_id: usize,

    /// 0 below everything; 1 in the global file context; +1 per body.
    context_depth: i32,

    /// The functions currently being parsed, innermost last.
    fn_def_stack: Vec<NameId>,

    expr_depth: usize,

    debugger: Option<ParserSink>,
}

/// What a postfix operator token means.
#[derive(Copy, Clone, Debug)]
enum PostfixOp {
    Binary(BinaryOp),
    Ternary,
}

/// Postfix operator table: op, precedence (smaller binds tighter),
/// left-to-right.
fn postfix_op_info(kind: TokenKind) -> Option<(PostfixOp, i32, bool)> {
    use PostfixOp::{Binary, Ternary};

    match kind {
        TokenKind::Pow => Some((Binary(BinaryOp::Pow), 2, false)),

        TokenKind::Punct('*') => Some((Binary(BinaryOp::Mul), 5, true)),
        TokenKind::Punct('/') => Some((Binary(BinaryOp::Div), 5, true)),

        TokenKind::Punct('+') => Some((Binary(BinaryOp::Add), 6, true)),
        TokenKind::Punct('-') => Some((Binary(BinaryOp::Sub), 6, true)),

        TokenKind::Punct('>') => Some((Binary(BinaryOp::Gt), 9, true)),
        TokenKind::Punct('<') => Some((Binary(BinaryOp::Lt), 9, true)),
        TokenKind::Ge => Some((Binary(BinaryOp::Ge), 9, true)),
        TokenKind::Le => Some((Binary(BinaryOp::Le), 9, true)),

        TokenKind::EqEq => Some((Binary(BinaryOp::Eq), 10, true)),
        TokenKind::NotEq => Some((Binary(BinaryOp::Ne), 10, true)),

        TokenKind::AndAnd => Some((Binary(BinaryOp::And), 14, true)),
        TokenKind::OrOr => Some((Binary(BinaryOp::Or), 15, true)),

        TokenKind::Punct('?') => Some((Ternary, 16, false)),

        _ => None,
    }
}

fn anonymous_name(loc: Location) -> String {
    format!("!anonymous@{}:{}", loc.line, loc.col)
}

fn error_name(loc: Location) -> String {
    format!("!error@{}:{}", loc.line, loc.col)
}

impl<'a> Parser<'a> {
    // ----------------------------------------------------------------
    // Token plumbing
    // ----------------------------------------------------------------

    fn consume(&mut self) {
        self.token = match self.peeked.take() {
            Some(t) => t,
            None => self.lexer.next_token(),
        };
    }

    fn is(&self, kind: TokenKind) -> bool {
        self.token.kind == kind
    }

    fn consume_if(&mut self, kind: TokenKind) -> bool {
        if self.is(kind) {
            self.consume();
            return true;
        }

        false
    }

    fn peek_kind(&mut self) -> TokenKind {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token());
        }

        self.peeked.as_ref().map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    /// Report unless the expected token is there, then consume whatever is.
    fn require(&mut self, kind: TokenKind) {
        if !self.is(kind) {
            self.expected(Some(kind));
        }

        self.consume();
    }

    // ----------------------------------------------------------------
    // Error reporting
    // ----------------------------------------------------------------

    fn file_loc(&self, loc: Location) -> SourceFileLocation {
        SourceFileLocation::new(self.files.name(self.file_id), loc)
    }

    fn error_at(&mut self, loc: Location, msg: impl Into<String>) {
        self.has_error = true;

        let diagnostic = Diagnostic::error(self.file_loc(loc), msg);
        self.diagnostics.push(diagnostic);
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.error_at(self.token.loc, msg);
    }

    /// Report and return the fatal abort.
    fn die(&mut self, msg: impl Into<String>) -> Abort {
        self.error(msg);
        Abort::Fatal
    }

    fn expected(&mut self, want: Option<TokenKind>) {
        if want == Some(TokenKind::Str) && self.is(TokenKind::UnterminatedStr) {
            self.error("Unterminated string constant");
            return;
        }

        let found = if self.is(TokenKind::UnterminatedStr) {
            "Unterminated string constant".to_string()
        } else if self.token.text.is_empty() {
            self.token.kind.description()
        } else {
            self.token.text.clone()
        };

        match want {
            Some(kind) => {
                let msg = format!("Expected {} but found {}", kind.description(), found);
                self.error(msg);
            }
            None => {
                if self.is(TokenKind::Eof) {
                    self.error(format!("Unexpected {}", found));
                } else if self.is(TokenKind::UnterminatedStr) {
                    self.error("Unterminated quote pair");
                } else {
                    self.error(format!("Unexpected token: {}", found));
                }
            }
        }
    }

    fn unexpected(&mut self) {
        self.expected(None);
    }

    // ----------------------------------------------------------------
    // Debug support
    // ----------------------------------------------------------------

    fn set_engine_loc_at(&mut self, label: &'static str, loc: Location) {
        if let Some(d) = &self.debugger {
            d.borrow_mut()
                .set_source_location(SourceLocation::new(self.file_id, loc), label);

            // The fake stack built while parsing is filled with line
            // numbers, so trace output shows which line allocated each slot.
            self.engine.set_parser_push_val(loc.line as f64);
        }
    }

    fn set_engine_loc(&mut self, label: &'static str) {
        self.set_engine_loc_at(label, self.token.loc);
    }

    // ----------------------------------------------------------------
    // Contexts, blocks, and names
    // ----------------------------------------------------------------

    fn push_context(&mut self) {
        self.scopes.push_context();
        self.context_depth += 1;
    }

    fn pop_context(&mut self) {
        self.context_depth -= 1;
        self.scopes.pop_context();
    }

    fn current_function(&self) -> NameId {
        debug_assert!(!self.fn_def_stack.is_empty());

        self.fn_def_stack[self.fn_def_stack.len() - 1]
    }

    fn enter_fn_block(&mut self, fndef: NameId) {
        self.push_context();
        self.fn_def_stack.push(fndef);

        let chunk = self.engine.push_call_frame_chunk();

        if let Some(data) = self.names.get_mut(fndef).callable_mut() {
            data.chunk = chunk;
        }
    }

    fn exit_fn_block(&mut self, fndef: NameId) {
        debug_assert_eq!(self.current_function(), fndef);

        self.engine.pop_call_frame_chunk();
        self.fn_def_stack.pop();
        self.pop_context();

        // The closure object builds in the enclosing context, now that the
        // function's own frame is gone.
        self.create_closure_object(fndef);
    }

    fn enter_local_block(&mut self) -> usize {
        self.push_context();
        self.engine.push_local_block_chunk()
    }

    fn exit_local_block(&mut self) {
        self.engine.pop_local_block_chunk();
        self.pop_context();
    }

    /// Declare a name in the innermost context. A duplicate is reported and
    /// replaced by a synthetic `!error@L:C` name so parsing can continue.
    fn declare_name(&mut self, name: &str, loc: Location, mut def: NameDef) -> Parse<NameId> {
        def.setup_decl(name, loc, self.context_depth);

        let id = self.names.alloc(def.clone());

        if self.scopes.define(name, id) {
            return Ok(id);
        }

        self.error_at(loc, format!("Name '{}' is already defined", name));

        let recovery = error_name(loc);

        def.setup_decl(&recovery, loc, self.context_depth);

        let id = self.names.alloc(def);

        if !self.scopes.define(&recovery, id) {
            return Err(self.die(format!(
                "Internal error: error name {} is already defined!",
                recovery
            )));
        }

        Ok(id)
    }

    fn lookup_name(&self, name: &str) -> Option<NameId> {
        self.scopes
            .lookup(name)
            .or_else(|| self.builtins.get(name).copied())
    }

    fn fn_name(&self, fndef: NameId) -> String {
        self.names.get(fndef).name.clone()
    }

    fn param_name(&self, fndef: NameId, index: usize) -> String {
        self.names
            .get(fndef)
            .callable()
            .and_then(|c| c.param_names.get(index))
            .cloned()
            .unwrap_or_default()
    }

    // ----------------------------------------------------------------
    // Name classification and captures
    // ----------------------------------------------------------------

    /// Which domain a reference to `id` resolves to, from the current
    /// function.
    fn name_domain(&self, id: NameId) -> ValueDomain {
        let depth = self.names.get(id).context_depth;

        // Builtins sit at depth 0, above the global context; both 0 and 1
        // are global.
        if depth <= 1 {
            return ValueDomain::Global;
        }

        let current = self.current_function();

        if id == current {
            // Self-recursion, like b() { b }: called from its own local
            // context, no capture needed.
            return ValueDomain::Local;
        }

        if depth > self.names.get(current).context_depth {
            return ValueDomain::Local;
        }

        // Everything else is an outer local and must be captured.
        ValueDomain::Capture
    }

    /// Append `id` to `fndef`'s capture list (once); returns its capture
    /// offset.
    fn add_capture(&mut self, fndef: NameId, id: NameId) -> i32 {
        let captures: Vec<NameId> = self.names.get(fndef).captures().to_vec();

        let mut offset = 0;

        for capture in captures {
            if capture == id {
                return offset;
            }

            offset += self.names.get(capture).value_size();
        }

        self.names.get_mut(fndef).add_capture(id);

        offset
    }

    /// Resolve a reference: `(domain, offset)`. Capture resolution cascades
    /// into outer functions when the closure object builds.
    fn locate_name(&mut self, id: NameId) -> (ValueDomain, i32) {
        let domain = self.name_domain(id);

        let (mut offset, uninitialized, is_value) = {
            let def = self.names.get(id);
            (def.stack_offset, def.uninitialized, def.is_value())
        };

        if !uninitialized {
            debug_assert!(!is_value || offset >= 0);

            if domain == ValueDomain::Capture {
                let current = self.current_function();
                offset = self.add_capture(current, id);
            }
        }

        (domain, offset)
    }

    fn is_self_recursion(&self, domain: ValueDomain, id: NameId) -> bool {
        domain == ValueDomain::Local && id == self.current_function()
    }

    /// Push a name's value into `dest`: functions as lambda pairs, anything
    /// else as a slot copy.
    fn compile_push_object(&mut self, id: NameId, dest: ValueDomain) {
        // locate_name() cascades the capture into enclosing functions.
        let (source, offset) = self.locate_name(id);

        let (is_function, size, chunk) = {
            let def = self.names.get(id);
            (
                def.is_function(),
                def.value_size(),
                def.callable().map(|c| c.chunk).unwrap_or(0),
            )
        };

        if is_function && source != ValueDomain::Capture {
            let self_recursion = self.is_self_recursion(source, id);

            self.engine.compile_push_lambda(dest, chunk, self_recursion);
        } else {
            self.engine.compile_push_copy(dest, source, offset, size);
        }
    }

    fn compile_push_local(&mut self, id: NameId) {
        self.compile_push_object(id, ValueDomain::Local);
    }

    fn compile_push_capture(&mut self, id: NameId) {
        self.compile_push_object(id, ValueDomain::Capture);
    }

    /// After a function definition closes: emit the code that builds its
    /// closure in the enclosing context.
    ///
    /// Functions cannot escape their lexical context, so closures never need
    /// the heap; a closure is a run of values on the captures stack. Because
    /// anonymous functions appear amid call arguments, that run may build
    /// while arguments are still being pushed, which is exactly why captures
    /// have their own stack. Pushing each capture re-resolves the name in
    /// the enclosing function, cascading captures outward.
    fn create_closure_object(&mut self, fndef: NameId) {
        let captures: Vec<NameId> = self.names.get(fndef).captures().to_vec();

        if captures.is_empty() {
            return;
        }

        let chunk = self
            .names
            .get(fndef)
            .callable()
            .map(|c| c.chunk)
            .unwrap_or(0);

        self.set_engine_loc("closure");

        self.engine.create_closure(chunk);

        for id in captures {
            self.compile_push_capture(id);
        }
    }

    // ----------------------------------------------------------------
    // Expressions
    // ----------------------------------------------------------------

    fn enter_expr(&mut self) -> Parse<()> {
        self.expr_depth += 1;

        if self.expr_depth > MAX_EXPR_DEPTH {
            return Err(self.die("Expression too complex to parse"));
        }

        Ok(())
    }

    fn leave_expr(&mut self) {
        self.expr_depth -= 1;
    }

    fn parse_expression(&mut self) -> Parse<Option<Expr>> {
        self.parse_expression_prec(WEAKEST_PRECEDENCE)
    }

    fn parse_expression_prec(&mut self, outer_precedence: i32) -> Parse<Option<Expr>> {
        let Some(mut expr) = self.parse_prefix_expression()? else {
            return Ok(None);
        };

        loop {
            let Some((op, precedence, left_to_right)) = postfix_op_info(self.token.kind) else {
                break;
            };

            if precedence > outer_precedence || (precedence == outer_precedence && left_to_right) {
                break;
            }

            self.consume();

            expr = self.parse_postfix_op_expression(expr, op, precedence)?;
        }

        Ok(Some(expr))
    }

    fn parse_prefix_expression(&mut self) -> Parse<Option<Expr>> {
        self.enter_expr()?;
        let result = self.parse_prefix_inner();
        self.leave_expr();
        result
    }

    fn parse_prefix_inner(&mut self) -> Parse<Option<Expr>> {
        match self.token.kind {
            TokenKind::Punct('(') => {
                self.consume();
                let e = self.parse_expression()?;
                self.require(TokenKind::Punct(')'));
                Ok(e)
            }

            TokenKind::Turtle => Ok(Some(self.parse_turtle_expr())),

            TokenKind::Unique => {
                self.consume();
                Ok(Some(self.engine.compile_unique_val_expr()))
            }

            TokenKind::Ident => Ok(Some(self.parse_named_value_expression())),

            TokenKind::Number => {
                let e = self.numeric_constant();
                self.consume();
                Ok(Some(e))
            }

            // Unary plus: the identity, binding maximally tight.
            TokenKind::Punct('+') => {
                self.consume();
                self.parse_expression_prec(0)
            }

            TokenKind::Punct('-') => {
                self.consume();
                let rhs = self.parse_expression_prec(PREFIX_PRECEDENCE)?;
                Ok(Some(Expr::unary(
                    UnaryOp::Neg,
                    rhs.unwrap_or(Expr::Const(0.0)),
                )))
            }

            TokenKind::Punct('!') => {
                self.consume();
                let rhs = self.parse_expression_prec(PREFIX_PRECEDENCE)?;
                Ok(Some(Expr::unary(
                    UnaryOp::Not,
                    rhs.unwrap_or(Expr::Const(0.0)),
                )))
            }

            _ => {
                self.error("Expected an expression");
                Ok(None)
            }
        }
    }

    fn parse_postfix_op_expression(
        &mut self,
        lhs: Expr,
        op: PostfixOp,
        precedence: i32,
    ) -> Parse<Expr> {
        self.enter_expr()?;
        let result = self.parse_postfix_inner(lhs, op, precedence);
        self.leave_expr();
        result
    }

    fn parse_postfix_inner(&mut self, lhs: Expr, op: PostfixOp, precedence: i32) -> Parse<Expr> {
        match op {
            PostfixOp::Binary(op) => {
                let rhs = self.parse_expression_prec(precedence)?;

                Ok(Expr::binary(op, lhs, rhs.unwrap_or(Expr::Const(0.0))))
            }

            PostfixOp::Ternary => {
                // The C rule: the middle expression parses as if inside
                // parentheses.
                let then = self.parse_expression_prec(WEAKEST_PRECEDENCE)?;

                self.require(TokenKind::Punct(':'));

                let otherwise = self.parse_expression_prec(precedence)?;

                Ok(Expr::ternary(
                    lhs,
                    then.unwrap_or(Expr::Const(0.0)),
                    otherwise.unwrap_or(Expr::Const(0.0)),
                ))
            }
        }
    }

    fn numeric_constant(&mut self) -> Expr {
        debug_assert!(self.is(TokenKind::Number));

        match self.token.text.parse::<f64>() {
            Ok(v) => Expr::constant(v),
            Err(_) => {
                let msg = format!("Invalid number: '{}'", self.token.text);
                self.error(msg);
                Expr::constant(0.0)
            }
        }
    }

    fn parse_turtle_expr(&mut self) -> Expr {
        debug_assert!(self.is(TokenKind::Turtle));

        self.consume();

        if self.consume_if(TokenKind::Punct('.')) {
            if self.is(TokenKind::Ident) {
                let name = self.token.text.clone();

                self.consume();

                match name.as_str() {
                    "x" => return self.engine.compile_turtle_x_expr(),
                    "y" => return self.engine.compile_turtle_y_expr(),
                    "dir" => return self.engine.compile_turtle_dir_expr(),
                    _ => {}
                }
            }
        } else if self.is(TokenKind::Number) && self.token.text.starts_with('.') {
            // Error recovery: assume "turtle.7", i.e. "turtle .7".
            self.consume();
        }

        self.error("Expected turtle.x, turtle.y, or turtle.dir");

        Expr::constant(0.0)
    }

    fn parse_named_value_expression(&mut self) -> Expr {
        debug_assert!(self.is(TokenKind::Ident));

        let name = self.token.text.clone();

        let mut expr = None;

        match self.lookup_name(&name) {
            None => self.error(format!("Undefined name: {}", name)),

            Some(id) => {
                let (is_value, constexpr, uninitialized) = {
                    let def = self.names.get(id);
                    (def.is_value(), def.constexpr_value(), def.uninitialized)
                };

                if !is_value {
                    self.error(format!("Name '{}' is not a value", name));
                } else if let Some(v) = constexpr {
                    expr = Some(Expr::constant(v));
                } else if uninitialized {
                    self.error(format!("Name '{}' is recursively defined", name));
                } else {
                    let (source, offset) = self.locate_name(id);
                    expr = Some(self.engine.compile_access_value(source, offset));
                }
            }
        }

        self.consume();

        // A dummy keeps parsing alive after an error.
        expr.unwrap_or(Expr::Const(0.0))
    }

    // ----------------------------------------------------------------
    // Value definitions
    // ----------------------------------------------------------------

    fn disallow_statements_in_modules(&mut self) {
        if self.is_imported_module && self.context_depth == 1 {
            self.error("Statements are not allowed in imported modules");
        }
    }

    fn parse_value_definition(&mut self) -> Parse<()> {
        debug_assert!(self.is(TokenKind::Ident));

        self.set_engine_loc("alias");

        let name = self.token.text.clone();
        let loc = self.token.loc;

        let def = self.declare_name(&name, loc, NameDef::value())?;

        self.consume();
        self.require(TokenKind::Punct('='));

        // Self-reference in the right-hand side is "recursively defined".
        self.names.get_mut(def).uninitialized = true;

        let expr = self.parse_expression()?;

        self.names.get_mut(def).uninitialized = false;

        match expr {
            Some(Expr::Const(v)) => self.names.get_mut(def).set_constexpr_value(v),

            Some(expr) => {
                self.disallow_statements_in_modules();

                let offset = self.engine.compile_push_value(ValueDomain::Local, expr);

                self.names.get_mut(def).stack_offset = offset;
            }

            // The error is already reported; the name stays unusable.
            None => {}
        }

        Ok(())
    }

    // ----------------------------------------------------------------
    // Function definitions
    // ----------------------------------------------------------------

    fn parse_lambda_param_signature(
        &mut self,
        sig: &mut Signature,
        description: &mut String,
    ) -> Parse<()> {
        let mut depth = 1;

        while depth > 0 {
            match self.token.kind {
                TokenKind::Ident => {
                    if !description.ends_with('(') {
                        description.push(' ');
                    }

                    description.push_str(&self.token.text);

                    self.consume();

                    if self.consume_if(TokenKind::Punct('(')) {
                        description.push('(');
                        sig.start_lambda_param();
                        depth += 1;
                    } else {
                        sig.add_value_param();
                    }
                }

                TokenKind::Punct(')') => {
                    if depth > 1 {
                        self.consume();
                        sig.finish_lambda_param();
                        description.push(')');
                    }

                    depth -= 1;
                }

                TokenKind::Eof => {
                    self.error("Expected an identifier or ')'");
                    return Err(Abort::Sync);
                }

                _ => {
                    self.error("Expected an identifier or ')'");
                    self.synchronize_for_fn_params()?;

                    if self.is(TokenKind::Eof) {
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    fn parse_param_def(&mut self, fndef: NameId) -> Parse<()> {
        debug_assert!(self.is(TokenKind::Ident));

        self.set_engine_loc("fnparams");

        let name = self.token.text.clone();
        let loc = self.token.loc;

        self.consume();

        let mut description = name.clone();
        let mut param_size = 1;

        let param_def;

        if self.consume_if(TokenKind::Punct('(')) {
            let lambda_def = self.declare_name(&name, loc, NameDef::lambda())?;

            let mut lambda_sig = Signature::new();

            description.push('(');

            self.parse_lambda_param_signature(&mut lambda_sig, &mut description)?;

            self.require(TokenKind::Punct(')'));

            description.push(')');

            if let Some(data) = self.names.get_mut(lambda_def).callable_mut() {
                data.signature = lambda_sig.clone();
            }

            if let Some(data) = self.names.get_mut(fndef).callable_mut() {
                data.signature.start_lambda_param();
                data.signature.add_signature(&lambda_sig);
                data.signature.finish_lambda_param();
            }

            // A lambda parameter needs room for the closure position too.
            param_size = 2;
            param_def = lambda_def;
        } else {
            param_def = self.declare_name(&name, loc, NameDef::value())?;

            if let Some(data) = self.names.get_mut(fndef).callable_mut() {
                data.signature.add_value_param();
            }
        }

        if let Some(data) = self.names.get_mut(fndef).callable_mut() {
            data.param_names.push(description);
        }

        let offset = self.engine.compile_add_param(param_size);

        self.names.get_mut(param_def).stack_offset = offset;

        Ok(())
    }

    fn parse_fn_params(&mut self, fndef: NameId) -> Parse<()> {
        self.require(TokenKind::Punct('('));

        while !self.is(TokenKind::Punct(')')) {
            match self.token.kind {
                TokenKind::Ident => self.parse_param_def(fndef)?,

                _ => {
                    self.error("Expected an identifier or ')'");
                    self.synchronize_for_fn_params()?;
                    return Ok(());
                }
            }
        }

        self.require(TokenKind::Punct(')'));

        Ok(())
    }

    fn parse_fn_definition(&mut self, name: &str, loc: Location) -> Parse<()> {
        self.set_engine_loc_at("fndef", loc);

        let fndef = self.declare_name(name, loc, NameDef::function())?;

        self.enter_fn_block(fndef);
        let body = self.parse_fn_def_body(fndef);
        self.exit_fn_block(fndef);

        body?;

        self.require(TokenKind::Punct('}'));

        self.set_engine_loc("fnafter");

        Ok(())
    }

    fn parse_fn_def_body(&mut self, fndef: NameId) -> Parse<()> {
        self.parse_fn_params(fndef)?;

        self.set_engine_loc("fnbody");

        self.require(TokenKind::Punct('{'));

        self.parse_statement_list()?;

        self.set_engine_loc("fnend");

        Ok(())
    }

    /// Anonymous functions appear only as call arguments; their declaration
    /// site is the call itself.
    fn parse_anonymous_fn_definition(&mut self, loc: Location) -> Parse<Option<NameId>> {
        self.set_engine_loc_at("anonfn", loc);

        if !self.consume_if(TokenKind::Punct('{')) {
            return Ok(None);
        }

        let name = anonymous_name(loc);

        let fndef = self.declare_name(&name, loc, NameDef::function())?;

        self.enter_fn_block(fndef);
        let body = self.parse_anonymous_body(fndef);
        self.exit_fn_block(fndef);

        body?;

        self.require(TokenKind::Punct('}'));

        self.set_engine_loc("anonafter");

        Ok(Some(fndef))
    }

    fn parse_anonymous_body(&mut self, fndef: NameId) -> Parse<()> {
        if self.consume_if(TokenKind::EqArrow) {
            self.parse_fn_params(fndef)?;
        }

        self.parse_statement_list()?;

        self.set_engine_loc("anonend");

        Ok(())
    }

    // ----------------------------------------------------------------
    // Function calls
    // ----------------------------------------------------------------

    fn parse_argument(
        &mut self,
        fndef: NameId,
        param_index: usize,
        checker: &mut Checker<'_>,
    ) -> Parse<bool> {
        if checker.consume_value() {
            return match self.parse_prefix_expression()? {
                Some(Expr::Const(v)) => {
                    self.engine.compile_push_constant(ValueDomain::Local, v);
                    Ok(true)
                }
                Some(expr) => {
                    self.engine.compile_push_value(ValueDomain::Local, expr);
                    Ok(true)
                }
                None => Ok(false),
            };
        }

        if checker.consume_lambda_start() {
            let err_loc = self.token.loc;

            let mut lambda_fn: Option<NameId> = None;
            let mut found = true;

            if self.is(TokenKind::Ident) {
                let name = self.token.text.clone();

                match self.lookup_name(&name) {
                    None => self.error(format!("Undefined name: {}", name)),
                    Some(id) => {
                        if self.names.get(id).callable().is_some() {
                            lambda_fn = Some(id);
                        }
                    }
                }

                self.consume();
            } else if self.is(TokenKind::Punct('{')) {
                lambda_fn = self.parse_anonymous_fn_definition(self.token.loc)?;

                if lambda_fn.is_none() {
                    return Err(
                        self.die("Internal error: could not parse anonymous function definition")
                    );
                }
            } else if self.parse_expression()?.is_none() {
                // Not a function at all; attempt to recover.
                found = false;
            }

            if let Some(lf) = lambda_fn {
                let sig = self
                    .names
                    .get(lf)
                    .callable()
                    .map(|c| c.signature.clone())
                    .unwrap_or_default();

                if !checker.consume_lambda_sig(&sig) {
                    let msg = format!(
                        "Function signature of '{}' does not match parameter {} ('{}') in call to {}()",
                        self.names.get(lf).name,
                        param_index + 1,
                        self.param_name(fndef, param_index),
                        self.fn_name(fndef),
                    );
                    self.error_at(err_loc, msg);
                }

                self.compile_push_local(lf);
            } else {
                let msg = format!(
                    "Expected a function name or anonymous function for parameter {} ('{}') in call to {}()",
                    param_index + 1,
                    self.param_name(fndef, param_index),
                    self.fn_name(fndef),
                );
                self.error_at(err_loc, msg);
            }

            checker.consume_lambda_end();

            return Ok(found);
        }

        Err(self.die("Internal error: expected function parameter was not a value or lambda"))
    }

    fn parse_fn_call_arguments(&mut self, fndef: NameId) -> Parse<()> {
        let sig = self
            .names
            .get(fndef)
            .callable()
            .map(|c| c.signature.clone())
            .unwrap_or_default();

        let mut checker = sig.checker();
        let mut param_index = 0;

        while checker.more() {
            self.set_engine_loc("fnarg");

            if !self.parse_argument(fndef, param_index, &mut checker)? {
                break;
            }

            param_index += 1;
        }

        if checker.more() {
            let msg = format!(
                "Missing parameter {} ('{}') in call to {}()",
                param_index + 1,
                self.param_name(fndef, param_index),
                self.fn_name(fndef),
            );
            self.error(msg);
        }

        Ok(())
    }

    fn parse_fn_call(&mut self, fndef: NameId, loc: Location) -> Parse<()> {
        let (source, offset) = self.locate_name(fndef);

        // Captured functions and lambda parameters are called through their
        // stack value; everything else calls its chunk directly.
        let is_lambda_call = source == ValueDomain::Capture || self.names.get(fndef).is_lambda();

        debug_assert!(is_lambda_call || self.names.get(fndef).is_function());

        let chunk = self
            .names
            .get(fndef)
            .callable()
            .map(|c| c.chunk)
            .unwrap_or(0);

        if is_lambda_call {
            self.engine.compile_start_lambda_call(source, offset);
        } else {
            let self_recursion = self.is_self_recursion(source, fndef);

            self.engine.compile_start_fn_call(chunk, self_recursion);
        }

        let original_frame_size = self.engine.frame_size();

        self.parse_fn_call_arguments(fndef)?;

        self.set_engine_loc_at("fncall", loc);

        let args = self.engine.frame_size() - original_frame_size;

        if is_lambda_call {
            self.engine.compile_call_lambda_fn(source, offset, args);
        } else {
            self.engine.compile_call_fn(chunk, args);
        }

        Ok(())
    }

    fn parse_command_statement(&mut self) -> Parse<()> {
        debug_assert!(self.is(TokenKind::Ident));

        self.set_engine_loc("cmd");

        let name = self.token.text.clone();
        let loc = self.token.loc;

        let Some(def) = self.lookup_name(&name) else {
            self.error(format!("Name '{}' is undefined", name));
            return Err(Abort::Sync);
        };

        self.consume();

        if self.names.get(def).callable().is_none() {
            self.error_at(loc, format!("Name '{}' is not a command or lambda function", name));
            return Err(Abort::Sync);
        }

        self.parse_fn_call(def, loc)
    }

    // ----------------------------------------------------------------
    // Error recovery
    // ----------------------------------------------------------------

    fn synchronize_after_panic(&mut self) {
        loop {
            match self.token.kind {
                TokenKind::Eof
                | TokenKind::Import
                | TokenKind::Def
                | TokenKind::If
                | TokenKind::For
                | TokenKind::Breakpoint
                | TokenKind::Punct('}') => return,

                _ => self.consume(),
            }
        }
    }

    fn synchronize_for_fn_params(&mut self) -> Parse<()> {
        loop {
            match self.token.kind {
                TokenKind::Eof | TokenKind::Punct(')') => break,

                TokenKind::Import
                | TokenKind::Def
                | TokenKind::If
                | TokenKind::For
                | TokenKind::Breakpoint
                | TokenKind::Punct('}') => return Err(Abort::Sync),

                // Assume a missing ')': this is the function body.
                TokenKind::Punct('{') => return Ok(()),

                _ => self.consume(),
            }
        }

        self.consume_if(TokenKind::Punct(')'));

        Ok(())
    }

    fn discard_matched_parens(&mut self) {
        if self.consume_if(TokenKind::Punct('(')) {
            while !self.is(TokenKind::Eof) && !self.consume_if(TokenKind::Punct(')')) {
                if self.is(TokenKind::Punct('(')) {
                    self.discard_matched_parens();
                } else {
                    self.consume();
                }
            }
        }
    }

    fn reject_lambda_signature(&mut self) {
        if self.is(TokenKind::EqArrow) {
            self.error("Lambda signature not allowed here");

            self.consume();

            if self.is(TokenKind::Punct('(')) {
                self.discard_matched_parens();
            }
        }
    }

    // ----------------------------------------------------------------
    // Statements
    // ----------------------------------------------------------------

    fn parse_statement_or_block(&mut self) -> Parse<()> {
        if self.consume_if(TokenKind::Punct('{')) {
            self.reject_lambda_signature();

            self.parse_statement_list()?;

            self.require(TokenKind::Punct('}'));

            return Ok(());
        }

        self.parse_statement()
    }

    fn parse_local_body(&mut self, loop_var: Option<(String, Location)>) -> Parse<usize> {
        let chunk = self.enter_local_block();
        let body = self.parse_local_body_inner(loop_var);
        self.exit_local_block();

        body?;

        Ok(chunk)
    }

    fn parse_local_body_inner(&mut self, loop_var: Option<(String, Location)>) -> Parse<()> {
        if let Some((name, loc)) = loop_var {
            let def = self.declare_name(&name, loc, NameDef::value())?;

            let offset = self.engine.compile_named_loop_var();

            self.names.get_mut(def).stack_offset = offset;
        }

        self.parse_statement_or_block()
    }

    fn parse_for_statement_body(&mut self) -> Parse<()> {
        let loc = self.token.loc;

        let mut loop_var = None;

        if self.is(TokenKind::Ident) && self.peek_kind() == TokenKind::Punct('=') {
            loop_var = Some((self.token.text.clone(), self.token.loc));
            self.consume();
            self.consume();
        }

        let range_loc = self.token.loc;

        let mut failed = false;

        let start = self.parse_expression()?;

        if start.is_none() {
            failed = true;
        }

        let mut step = None;
        let mut end = None;

        if !failed {
            if self.consume_if(TokenKind::DotDot) {
                step = self.parse_expression()?;

                if step.is_none() {
                    failed = true;
                } else if self.consume_if(TokenKind::DotDot) {
                    end = self.parse_expression()?;

                    if end.is_none() {
                        failed = true;
                    }
                } else {
                    // Two-expression form: that was the end, step defaults.
                    end = step.take();
                }
            } else if loop_var.is_some() {
                self.error_at(
                    range_loc,
                    "When naming a loop variable, the loop must use '..', \
                     as in 'for l = 1..8' (or '1..2..8')",
                );
            }
        }

        if failed {
            while self.consume_if(TokenKind::DotDot) {
                self.parse_expression()?;
            }

            if self.is(TokenKind::Punct('{')) {
                self.parse_local_body(loop_var)?;
            }

            return Ok(());
        }

        let named = loop_var.is_some();

        let chunk = self.parse_local_body(loop_var)?;

        self.set_engine_loc_at("for", loc);

        if let Some(start) = start {
            self.engine.compile_for_loop(start, step, end, chunk, named);
        }

        Ok(())
    }

    fn parse_if_statement(&mut self) -> Parse<()> {
        debug_assert!(self.is(TokenKind::If));

        let loc = self.token.loc;

        self.consume();

        let condition = self.parse_expression()?;

        let failed = condition.is_none();

        let mut if_body = None;
        let mut else_body = None;

        if !failed || self.is(TokenKind::Punct('{')) {
            if_body = Some(self.parse_local_body(None)?);
        }

        if self.consume_if(TokenKind::Else) {
            else_body = Some(self.parse_local_body(None)?);
        }

        if let (Some(condition), Some(if_body)) = (condition, if_body) {
            self.set_engine_loc_at("if", loc);

            self.engine.compile_if_statement(condition, if_body, else_body);
        }

        Ok(())
    }

    fn parse_definition(&mut self) -> Parse<()> {
        // For now, only function definitions follow 'def'.
        if !self.is(TokenKind::Ident) {
            self.expected(Some(TokenKind::Ident));
        }

        let name = self.token.text.clone();
        let loc = self.token.loc;

        self.consume();

        self.parse_fn_definition(&name, loc)
    }

    /// One statement; recoverable aborts resynchronize here.
    fn parse_statement(&mut self) -> Parse<()> {
        self.set_engine_loc("stmt");

        match self.parse_statement_inner() {
            Err(Abort::Sync) => {
                self.synchronize_after_panic();
                Ok(())
            }
            other => other,
        }
    }

    fn parse_statement_inner(&mut self) -> Parse<()> {
        match self.token.kind {
            TokenKind::Import => self.parse_import_statement(),

            TokenKind::Def => {
                self.consume();
                self.parse_definition()
            }

            TokenKind::If => {
                self.disallow_statements_in_modules();
                self.parse_if_statement()
            }

            TokenKind::For => {
                self.disallow_statements_in_modules();
                self.consume();
                self.parse_for_statement_body()
            }

            TokenKind::Breakpoint => {
                self.consume();
                self.engine.compile_breakpoint();
                Ok(())
            }

            TokenKind::Ident => {
                if self.peek_kind() == TokenKind::Punct('=') {
                    self.parse_value_definition()
                } else {
                    self.disallow_statements_in_modules();
                    self.parse_command_statement()
                }
            }

            _ => {
                self.error("Unrecognized statement");
                Err(Abort::Sync)
            }
        }
    }

    fn parse_statement_list(&mut self) -> Parse<()> {
        while !self.is(TokenKind::Eof) {
            if self.is(TokenKind::Punct('}')) {
                if self.context_depth == 1 {
                    // A stray brace at the top level.
                    self.unexpected();
                    self.consume();
                } else {
                    break;
                }
            }

            self.parse_statement()?;
        }

        Ok(())
    }

    // ----------------------------------------------------------------
    // Imports
    // ----------------------------------------------------------------

    fn unquote_token(&self) -> String {
        let text = &self.token.text;

        if !matches!(
            self.token.kind,
            TokenKind::Str | TokenKind::UnterminatedStr
        ) {
            return text.clone();
        }

        let mut chars = text.chars();

        let Some(quote) = chars.next() else {
            return String::new();
        };

        let mut out = String::new();
        let mut escaped = false;

        for c in chars {
            if escaped {
                out.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                break;
            } else {
                out.push(c);
            }
        }

        out
    }

    fn add_file(&mut self, name: &str) -> (usize, bool) {
        let (id, is_new) = self.files.add_file(name);

        if is_new {
            if let Some(d) = &self.debugger {
                d.borrow_mut().add_source_file(id, name);
            }
        }

        (id, is_new)
    }

    fn parse_import_statement(&mut self) -> Parse<()> {
        let allowed = self.context_depth == 1;

        if !allowed {
            self.error("Import statements are only allowed at the global level");
        }

        self.consume();

        if !self.is(TokenKind::Str) {
            self.expected(Some(TokenKind::Str));
        }

        let filename = self.unquote_token();

        if filename.is_empty() {
            self.error("Empty import module name");
        } else if allowed {
            let (file_id, is_new) = self.add_file(&filename);

            // A file id that already exists means the module was imported
            // before; nothing to do.
            if is_new {
                match fs::read_to_string(&filename) {
                    Err(e) => {
                        let msg = format!("Importing {}: {}", filename, e);
                        self.error(msg);
                    }

                    Ok(source) => {
                        self.import_module(&source, file_id)?;
                        self.import_names(file_id);
                    }
                }
            }
        }

        self.consume(); // the filename

        Ok(())
    }

    fn import_module(&mut self, source: &str, file_id: usize) -> Parse<()> {
        let mut sub = Parser {
            lexer: Lexer::new(source),
            token: Token::eof(),
            peeked: None,
            engine: &mut *self.engine,
            names: &mut *self.names,
            files: &mut *self.files,
            diagnostics: &mut *self.diagnostics,
            builtins: self.builtins.clone(),
            scopes: ScopeStack::new(),
            is_imported_module: true,
            has_error: false,
            file_id,
            context_depth: 0,
            fn_def_stack: Vec::new(),
            expr_depth: 0,
            debugger: self.debugger.clone(),
        };

        let result = sub.run();

        if sub.has_error {
            self.has_error = true;
        }

        result.map(|_| ())
    }

    /// Merge a finished module's global context into ours. Duplicates keep
    /// the existing (importer's) definition.
    fn import_names(&mut self, file_id: usize) {
        let empty = Context::new();

        let context = self
            .files
            .entry(file_id)
            .global_context
            .as_ref()
            .unwrap_or(&empty);

        let duplicates = self.scopes.import_names(context);

        if !duplicates.is_empty() {
            let msg = format!(
                "Some names were duplicates, and could not be imported: {}",
                duplicates.join(" ")
            );
            self.error(msg);
        }
    }

    fn store_global_context(&mut self) {
        debug_assert!(self.files.entry(self.file_id).global_context.is_none());

        let context = self.scopes.extract_innermost();

        self.files.entry_mut(self.file_id).global_context = Some(context);
    }

    // ----------------------------------------------------------------
    // Top level
    // ----------------------------------------------------------------

    /// Parse the whole file into a fresh root call frame; returns its chunk
    /// index.
    fn run(&mut self) -> Parse<usize> {
        self.consume();

        // The context below global; the global context itself belongs to
        // the root function's block.
        self.scopes.push_context();

        let global_fn = self.names.alloc(NameDef::function());

        self.enter_fn_block(global_fn);

        let result = self.parse_statement_list();

        if result.is_ok() && !self.is(TokenKind::Eof) {
            self.unexpected();
        }

        result?;

        self.store_global_context();
        self.exit_fn_block(global_fn);

        debug_assert!(self.names.get(global_fn).captures().is_empty());

        Ok(self
            .names
            .get(global_fn)
            .callable()
            .map(|c| c.chunk)
            .unwrap_or(tpath_engine::NO_CHUNK))
    }
}
