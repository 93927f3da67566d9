//! The debugger: chunk/statement bookkeeping, tracing, backtraces.
//!
//! Implements both sink traits. The parser stamps a source cursor
//! ([`tpath_engine::ParserDebugSink::set_source_location`]); the engine
//! announces chunks and statements, and the debugger records the cursor for
//! each, building a map parallel to the engine's chunk store. At run time
//! that map turns engine locations back into `file:line:col`.
//!
//! Run-trace output goes through the same sink as the SVG path data, so the
//! user can see which source line produced which path commands. Parse-trace
//! output goes to stderr.

use std::collections::BTreeMap;
use std::io::Write;

use tpath_core::{Location, SourceFileLocation, SourceLocation};
use tpath_engine::{EngineDebugSink, EngineLocation, ParserDebugSink, TraceInfo, NO_CHUNK};
use tpath_turtle::OutputSink;

use crate::options::Options;

#[derive(Clone, Copy, Default)]
struct StatementInfo {
    label: Option<&'static str>,
    loc: Location,
}

#[derive(Default)]
struct ChunkInfo {
    file_id: usize,
    is_call_frame: bool,
    statements: Vec<StatementInfo>,
}

pub struct Debugger {
    trace_stream: Option<OutputSink>,

    call_trace_level: i32,
    parse_trace_level: i32,
    report_breakpoints: bool,
    show_stacks: bool,

    // The parser's source cursor.
    source_file_id: usize,
    source_loc: Location,
    source_label: Option<&'static str>,

    filenames: BTreeMap<usize, String>,

    /// Parallel to the engine's chunk store. Builtin chunks stay as empty
    /// cells.
    chunks: Vec<ChunkInfo>,

    pen_height_error_loc: EngineLocation,
}

impl Debugger {
    pub fn new(options: &Options) -> Self {
        Self {
            trace_stream: None,
            call_trace_level: options.call_trace_level,
            parse_trace_level: options.parse_trace_level,
            report_breakpoints: options.report_breakpoints,
            show_stacks: true,
            source_file_id: 0,
            source_loc: Location::NONE,
            source_label: None,
            filenames: BTreeMap::new(),
            chunks: Vec::new(),
            pen_height_error_loc: EngineLocation::none(),
        }
    }

    /// Whether a trace stream must be attached before execution.
    pub fn needs_trace_file(&self) -> bool {
        self.call_trace_level > 0 || self.report_breakpoints
    }

    pub fn set_trace_output(&mut self, out: OutputSink) {
        self.trace_stream = Some(out);
    }

    fn statement_info(&self, loc: EngineLocation) -> Option<&StatementInfo> {
        self.chunks.get(loc.chunk)?.statements.get(loc.statement)
    }

    /// Resolve an engine location back to `file:line:col`.
    pub fn source_file_location(&self, loc: EngineLocation) -> SourceFileLocation {
        let mut out = SourceFileLocation::default();

        if let Some(chunk) = self.chunks.get(loc.chunk) {
            out.filename = self
                .filenames
                .get(&chunk.file_id)
                .cloned()
                .unwrap_or_default();

            if let Some(info) = chunk.statements.get(loc.statement) {
                out.loc = info.loc;
            }
        }

        out
    }

    pub fn pen_height_error_loc(&self) -> SourceFileLocation {
        self.source_file_location(self.pen_height_error_loc)
    }

    fn trace_line(&self, phase: &str, loc: EngineLocation, stacks: &str) -> String {
        let mut s = format!("{}", self.source_file_location(loc));

        s.push_str(phase);

        if let Some(label) = self.statement_info(loc).and_then(|i| i.label) {
            s.push(' ');
            s.push_str(label);
        }

        s.push_str(": ");

        if self.show_stacks && !stacks.is_empty() {
            s.push(' ');
            s.push_str(stacks);
        }

        s.push('\n');
        s
    }

    /// Render the call-stack trace, innermost last.
    pub fn render_backtrace(&self, call_stack: &[EngineLocation], stacks: &str) -> String {
        if call_stack.is_empty() {
            return "Backtrace: empty! (Internal Error)\n".to_string();
        }

        let mut s = String::from("\n---- Backtrace: --------------------------\n");

        for (i, pc) in call_stack.iter().enumerate() {
            if pc.chunk == NO_CHUNK {
                s.push_str("Internal error: unrecognized chunk");
            } else if pc.chunk >= self.chunks.len() {
                s.push_str("Internal error: bad chunk index");
            } else {
                s.push_str(&format!("{}", self.source_file_location(*pc)));
            }

            if i == 0 {
                s.push_str("main");
            } else if self.chunks.get(pc.chunk).is_some_and(|c| c.is_call_frame) {
                s.push_str("command function");
            } else {
                s.push_str("local block");
            }

            s.push('\n');
        }

        if !stacks.is_empty() {
            s.push_str("------------------------------------------\n");
            s.push_str(&format!("Stacks: {}\n", stacks));
        }

        s.push_str("---- End of backtrace: -------------------\n");
        s
    }

    /// Dump every chunk with its statement locations and labels.
    pub fn list_chunks_text(&self) -> String {
        let mut s = String::from(" --------- Chunks --------------------------------\n");

        for (i, chunk) in self.chunks.iter().enumerate() {
            s.push_str(&format!("{}: ", i));

            match chunk.statements.first() {
                // Builtin chunks are the empty cells at the start.
                None => s.push_str("builtin command function\n"),

                Some(_) => {
                    s.push_str(if chunk.is_call_frame {
                        "command function"
                    } else {
                        "local block"
                    });

                    s.push_str(&format!(
                        " ----- {} statement(s) -----\n",
                        chunk.statements.len()
                    ));

                    for info in &chunk.statements {
                        s.push_str(&format!(
                            "  line {}:{} {}\n",
                            info.loc.line,
                            info.loc.col,
                            info.label.unwrap_or(""),
                        ));
                    }
                }
            }
        }

        s.push_str(" --------- End of chunks -------------------------\n");
        s
    }
}

impl ParserDebugSink for Debugger {
    fn add_source_file(&mut self, file_id: usize, filename: &str) {
        self.source_file_id = file_id;

        let previous = self.filenames.insert(file_id, filename.to_string());

        debug_assert!(previous.is_none());
    }

    fn set_source_location(&mut self, loc: SourceLocation, label: &'static str) {
        self.source_file_id = loc.file_id;
        self.source_loc = loc.loc;
        self.source_label = Some(label);
    }
}

impl EngineDebugSink for Debugger {
    fn new_chunk(&mut self, chunk: usize, is_call_frame: bool) {
        debug_assert!(chunk >= self.chunks.len());

        // Builtin chunks are never announced, so this leaves a run of empty
        // cells at the start; they are small.
        while self.chunks.len() <= chunk {
            self.chunks.push(ChunkInfo::default());
        }

        self.chunks[chunk].file_id = self.source_file_id;
        self.chunks[chunk].is_call_frame = is_call_frame;
    }

    fn new_statement(&mut self, info: &TraceInfo) {
        debug_assert!(info.loc.chunk < self.chunks.len());

        if let Some(chunk) = self.chunks.get_mut(info.loc.chunk) {
            chunk.statements.push(StatementInfo {
                label: self.source_label,
                loc: self.source_loc,
            });
        }

        if self.parse_trace_level > 0 {
            eprint!("{}", self.trace_line("Parse", info.loc, &info.stacks));
        }
    }

    fn want_stack_description(&self) -> bool {
        (self.parse_trace_level > 0 || self.call_trace_level > 0) && self.show_stacks
    }

    fn trace_point(&mut self, info: &TraceInfo) {
        if self.call_trace_level == 0 || self.trace_stream.is_none() {
            return;
        }

        // The trace is interleaved with the SVG output on the same stream; a
        // leading newline separates it from the path data.
        let mut text = String::from("\n");

        text.push_str(&self.trace_line("Run", info.loc, &info.stacks));

        if self.call_trace_level > 1 {
            text.push_str(&format!(
                " Turtle: xyd={:.2},{:.2},{:.2} ixy={:.2},{:.2}\n",
                info.turtle.x,
                info.turtle.y,
                info.turtle.dir,
                info.turtle.initial_x,
                info.turtle.initial_y,
            ));
        }

        if let Some(out) = &mut self.trace_stream {
            let _ = out.write_all(text.as_bytes());
            let _ = out.flush();
        }
    }

    fn pen_height_error(&mut self, loc: EngineLocation) {
        self.pen_height_error_loc = loc;
    }

    fn breakpoint(&mut self, loc: EngineLocation) {
        if !self.report_breakpoints {
            return;
        }

        let text = format!(
            "{}--------- breakpoint ----------------\n",
            self.source_file_location(loc)
        );

        if let Some(out) = &mut self.trace_stream {
            let _ = out.write_all(text.as_bytes());
            let _ = out.flush();
        }
    }
}
