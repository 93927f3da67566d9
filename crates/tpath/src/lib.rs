//! The tpath driver.
//!
//! Wires the front end to the engine: parse a program, execute it against an
//! output sink, and collect everything the command line needs to report —
//! diagnostics, the optional chunk listing, the pen-height warning, and
//! runtime errors with their backtraces.

pub mod debugger;
pub mod options;

use std::cell::RefCell;
use std::rc::Rc;

use tpath_core::{Diagnostic, SourceFileLocation};
use tpath_engine::debug::{EngineSink, ParserSink};
use tpath_engine::Engine;
use tpath_lang::{parse_program, FileMap, NameTable};
use tpath_turtle::{OutputFormat, OutputSink};

use crate::debugger::Debugger;
use crate::options::Options;

/// Everything a run produced besides the path output itself.
pub struct RunReport {
    /// Compile-time diagnostics, in the order produced.
    pub diagnostics: Vec<Diagnostic>,

    /// The `--list-chunks` dump, when requested and parsing succeeded.
    pub chunk_listing: Option<String>,

    pub status: RunStatus,
}

pub enum RunStatus {
    Success {
        /// Set when the pen height went negative; the location is known
        /// only when a debugger ran.
        pen_warning: Option<SourceFileLocation>,
    },

    /// Diagnostics carry the details; nothing was executed.
    ParseFailed,

    RuntimeError {
        message: String,
        location: SourceFileLocation,
        backtrace: Option<String>,
    },
}

impl RunReport {
    fn parse_failed(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            diagnostics,
            chunk_listing: None,
            status: RunStatus::ParseFailed,
        }
    }
}

/// Compile and run a program against `sink`.
pub fn run_program(
    source: &str,
    filename: &str,
    options: &Options,
    sink: OutputSink,
) -> RunReport {
    let debugger = if options.debug {
        Some(Rc::new(RefCell::new(Debugger::new(options))))
    } else {
        None
    };

    let engine_sink = debugger.as_ref().map(|d| {
        let sink: EngineSink = d.clone();
        sink
    });

    let parser_sink = debugger.as_ref().map(|d| {
        let sink: ParserSink = d.clone();
        sink
    });

    let mut engine = Engine::new(sink.clone(), engine_sink);

    engine.set_decimal_places(options.decimal_places);

    if options.optimize {
        engine.set_output_format(OutputFormat::Optimized);
    } else if options.prettyprint {
        engine.set_output_format(OutputFormat::Pretty);
    }

    let mut names = NameTable::new();
    let mut files = FileMap::new();
    let mut diagnostics = Vec::new();

    let info = match parse_program(
        source,
        filename,
        &mut engine,
        &mut names,
        &mut files,
        &mut diagnostics,
        parser_sink,
    ) {
        Ok(info) => info,
        Err(_) => return RunReport::parse_failed(diagnostics),
    };

    if info.has_error {
        return RunReport::parse_failed(diagnostics);
    }

    let chunk_listing = match (&debugger, options.list_chunks) {
        (Some(d), true) => Some(d.borrow().list_chunks_text()),
        _ => None,
    };

    let mut envelope_sink = sink.clone();

    if let Some(svg) = &options.svg_out {
        let _ = svg.write_header(&mut envelope_sink);
    }

    if let Some(d) = &debugger {
        if d.borrow().needs_trace_file() {
            d.borrow_mut().set_trace_output(sink.clone());
        }
    }

    let result = engine.execute_main(info.main_chunk);

    // The footer closes the document even when execution failed mid-path.
    if let Some(svg) = &options.svg_out {
        let _ = svg.write_footer(&mut envelope_sink);
    }

    let status = match result {
        Ok(()) => {
            let pen_warning = if engine.had_pen_height_error() {
                Some(match &debugger {
                    Some(d) => d.borrow().pen_height_error_loc(),
                    None => SourceFileLocation::default(),
                })
            } else {
                None
            };

            RunStatus::Success { pen_warning }
        }

        Err(e) => {
            let (location, backtrace) = match &debugger {
                Some(d) => {
                    let location = d.borrow().source_file_location(engine.engine_location());

                    let (stack, stacks) = engine.backtrace();
                    let backtrace = d.borrow().render_backtrace(&stack, &stacks);

                    (location, Some(backtrace))
                }
                None => (SourceFileLocation::default(), None),
            };

            RunStatus::RuntimeError {
                message: e.to_string(),
                location,
                backtrace,
            }
        }
    };

    RunReport {
        diagnostics,
        chunk_listing,
        status,
    }
}
