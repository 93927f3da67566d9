//! Debugger surfaces: tracing, breakpoints, chunk listing, backtraces.

use tpath::options::Options;
use tpath::RunStatus;

use super::run_with;

fn debug_options() -> Options {
    let mut options = Options::default();
    options.debug = true;
    options
}

#[test]
fn run_trace_interleaves_with_output() {
    let mut options = debug_options();
    options.call_trace_level = 1;

    let (_, output) = run_with("f 10", &options);

    assert!(output.contains("test.tp:1:1: Run cmd:"), "got: {}", output);
    assert!(output.contains("Run fnarg:"));
    assert!(output.contains("Run fncall:"));
    // The path data is still there, between the trace lines.
    assert!(output.contains("M0 0"));
    assert!(output.contains("L10 0"));
}

#[test]
fn trace_shows_stack_descriptions() {
    let mut options = debug_options();
    options.call_trace_level = 1;

    let (_, output) = run_with("a = turtle.x + 5 f a", &options);

    assert!(output.contains("stack["), "got: {}", output);
    assert!(output.contains("captures["));
}

#[test]
fn trace_level_two_adds_turtle_state() {
    let mut options = debug_options();
    options.call_trace_level = 2;

    let (_, output) = run_with("f 10", &options);

    assert!(output.contains("Turtle: xyd="), "got: {}", output);
}

#[test]
fn breakpoints_mark_the_trace() {
    let mut options = debug_options();
    options.report_breakpoints = true;

    let (_, output) = run_with("f 1 breakpoint f 1", &options);

    assert!(
        output.contains("--------- breakpoint ----------------"),
        "got: {}",
        output
    );
    assert!(output.contains("test.tp:1:5:"));
}

#[test]
fn breakpoints_are_silent_without_the_flag() {
    let (_, output) = run_with("f 1 breakpoint f 1", &debug_options());

    assert!(!output.contains("breakpoint"));
}

#[test]
fn chunk_listing_names_functions_and_blocks() {
    let mut options = debug_options();
    options.list_chunks = true;

    let (report, _) = run_with("def go() { for 2 { f 1 } } go", &options);

    let listing = report.chunk_listing.expect("listing requested");

    assert!(listing.contains("builtin command function"));
    assert!(listing.contains("command function"));
    assert!(listing.contains("local block"));
    assert!(listing.contains("statement(s)"));
    assert!(listing.contains("line 1:"));
}

#[test]
fn no_listing_without_the_flag() {
    let (report, _) = run_with("f 1", &debug_options());

    assert!(report.chunk_listing.is_none());
}

#[test]
fn runtime_errors_carry_location_and_backtrace() {
    let (report, _) = run_with("def bad() { pop }\nbad", &debug_options());

    match report.status {
        RunStatus::RuntimeError {
            message,
            location,
            backtrace,
        } => {
            assert_eq!(message, "Empty stack in 'pop' command.");
            assert_eq!(location.filename, "test.tp");
            assert_eq!(location.loc.line, 1);

            let backtrace = backtrace.expect("backtrace with debugger");
            assert!(backtrace.contains("---- Backtrace: ---"));
            assert!(backtrace.contains("main"));
            assert!(backtrace.contains("command function"));
            assert!(backtrace.contains("Stacks: stack["));
        }
        _ => panic!("expected a runtime error"),
    }
}

#[test]
fn pen_warning_location_is_recorded() {
    let (report, _) = run_with("f 1\ndown f 10 up", &debug_options());

    match report.status {
        RunStatus::Success { pen_warning } => {
            let loc = pen_warning.expect("pen warning");
            assert_eq!(loc.filename, "test.tp");
            assert_eq!(loc.loc.line, 2);
        }
        _ => panic!("expected success with a pen warning"),
    }
}

#[test]
fn parse_failure_reports_with_location() {
    let (report, _) = run_with("f nope", &debug_options());

    assert!(matches!(report.status, RunStatus::ParseFailed));

    let rendered = format!("{}", report.diagnostics[0]);
    assert!(rendered.starts_with("test.tp:1:3: Error:"), "got: {}", rendered);
}
