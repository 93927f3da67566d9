//! Runtime errors, the recursion guard, the expression-depth bound, and the
//! pen-height warning.

use tpath::RunStatus;

use super::{assert_error, run, runtime_error};

// ============================================================================
// Runtime errors
// ============================================================================

#[test]
fn pop_on_empty_turtle_stack() {
    assert_eq!(runtime_error("pop"), "Empty stack in 'pop' command.");
}

#[test]
fn pop_matrix_on_empty_stack() {
    assert_eq!(
        runtime_error("pop_matrix"),
        "Empty stack in 'pop_matrix' command."
    );
}

#[test]
fn reflection_around_the_origin() {
    assert_eq!(
        runtime_error("reflection 0 0"),
        "Invalid reflection arguments x==0 and y==0."
    );
}

#[test]
fn parallel_lines_in_quadratic() {
    // Departure and arrival both horizontal.
    assert_eq!(
        runtime_error("q 10 0 0"),
        "Parallel lines in q or Q command."
    );
}

#[test]
fn output_before_the_error_is_kept() {
    let (report, output) = run("f 10 pop");

    assert!(matches!(report.status, RunStatus::RuntimeError { .. }));
    assert!(output.starts_with("M0 0 L10 0"));
}

#[test]
fn infinite_recursion_trips_the_stack_guard() {
    // Each call grows the locals stack by its argument count, so a wide
    // parameter list reaches the million-entry guard long before the
    // interpreter's own stack is in danger. Still, give the thread room.
    let params: Vec<String> = (0..500).map(|i| format!("p{}", i)).collect();
    let args = vec!["1"; 500].join(" ");

    let source = format!(
        "def spin({}) {{ spin {} }} spin {}",
        params.join(" "),
        args,
        args
    );

    let handle = std::thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(move || runtime_error(&source))
        .unwrap();

    let message = handle.join().unwrap();

    assert!(message.contains("Stack overflow"), "got: {}", message);
}

// ============================================================================
// Expression depth
// ============================================================================

fn nested_parens(n: usize) -> String {
    format!("f {}1{}", "(".repeat(n), ")".repeat(n))
}

#[test]
fn expression_depth_at_the_limit_parses() {
    let source = nested_parens(1999);

    let handle = std::thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(move || {
            let (report, output) = run(&source);

            assert!(matches!(report.status, RunStatus::Success { .. }));
            assert_eq!(output, "M0 0 L1 0\n");
        })
        .unwrap();

    handle.join().unwrap();
}

#[test]
fn expression_depth_beyond_the_limit_is_fatal() {
    let source = nested_parens(2000);

    let handle = std::thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(move || {
            let (report, _) = run(&source);

            assert!(matches!(report.status, RunStatus::ParseFailed));
            assert!(report
                .diagnostics
                .iter()
                .any(|d| d.message.contains("Expression too complex to parse")));
        })
        .unwrap();

    handle.join().unwrap();
}

// ============================================================================
// Pen-height warning
// ============================================================================

#[test]
fn pen_below_zero_warns_once() {
    let (report, output) = run("down f 10 up down up f 3");

    // Pen-up drawing emits nothing until the pen is back on paper.
    assert_eq!(output, "M10 0 L13 0\n");

    match report.status {
        RunStatus::Success { pen_warning } => assert!(pen_warning.is_some()),
        _ => panic!("expected success with a pen warning"),
    }
}

#[test]
fn balanced_pen_moves_do_not_warn() {
    let (report, _) = run("up f 10 down f 3");

    match report.status {
        RunStatus::Success { pen_warning } => assert!(pen_warning.is_none()),
        _ => panic!("expected success"),
    }
}

// ============================================================================
// Syntax errors
// ============================================================================

#[test]
fn unterminated_string() {
    assert_error("import \"abc", "Unterminated string constant");
}

#[test]
fn stray_closing_brace() {
    assert_error("} f 1", "Unexpected token: }");
}

#[test]
fn missing_function_body_brace() {
    assert_error("def g() f 1", "Expected '{' but found f");
}

#[test]
fn invalid_exponent_number() {
    assert_error("f 1e-", "Invalid number: '1e-'");
}

#[test]
fn garbage_statement() {
    assert_error("* 3", "Unrecognized statement");
}
