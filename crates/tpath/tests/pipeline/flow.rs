//! Conditionals and loops.

use super::{assert_error, assert_path};

// ============================================================================
// If / else
// ============================================================================

#[test]
fn if_runs_on_truthy_condition() {
    assert_path("if 1 { f 5 }", "M0 0 L5 0");
}

#[test]
fn if_skips_on_falsy_condition() {
    assert_path("if 0 { f 5 } f 1", "M0 0 L1 0");
}

#[test]
fn else_runs_on_falsy_condition() {
    assert_path("if 0 { f 5 } else { f 7 }", "M0 0 L7 0");
}

#[test]
fn condition_is_evaluated_at_run_time() {
    assert_path(
        "def step(n) { if turtle.x < 10 { f n } } step 8 step 8 step 8",
        "M0 0 L8 0 L16 0",
    );
}

#[test]
fn if_body_may_be_a_single_statement() {
    assert_path("if 1 f 5", "M0 0 L5 0");
}

// ============================================================================
// Bare-count loops
// ============================================================================

#[test]
fn count_loop_runs_n_times() {
    assert_path("for 3 { f 1 }", "M0 0 L1 0 L2 0 L3 0");
}

#[test]
fn count_is_cast_to_int() {
    assert_path("for 2.9 { f 1 }", "M0 0 L1 0 L2 0");
}

#[test]
fn zero_count_runs_nothing() {
    let (report, output) = super::run("for 0 { f 1 }");

    assert!(matches!(report.status, tpath::RunStatus::Success { .. }));
    assert_eq!(output, "");
}

#[test]
fn count_loops_nest() {
    assert_path("for 2 { for 2 { f 1 } r 90 }", "M0 0 L1 0 L2 0 L2 1 L2 2");
}

// ============================================================================
// Range loops
// ============================================================================

#[test]
fn range_is_inclusive() {
    assert_path("for i = 1..3 { f i }", "M0 0 L1 0 L3 0 L6 0");
}

#[test]
fn range_with_equal_bounds_runs_once() {
    assert_path("for i = 2..2 { f i }", "M0 0 L2 0");
}

#[test]
fn descending_range_counts_down() {
    assert_path("for i = 3..1 { f i }", "M0 0 L3 0 L5 0 L6 0");
}

#[test]
fn range_with_step() {
    assert_path("for i = 0..2..6 { f 1 }", "M0 0 L1 0 L2 0 L3 0 L4 0");
}

#[test]
fn descending_step_sign_is_ignored() {
    // Direction comes from the bounds; the step contributes its magnitude.
    assert_path("for i = 6..2..0 { f 1 }", "M0 0 L1 0 L2 0 L3 0 L4 0");
    assert_path("for i = 6..-2..0 { f 1 }", "M0 0 L1 0 L2 0 L3 0 L4 0");
}

#[test]
fn fractional_steps_accumulate() {
    assert_path("for i = 0..0.5..1 { f 1 }", "M0 0 L1 0 L2 0 L3 0");
}

#[test]
fn loop_variable_counts_from_zero_in_count_form() {
    // An unnamed count loop still supports no variable; the named form
    // requires a range.
    assert_error("for v = 5 { f v }", "the loop must use '..'");
}

#[test]
fn loop_bounds_are_evaluated_once() {
    // The bound reads turtle.x before the body ever moves the turtle.
    assert_path("f 2 for i = 1..turtle.x { f 1 }", "M0 0 L2 0 L3 0 L4 0");
}

#[test]
fn loop_variable_is_scoped_to_the_body() {
    assert_error("for i = 1..2 { f i } f i", "Undefined name: i");
}

#[test]
fn breakpoint_statement_parses_and_runs() {
    // Without a debugger it is a no-op.
    assert_path("f 1 breakpoint f 1", "M0 0 L1 0 L2 0");
}
