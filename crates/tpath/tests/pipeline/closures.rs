//! Captures and closures: lazy capture lists, cascading, anonymous
//! functions building their closures amid call arguments, self-recursion.

use super::{assert_path, path_of};

#[test]
fn inner_function_captures_a_parameter() {
    assert_path(
        "def make(n) { def inner() { f n } inner inner } make(4)",
        "M0 0 L4 0 L8 0",
    );
}

#[test]
fn capture_is_recorded_once_per_name() {
    assert_path(
        "def make(n) { def inner() { f n r 90 f n } inner } make(6)",
        "M0 0 L6 0 L6 6",
    );
}

#[test]
fn multiple_captures_keep_their_order() {
    assert_path(
        "def make(a b) { def inner() { f a r 90 f b } inner } make 2 3",
        "M0 0 L2 0 L2 3",
    );
}

#[test]
fn captures_cascade_through_intermediate_functions() {
    let source = "def a(x) { def b() { def c() { f x } c } b } a(6)";

    assert_path(source, "M0 0 L6 0");
}

#[test]
fn anonymous_function_captures_enclosing_local() {
    let source = "def host(s) { def helper(fn()) { fn } helper { f (s * 2) } } host(4)";

    assert_path(source, "M0 0 L8 0");
}

#[test]
fn anonymous_closure_builds_amid_other_arguments() {
    // The closure for the anonymous argument is created while the host
    // call's value arguments are already on the locals stack; the capture
    // lives on the separate captures stack.
    let source = "def host(n fn(v) m) { fn n fn m } \
                  def wrap(s) { host 1 { =>(v) f (v + s) } 2 } \
                  wrap 10";

    assert_path(source, "M0 0 L11 0 L23 0");
}

#[test]
fn self_recursion_of_a_closure_is_not_captured() {
    // inner refers to itself; the self-reference resolves locally through
    // the caller's closure position rather than growing the capture list.
    let source = "def outer(n) { def inner(k) { if k > 0 { f n inner(k - 1) } } inner 3 } outer(2)";

    assert_path(source, "M0 0 L2 0 L4 0 L6 0");
}

#[test]
fn closures_in_loops_rebuild_each_iteration() {
    let source = "def run(fn()) { fn } for i = 1..3 { def step() { f i } run step }";

    assert_path(source, "M0 0 L1 0 L3 0 L6 0");
}

#[test]
fn captured_function_is_callable_through_its_pair() {
    // `inner` is captured by `wrapper` as a two-slot value and called
    // through it.
    let source = "def host(n) { def inner() { f n } def wrapper() { inner } wrapper } host 5";

    assert_path(source, "M0 0 L5 0");
}

#[test]
fn deep_capture_chain() {
    let out = path_of(
        "def l1(v) { def l2() { def l3() { def l4() { f v } l4 } l3 } l2 } l1 9",
    );

    assert_eq!(out, "M0 0 L9 0");
}
