//! Value definitions: constant folding, runtime locals, globals seen from
//! functions.

use super::{assert_error, assert_path};

#[test]
fn constant_definition_folds_at_parse_time() {
    assert_path("a = 3 * (2 + 5) f a", "M0 0 L21 0");
}

#[test]
fn constants_fold_through_other_constants() {
    assert_path("a = 4 b = a * a + 2 f b", "M0 0 L18 0");
}

#[test]
fn runtime_value_occupies_a_slot() {
    assert_path("a = turtle.x + 9 f a f a", "M0 0 L9 0 L18 0");
}

#[test]
fn runtime_value_is_evaluated_once() {
    // `a` captures one unique number when defined, not per use.
    assert_path("a = unique + 0 f a f a", "M0 0 L1 0 L2 0");
}

#[test]
fn global_values_are_visible_inside_functions() {
    assert_path("off = turtle.x + 1 def g() { f off } g", "M0 0 L1 0");
}

#[test]
fn constant_globals_are_visible_inside_functions() {
    assert_path("size = 12 def g() { f size } g", "M0 0 L12 0");
}

#[test]
fn local_values_inside_function_bodies() {
    assert_path(
        "def g(n) { doubled = n * 2 + turtle.x f doubled } g 4",
        "M0 0 L8 0",
    );
}

#[test]
fn block_locals_unwind_per_iteration() {
    // The block-local definition must not accumulate across iterations.
    assert_path("for 3 { step = turtle.x + 1 f step }", "M0 0 L1 0 L3 0 L7 0");
}

#[test]
fn recursive_definition_is_an_error() {
    assert_error("a = a + 1", "recursively defined");
}

#[test]
fn duplicate_definition_is_an_error() {
    assert_error("a = 1 a = 2", "Name 'a' is already defined");
}

#[test]
fn shadowing_in_an_inner_scope_is_allowed() {
    assert_path("a = 5 def g() { a = 7 f a } g f a", "M0 0 L7 0 L12 0");
}

#[test]
fn value_used_as_command_is_an_error() {
    assert_error("a = 1 a 2", "is not a command or lambda function");
}

#[test]
fn command_used_as_value_is_an_error() {
    assert_error("a = f + 1", "is not a value");
}
