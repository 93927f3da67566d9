//! Lambda parameters and anonymous functions.

use super::{assert_error, assert_path};

#[test]
fn named_function_as_lambda_argument() {
    assert_path(
        "def twice(action()) { action action } def go() { f 5 } twice go",
        "M0 0 L5 0 L10 0",
    );
}

#[test]
fn anonymous_block_as_lambda_argument() {
    assert_path(
        "def twice(action()) { action action } twice { f 5 }",
        "M0 0 L5 0 L10 0",
    );
}

#[test]
fn anonymous_block_with_parameters() {
    assert_path(
        "def each(fn(v)) { for i = 1..3 { fn i } } each { =>(n) f n }",
        "M0 0 L1 0 L3 0 L6 0",
    );
}

#[test]
fn lambda_arguments_pass_values() {
    assert_path(
        "def apply(fn(a b)) { fn 3 4 } apply { =>(x y) f (x + y) }",
        "M0 0 L7 0",
    );
}

#[test]
fn extra_arguments_are_truncated_at_call_entry() {
    // The parameter promises two values; a one-parameter function is still
    // accepted, and the second argument is dropped on entry.
    assert_path(
        "def apply(fn(a b)) { fn 1 2 } def use_one(x) { f x } apply use_one",
        "M0 0 L1 0",
    );
}

#[test]
fn lambda_parameter_forwards_to_another_call() {
    assert_path(
        "def inner(fn()) { fn } def outer(fn()) { inner fn } outer { f 9 }",
        "M0 0 L9 0",
    );
}

#[test]
fn nested_lambda_shapes_match_structurally() {
    assert_path(
        "def host(fn(a g(b))) { fn 2 { =>(k) f (k * 10) } } \
         host { =>(n h(m)) h n f n }",
        "M0 0 L20 0 L22 0",
    );
}

#[test]
fn signature_with_more_parameters_is_rejected() {
    assert_error(
        "def apply(fn(a)) { fn 1 } def two(x y) { f (x + y) } apply two",
        "Function signature of 'two' does not match parameter 1",
    );
}

#[test]
fn value_where_lambda_expected_is_rejected() {
    assert_error(
        "def apply(fn()) { fn } apply 5",
        "Expected a function name or anonymous function for parameter 1",
    );
}

#[test]
fn lambda_signature_on_statement_block_is_rejected() {
    assert_error("if 1 { =>(x) f 1 }", "Lambda signature not allowed here");
}

#[test]
fn missing_lambda_argument_is_reported() {
    assert_error(
        "def apply(fn()) { fn } apply",
        "Missing parameter 1 ('fn()') in call to apply()",
    );
}
