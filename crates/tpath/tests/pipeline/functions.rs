//! Function definitions and calls.

use super::{assert_error, assert_path};

#[test]
fn zero_argument_function() {
    assert_path("def go() { f 5 } go", "M0 0 L5 0");
}

#[test]
fn arguments_bind_to_parameters_in_order() {
    assert_path("def wedge(a b) { f a r 90 f b } wedge 3 4", "M0 0 L3 0 L3 4");
}

#[test]
fn calls_nest() {
    assert_path(
        "def leg(n) { f n } def pair(n) { leg n leg (n + 1) } pair 2",
        "M0 0 L2 0 L5 0",
    );
}

#[test]
fn call_with_parenthesized_arithmetic() {
    assert_path("def go(n) { f n } go (2 * 3 + 1)", "M0 0 L7 0");
}

#[test]
fn juxtaposed_arguments_with_signs() {
    assert_path("m 10 -5 f 1", "M10 -5 L11 -5");
}

#[test]
fn global_recursion_terminates_via_if() {
    let source = "def countdown(n) { if n > 0 { f n countdown(n - 1) } } countdown(3)";
    assert_path(source, "M0 0 L3 0 L5 0 L6 0");
}

#[test]
fn nested_function_sees_enclosing_parameter() {
    assert_path("def make(n) { def inner() { f n } inner } make(3)", "M0 0 L3 0");
}

#[test]
fn functions_shadow_in_inner_scopes() {
    assert_path(
        "def go() { f 1 } def host() { def go() { f 2 } go } host go",
        "M0 0 L2 0 L3 0",
    );
}

#[test]
fn missing_argument_is_a_parse_error() {
    assert_error("m 10", "Missing parameter 2 ('dy') in call to m()");
}

#[test]
fn surplus_tokens_after_a_call_are_rejected() {
    assert_error("f 1 2", "Unrecognized statement");
}

#[test]
fn undefined_command_is_an_error() {
    assert_error("frobnicate 1", "Name 'frobnicate' is undefined");
}

#[test]
fn duplicate_function_name_is_an_error() {
    assert_error("def go() { } def go() { }", "Name 'go' is already defined");
}

#[test]
fn statements_resume_after_a_bad_one() {
    // The parser resynchronizes and still reports later errors.
    let messages = super::error_messages("bogus 1\ndef go() { }\nalso_bogus 2");

    assert!(messages.iter().any(|m| m.contains("'bogus' is undefined")));
    assert!(messages.iter().any(|m| m.contains("'also_bogus' is undefined")));
}
