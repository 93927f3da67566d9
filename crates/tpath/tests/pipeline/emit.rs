//! Output formatting: separators, the `M0 0` prolog, decimal places, the
//! SVG envelope.

use tpath::options::Options;
use tpath::RunStatus;

use super::{assert_path, path_of, run, run_with};

#[test]
fn empty_program_emits_nothing() {
    let (report, output) = run("");

    assert!(matches!(report.status, RunStatus::Success { .. }));
    assert_eq!(output, "");
}

#[test]
fn moves_defer_until_close() {
    assert_path("m 10 0 m 0 10 z", "M10 10 Z");
}

#[test]
fn first_draw_gets_a_prolog() {
    assert_path("f 10", "M0 0 L10 0");
}

#[test]
fn initial_absolute_move_needs_no_prolog() {
    assert_path("M 3 4 f 10", "M3 4 L13 4");
}

#[test]
fn normal_format_ends_with_a_newline() {
    let (_, output) = run("f 10");
    assert_eq!(output, "M0 0 L10 0\n");
}

#[test]
fn prettyprint_puts_commands_on_lines() {
    let mut options = Options::default();
    options.prettyprint = true;

    let (_, output) = run_with("f 10 r 90 f 10", &options);
    assert_eq!(output, "\nM0 0\nL10 0\nL10 10");
}

#[test]
fn optimized_drops_separators() {
    let mut options = Options::default();
    options.optimize = true;

    let (_, output) = run_with("f 10 r 90 f 10", &options);
    assert_eq!(output, "M0 0L10 0L10 10");
}

#[test]
fn optimized_suppresses_nl_and_sp() {
    let mut options = Options::default();
    options.optimize = true;

    let (_, output) = run_with("f 10 nl sp f 10", &options);
    assert_eq!(output, "M0 0L10 0L20 0");
}

#[test]
fn nl_splits_the_output() {
    assert_path("f 10 nl f 10", "M0 0 L10 0\nL20 0");
}

#[test]
fn decimal_places_are_configurable() {
    let mut options = Options::default();
    options.decimal_places = 3;

    let (_, output) = run_with("f 1.23456", &options);
    assert_eq!(output, "M0 0 L1.235 0\n");

    options.decimal_places = 0;
    let (_, output) = run_with("f 1.26", &options);
    assert_eq!(output, "M0 0 L1 0\n");
}

#[test]
fn trailing_zeros_are_trimmed() {
    assert_path("f 2.5 f 2.5", "M0 0 L2.5 0 L5 0");
}

#[test]
fn negative_zero_collapses() {
    // Heading 90 degrees: cos is ~-0.0000000437.
    assert_path("r 90 f 10", "M0 0 L0 10");
}

#[test]
fn svg_envelope_wraps_the_path() {
    let mut options = Options::default();
    options.svg_out = Some(tpath_turtle::SvgConfig::default());

    let (_, output) = run_with("f 10", &options);

    assert!(output.starts_with("<svg viewbox=\"0 0 500 500\""));
    assert!(output.contains("<rect x=\"0\" y=\"0\""));
    assert!(output.contains("d=\"M0 0 L10 0"));
    assert!(output.trim_end().ends_with("</svg>"));
}

#[test]
fn svg_envelope_closes_even_after_a_runtime_error() {
    let mut options = Options::default();
    options.svg_out = Some(tpath_turtle::SvgConfig::default());

    let (report, output) = run_with("f 10 pop", &options);

    assert!(matches!(report.status, RunStatus::RuntimeError { .. }));
    assert!(output.trim_end().ends_with("</svg>"));
}

#[test]
fn square_scenario() {
    let source = "def square(side) { for 4 { f side r 90 } }\nsquare(10)";

    assert_eq!(path_of(source), "M0 0 L10 0 L10 10 L0 10 L0 0");
}

#[test]
fn close_aims_along_the_travel() {
    // After z the turtle is back at the subpath start, aimed along the
    // closing edge; the next draw continues from there.
    assert_path("f 10 r 90 f 10 z", "M0 0 L10 0 L10 10 Z");
}

#[test]
fn arc_emits_radii_rotation_and_flags() {
    assert_path("a 10 90", "M0 0 A10 10 0 0 1 10 10");
    assert_path("a 10 -90", "M0 0 A10 10 0 0 0 10 -10");
}

#[test]
fn quadratic_curves() {
    assert_path("q 10 10 90", "M0 0 Q10 0 10 10");
    assert_path("Q 10 10 90", "M0 0 Q10 0 10 10");
}

#[test]
fn smooth_quad_continues_the_curve() {
    let out = path_of("q 10 10 90 t 10");
    assert!(out.starts_with("M0 0 Q10 0 10 10 T"), "got {}", out);
}

#[test]
fn cubic_curves() {
    // Depart east with pull 5, arrive from the south with pull 5 at (10,10).
    assert_path("c 5 0 5 270 10 10", "M0 0 C5 0 10 15 10 10");
}

#[test]
fn transforms_apply_to_output_only() {
    assert_path("translation 100 100 f 10", "M100 100 L110 100");
    assert_path("scaling 2 1 f 10", "M0 0 L20 0");
}

#[test]
fn matrix_stack_restores() {
    // The turtle's own coordinates never change; only the output mapping
    // does, so popping the translation snaps the path back.
    assert_path(
        "push_matrix translation 100 0 f 5 pop_matrix f 5",
        "M100 0 L105 0 L10 0",
    );
}
