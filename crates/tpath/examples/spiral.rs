//! Draw a square spiral to stdout.
//!
//! Run with: cargo run --example spiral

use tpath::options::Options;
use tpath::run_program;
use tpath_turtle::OutputSink;

fn main() {
    let program = "for i = 1..40 { f (i * 3) r 90 }";

    let options = Options::default();

    let report = run_program(
        program,
        "spiral",
        &options,
        OutputSink::new(std::io::stdout()),
    );

    for diagnostic in &report.diagnostics {
        eprintln!("{}", diagnostic);
    }
}
