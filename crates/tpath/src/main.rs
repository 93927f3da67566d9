//! The tpath command line.

use std::env;
use std::fs;
use std::io::{self, Read};

use tpath::options::{CliError, Options, USAGE};
use tpath::{run_program, RunStatus};
use tpath_core::Diagnostic;
use tpath_turtle::OutputSink;

fn print_usage(error: Option<&str>) {
    if let Some(msg) = error {
        eprintln!("ERROR: {}", msg);
    }

    eprintln!("Usage: tpath [OPTION]... [INFILE] [OUTFILE]");
    eprintln!("{}", USAGE);
}

fn read_input(filename: &str) -> io::Result<String> {
    if filename.is_empty() || filename == "-" {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        Ok(source)
    } else {
        fs::read_to_string(filename)
    }
}

fn open_output(filename: &str) -> io::Result<OutputSink> {
    if filename.is_empty() || filename == "-" {
        Ok(OutputSink::new(io::stdout()))
    } else {
        Ok(OutputSink::new(fs::File::create(filename)?))
    }
}

fn run() -> i32 {
    let args: Vec<String> = env::args().skip(1).collect();

    let options = match Options::parse(&args) {
        Ok(options) => options,
        Err(CliError::Help) => {
            print_usage(None);
            return 1;
        }
        Err(CliError::Version) => {
            println!("tpath version {}", env!("CARGO_PKG_VERSION"));
            return 0;
        }
        Err(CliError::Usage(msg)) => {
            print_usage(Some(&msg));
            return 1;
        }
    };

    let source = match read_input(&options.input_filename) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{}: {}", options.input_filename, e);
            return 1;
        }
    };

    let sink = match open_output(&options.output_filename) {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!("{}: {}", options.output_filename, e);
            return 1;
        }
    };

    let report = run_program(&source, &options.input_filename, &options, sink);

    for diagnostic in &report.diagnostics {
        eprintln!("{}", diagnostic);
    }

    if let Some(listing) = &report.chunk_listing {
        eprint!("{}", listing);
    }

    match report.status {
        RunStatus::Success { pen_warning } => {
            if let Some(loc) = pen_warning {
                if !options.disable_pen_warning {
                    eprintln!(
                        "{}",
                        Diagnostic::warning(
                            loc,
                            "Pen height became negative. Results may be incorrect."
                        )
                    );
                }
            }

            0
        }

        RunStatus::ParseFailed => 1,

        RunStatus::RuntimeError {
            message,
            location,
            backtrace,
        } => {
            eprintln!("{}", Diagnostic::error(location, message));

            if let Some(backtrace) = backtrace {
                eprint!("{}", backtrace);
            }

            1
        }
    }
}

fn main() {
    std::process::exit(run());
}
