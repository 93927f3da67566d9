//! Command-line options.
//!
//! `tpath [OPTIONS] [INFILE] [OUTFILE]` where `-` (or absence) means stdio.

use thiserror::Error;

use tpath_turtle::SvgConfig;

pub const USAGE: &str = r#"
Output
 --optimize           - drop unnecessary whitespace in output
 --decimal-places <N> - decimal places in output
 --prettyprint        - each SVG command on a separate line
 --no-pen-error       - disable the pen height warning

Debugging
 -s                   - wrap output in basic 500x500 SVG file
 --svg-out "w h [bg-color path-fill path-stroke stroke-width linejoin linecap]"
                      - same as -s, but configurable.
                         Defaults:
                          background color   = white
                          path fill color    = lightblue
                          path stroke color  = black
                          stroke-width       = 1.5
                          linejoin           = round
                          linecap            = round

 --debug              - line numbers on all errors; backtrace on exceptions
 --trace              - trace execution
 --trace-parse        - trace parsing
 --show-breaks        - show when the 'breakpoint' command is encountered
 --list-chunks        - show list of all functions and local blocks

Other
 -h,--help            - show this help
 --version            - print program version

If INFILE is "-" or "" or not present, defaults to stdin.
If OUTFILE is "-" or "" or not present, defaults to stdout.
"#;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    /// `-h` / `--help`.
    #[error("help requested")]
    Help,
    /// `--version`.
    #[error("version requested")]
    Version,
}

#[derive(Clone, Debug)]
pub struct Options {
    pub input_filename: String,
    pub output_filename: String,

    pub optimize: bool,
    pub prettyprint: bool,
    pub decimal_places: i32,
    pub disable_pen_warning: bool,

    pub debug: bool,
    pub call_trace_level: i32,
    pub parse_trace_level: i32,
    pub list_chunks: bool,
    pub report_breakpoints: bool,

    pub svg_out: Option<SvgConfig>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            input_filename: String::new(),
            output_filename: String::new(),
            optimize: false,
            prettyprint: false,
            decimal_places: 2,
            disable_pen_warning: false,
            debug: false,
            call_trace_level: 0,
            parse_trace_level: 0,
            list_chunks: false,
            report_breakpoints: false,
            svg_out: None,
        }
    }
}

impl Options {
    /// Parse the argument list (without the program name).
    pub fn parse(args: &[String]) -> Result<Options, CliError> {
        let mut opt = Options::default();

        let mut end_of_options = false;
        let mut has_input = false;
        let mut has_output = false;

        let mut i = 0;

        while i < args.len() {
            let arg = args[i].as_str();

            let is_opt = |s: &str| !end_of_options && arg == s;

            if is_opt("--") {
                end_of_options = true;
            } else if is_opt("--help") || is_opt("-h") {
                return Err(CliError::Help);
            } else if is_opt("--version") {
                return Err(CliError::Version);
            } else if is_opt("--debug") {
                opt.debug = true;
            } else if is_opt("--trace") {
                opt.call_trace_level += 1;
            } else if is_opt("--trace-parse") {
                opt.parse_trace_level += 1;
            } else if is_opt("--list-chunks") {
                opt.list_chunks = true;
            } else if is_opt("--show-breaks") {
                opt.report_breakpoints = true;
            } else if is_opt("--optimize") {
                opt.optimize = true;
            } else if is_opt("--prettyprint") {
                opt.prettyprint = true;
            } else if is_opt("--no-pen-error") {
                opt.disable_pen_warning = true;
            } else if is_opt("-s") {
                opt.svg_out = Some(SvgConfig::default());
            } else if is_opt("--decimal-places") {
                i += 1;

                let value = args
                    .get(i)
                    .ok_or_else(|| CliError::Usage("--decimal-places requires a number".into()))?;

                opt.decimal_places = value
                    .parse()
                    .map_err(|_| CliError::Usage("--decimal-places: invalid number".into()))?;
            } else if is_opt("--svg-out") {
                i += 1;

                let value = args.get(i).ok_or_else(|| {
                    CliError::Usage("--svg-out requires width,height[,...]".into())
                })?;

                opt.svg_out = Some(SvgConfig::parse(value).ok_or_else(|| {
                    CliError::Usage("Invalid config for --svg-out option".into())
                })?);
            } else if !end_of_options && arg.starts_with('-') && arg.len() > 1 {
                return Err(CliError::Usage(format!("Unrecognized option: {}", arg)));
            } else if !has_input {
                has_input = true;
                opt.input_filename = arg.to_string();
            } else if !has_output {
                has_output = true;
                opt.output_filename = arg.to_string();
            } else {
                return Err(CliError::Usage("Too many filenames.".into()));
            }

            i += 1;
        }

        // Any trace or listing option implies full debug bookkeeping.
        if opt.call_trace_level > 0
            || opt.parse_trace_level > 0
            || opt.list_chunks
            || opt.report_breakpoints
        {
            opt.debug = true;
        }

        if opt.optimize && opt.prettyprint {
            return Err(CliError::Usage(
                "Only one of --optimize or --prettyprint is allowed".into(),
            ));
        }

        Ok(opt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options, CliError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        Options::parse(&args)
    }

    #[test]
    fn defaults() {
        let opt = parse(&[]).unwrap();
        assert_eq!(opt.decimal_places, 2);
        assert!(!opt.debug);
        assert!(opt.svg_out.is_none());
        assert_eq!(opt.input_filename, "");
    }

    #[test]
    fn filenames_in_order() {
        let opt = parse(&["in.tp", "out.svg"]).unwrap();
        assert_eq!(opt.input_filename, "in.tp");
        assert_eq!(opt.output_filename, "out.svg");

        assert!(matches!(
            parse(&["a", "b", "c"]),
            Err(CliError::Usage(_))
        ));
    }

    #[test]
    fn trace_is_additive_and_implies_debug() {
        let opt = parse(&["--trace", "--trace"]).unwrap();
        assert_eq!(opt.call_trace_level, 2);
        assert!(opt.debug);
    }

    #[test]
    fn optimize_and_prettyprint_conflict() {
        assert!(matches!(
            parse(&["--optimize", "--prettyprint"]),
            Err(CliError::Usage(_))
        ));
    }

    #[test]
    fn decimal_places_requires_number() {
        assert!(matches!(
            parse(&["--decimal-places"]),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            parse(&["--decimal-places", "x"]),
            Err(CliError::Usage(_))
        ));

        let opt = parse(&["--decimal-places", "4"]).unwrap();
        assert_eq!(opt.decimal_places, 4);
    }

    #[test]
    fn svg_out_configures_the_envelope() {
        let opt = parse(&["--svg-out", "300 200 black"]).unwrap();
        let svg = opt.svg_out.unwrap();
        assert_eq!((svg.width, svg.height), (300, 200));
        assert_eq!(svg.background_color, "black");

        assert!(matches!(
            parse(&["--svg-out", "nope"]),
            Err(CliError::Usage(_))
        ));
    }

    #[test]
    fn double_dash_ends_options() {
        let opt = parse(&["--", "--optimize"]).unwrap();
        assert!(!opt.optimize);
        assert_eq!(opt.input_filename, "--optimize");
    }

    #[test]
    fn lone_dash_is_a_filename() {
        let opt = parse(&["-"]).unwrap();
        assert_eq!(opt.input_filename, "-");
    }

    #[test]
    fn unrecognized_option() {
        assert!(matches!(parse(&["--nope"]), Err(CliError::Usage(_))));
    }
}
