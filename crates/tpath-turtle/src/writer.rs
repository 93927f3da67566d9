//! SVG path-data formatting.
//!
//! [`PathWriter`] turns the stream of commands, numbers, and flags produced
//! by the turtle into path data. The writer owns the spacing rules for the
//! three output formats; the turtle only says *what* to emit.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// How the path data is laid out.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum OutputFormat {
    /// One space between tokens, commands glued to their first number.
    #[default]
    Normal,
    /// No separators beyond those between adjacent numbers.
    Optimized,
    /// Each command starts on its own line.
    Pretty,
}

/// A cloneable handle to the output stream.
///
/// The turtle writes path data through it; with tracing enabled the debugger
/// writes trace lines through a clone of the same handle, so traces stay
/// interleaved with the output they explain.
#[derive(Clone)]
pub struct OutputSink {
    inner: Rc<RefCell<dyn Write>>,
}

/// Test-side handle to a buffered [`OutputSink`].
#[derive(Clone)]
pub struct BufferHandle {
    inner: Rc<RefCell<Vec<u8>>>,
}

impl OutputSink {
    pub fn new<W: Write + 'static>(w: W) -> Self {
        Self {
            inner: Rc::new(RefCell::new(w)),
        }
    }

    /// An in-memory sink plus a handle to read back what was written.
    pub fn buffer() -> (Self, BufferHandle) {
        let buf = Rc::new(RefCell::new(Vec::new()));
        let sink = Self {
            inner: buf.clone(),
        };
        (sink, BufferHandle { inner: buf })
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.borrow_mut().flush()
    }
}

impl BufferHandle {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.borrow()).into_owned()
    }
}

/// Format a number to at most `places` decimals, trimming trailing zeros.
pub fn format_number(val: f64, places: i32) -> String {
    let mut s = format!("{:.*}", places.max(0) as usize, val);

    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }

    if s == "-0" {
        s = "0".to_string();
    }

    s
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum ItemKind {
    Command,
    ZCommand,
    Number,
    Whitespace,
    Newline,
}

/// The path-data writer.
pub struct PathWriter {
    sink: OutputSink,
    previous: ItemKind,
    decimal_places: i32,
    format: OutputFormat,
    first_command: bool,
}

impl PathWriter {
    pub fn new(sink: OutputSink) -> Self {
        Self {
            sink,
            previous: ItemKind::Whitespace,
            decimal_places: 4,
            format: OutputFormat::Normal,
            first_command: true,
        }
    }

    pub fn set_decimal_places(&mut self, n: i32) {
        debug_assert!(n >= 0);
        self.decimal_places = n;
    }

    pub fn set_format(&mut self, format: OutputFormat) {
        self.format = format;
    }

    fn prev_is_whitespace(&self) -> bool {
        matches!(self.previous, ItemKind::Whitespace | ItemKind::Newline)
    }

    /// Emit an SVG command character. Space and newline are accepted too
    /// (the `sp` and `nl` commands) and are dropped in optimized format.
    pub fn emit_char(&mut self, ch: char) -> io::Result<()> {
        match ch {
            ' ' | '\n' => {
                if self.format != OutputFormat::Optimized {
                    write!(self.sink, "{}", ch)?;
                    self.previous = if ch == ' ' {
                        ItemKind::Whitespace
                    } else {
                        ItemKind::Newline
                    };
                }
            }

            _ => {
                if std::mem::take(&mut self.first_command) && ch != 'm' && ch != 'M' {
                    write!(self.sink, "M0 0")?;
                    self.previous = ItemKind::Number;
                }

                match self.format {
                    OutputFormat::Pretty => {
                        writeln!(self.sink)?;
                        self.previous = ItemKind::Newline;
                    }
                    OutputFormat::Normal => {
                        if !self.prev_is_whitespace() {
                            write!(self.sink, " ")?;
                        }
                    }
                    OutputFormat::Optimized => {}
                }

                write!(self.sink, "{}", ch)?;

                self.previous = if ch == 'z' || ch == 'Z' {
                    ItemKind::ZCommand
                } else {
                    ItemKind::Command
                };
            }
        }

        Ok(())
    }

    pub fn emit_flag(&mut self, flag: bool) -> io::Result<()> {
        debug_assert!(!self.first_command);

        if self.previous == ItemKind::Number {
            write!(self.sink, " ")?;
        }
        self.previous = ItemKind::Number;

        write!(self.sink, "{}", if flag { '1' } else { '0' })
    }

    pub fn emit_number(&mut self, val: f64) -> io::Result<()> {
        debug_assert!(!self.first_command);

        if self.previous == ItemKind::Number {
            write!(self.sink, " ")?;
        }
        self.previous = ItemKind::Number;

        write!(self.sink, "{}", format_number(val, self.decimal_places))
    }

    /// Terminate the output; a non-empty normal-format stream gets a final
    /// newline.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.format == OutputFormat::Normal
            && !self.first_command
            && self.previous != ItemKind::Newline
        {
            writeln!(self.sink)?;
        }

        self.sink.flush()
    }
}
