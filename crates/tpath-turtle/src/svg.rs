//! The optional SVG document envelope around the path output.

use std::io::{self, Write};

use crate::writer::OutputSink;

/// Configuration for the `<svg>` wrapper.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SvgConfig {
    pub width: i64,
    pub height: i64,
    pub background_color: String,
    pub fill_color: String,
    pub stroke_color: String,
    pub stroke_width: String,
    pub stroke_linejoin: String,
    pub stroke_linecap: String,
}

impl Default for SvgConfig {
    fn default() -> Self {
        Self {
            width: 500,
            height: 500,
            background_color: "white".to_string(),
            fill_color: "lightblue".to_string(),
            stroke_color: "black".to_string(),
            stroke_width: "1.5".to_string(),
            stroke_linejoin: "round".to_string(),
            stroke_linecap: "round".to_string(),
        }
    }
}

impl SvgConfig {
    /// Parse a `--svg-out` configuration string: width and height, then
    /// optional background, fill, stroke, stroke-width, linejoin, linecap.
    /// Returns None when width or height is missing or malformed.
    pub fn parse(config: &str) -> Option<Self> {
        let mut out = Self::default();
        let mut words = config.split_whitespace();

        out.width = words.next()?.parse().ok()?;
        out.height = words.next()?.parse().ok()?;

        let fields = [
            &mut out.background_color,
            &mut out.fill_color,
            &mut out.stroke_color,
            &mut out.stroke_width,
            &mut out.stroke_linejoin,
            &mut out.stroke_linecap,
        ];

        for field in fields {
            match words.next() {
                Some(w) => *field = w.to_string(),
                None => break,
            }
        }

        Some(out)
    }

    pub fn write_header(&self, out: &mut OutputSink) -> io::Result<()> {
        writeln!(
            out,
            r#"<svg viewbox="0 0 {w} {h}" width="{w}" height="{h}" xmlns="http://www.w3.org/2000/svg">"#,
            w = self.width,
            h = self.height,
        )?;

        if !self.background_color.is_empty() {
            writeln!(
                out,
                r#"<rect x="0" y="0" width="100%" height="100%" fill="{}"/>"#,
                self.background_color,
            )?;
        }

        write!(
            out,
            r#"<path fill="{}" stroke="{}" stroke-width="{}" stroke-linejoin="{}" stroke-linecap="{}" d=""#,
            self.fill_color,
            self.stroke_color,
            self.stroke_width,
            self.stroke_linejoin,
            self.stroke_linecap,
        )
    }

    pub fn write_footer(&self, out: &mut OutputSink) -> io::Result<()> {
        writeln!(out, "\"/>")?;
        writeln!(out, "</svg>")
    }
}
