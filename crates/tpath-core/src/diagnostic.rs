use std::fmt;

use crate::location::SourceFileLocation;

/// Severity level of a diagnostic.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// The label printed in front of the message.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Info => "Info",
        }
    }
}

/// A diagnostic message with its source location.
///
/// Diagnostics are collected during parsing and rendered by the driver in
/// the order they were produced.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub loc: SourceFileLocation,
}

impl Diagnostic {
    pub fn error(loc: SourceFileLocation, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            loc,
        }
    }

    pub fn warning(loc: SourceFileLocation, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            loc,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}: {}", self.loc, self.severity.label(), self.message)
    }
}
