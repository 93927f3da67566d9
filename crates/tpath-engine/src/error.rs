use std::fmt;

use tpath_turtle::TurtleError;

/// Errors raised while executing a program.
#[derive(Debug)]
pub enum RuntimeError {
    /// Either stack grew past the configured limit.
    InfiniteRecursion,
    /// A turtle command failed.
    Turtle(TurtleError),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::InfiniteRecursion => write!(
                f,
                "Stack overflow - probably due to infinitely recursive user-defined command function"
            ),
            RuntimeError::Turtle(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::Turtle(e) => Some(e),
            RuntimeError::InfiniteRecursion => None,
        }
    }
}

impl From<TurtleError> for RuntimeError {
    fn from(e: TurtleError) -> Self {
        RuntimeError::Turtle(e)
    }
}
