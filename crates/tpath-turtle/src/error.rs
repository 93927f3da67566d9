use std::fmt;
use std::io;

/// Runtime errors raised by turtle commands.
#[derive(Debug)]
pub enum TurtleError {
    /// `q`/`Q` with departure and arrival lines that never intersect.
    ParallelLines,
    /// `pop` with no saved turtle state.
    EmptyTurtleStack,
    /// `pop_matrix` with no saved matrix.
    EmptyMatrixStack,
    /// `reflection` around the zero vector.
    InvalidReflection,
    /// The output sink failed.
    Io(io::Error),
}

impl fmt::Display for TurtleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurtleError::ParallelLines => write!(f, "Parallel lines in q or Q command."),
            TurtleError::EmptyTurtleStack => write!(f, "Empty stack in 'pop' command."),
            TurtleError::EmptyMatrixStack => write!(f, "Empty stack in 'pop_matrix' command."),
            TurtleError::InvalidReflection => {
                write!(f, "Invalid reflection arguments x==0 and y==0.")
            }
            TurtleError::Io(e) => write!(f, "Output error: {}", e),
        }
    }
}

impl std::error::Error for TurtleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TurtleError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TurtleError {
    fn from(e: io::Error) -> Self {
        TurtleError::Io(e)
    }
}
