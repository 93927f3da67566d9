//! The builtin command set.
//!
//! Each language-level turtle command is one [`TurtleOp`] variant with a
//! fixed arity; the engine reads the arguments off its frame and dispatches
//! here with a single match.

use crate::error::TurtleError;
use crate::turtle::PathTurtle;

/// One variant per builtin turtle command.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TurtleOp {
    Rotation,
    Scaling,
    Shearing,
    Reflection,
    Translation,
    PushMatrix,
    PopMatrix,

    Close,
    MoveBy,
    MoveTo,
    SetDir,
    Right,
    Left,
    Forward,
    Jump,
    Arc,
    QuadBy,
    QuadTo,
    SmoothQuad,
    CurveBy,
    CurveTo,
    SmoothBy,
    SmoothTo,

    AdjacentForHypotenuse,
    AdjacentForOpposite,
    HypotenuseForAdjacent,
    HypotenuseForOpposite,
    HypotenuseForBoth,

    Aim,
    Orbit,
    Ellipse,

    PenUp,
    PenDown,
    Push,
    Pop,

    Newline,
    Space,
}

impl TurtleOp {
    /// Number of value parameters the command takes.
    pub fn arity(self) -> usize {
        use TurtleOp::*;

        match self {
            Close | PushMatrix | PopMatrix | PenUp | PenDown | Push | Pop | Newline | Space => 0,
            Rotation | SetDir | Right | Left | Forward | Jump | SmoothQuad => 1,
            Scaling | Shearing | Reflection | Translation | MoveBy | MoveTo | Arc | Aim
            | AdjacentForHypotenuse | AdjacentForOpposite | HypotenuseForAdjacent
            | HypotenuseForOpposite | HypotenuseForBoth | Ellipse => 2,
            QuadBy | QuadTo | Orbit => 3,
            SmoothBy | SmoothTo => 4,
            CurveBy | CurveTo => 6,
        }
    }
}

impl PathTurtle {
    /// Dispatch a builtin command. `args` must hold exactly `op.arity()`
    /// values.
    pub fn run_op(&mut self, op: TurtleOp, args: &[f64]) -> Result<(), TurtleError> {
        debug_assert_eq!(args.len(), op.arity());

        use TurtleOp::*;

        match op {
            Rotation => self.rotation(args[0]),
            Scaling => self.scaling(args[0], args[1]),
            Shearing => self.shearing(args[0], args[1]),
            Reflection => self.reflection(args[0], args[1])?,
            Translation => self.translation(args[0], args[1]),
            PushMatrix => self.push_matrix(),
            PopMatrix => self.pop_matrix()?,

            Close => self.close()?,
            MoveBy => self.move_by(args[0], args[1]),
            MoveTo => self.move_to(args[0], args[1]),
            SetDir => self.set_dir(args[0]),
            Right => self.right(args[0]),
            Left => self.left(args[0]),
            Forward => self.forward(args[0])?,
            Jump => self.jump(args[0]),
            Arc => self.arc(args[0], args[1])?,
            QuadBy => self.quad_by(args[0], args[1], args[2])?,
            QuadTo => self.quad_to(args[0], args[1], args[2])?,
            SmoothQuad => self.smooth_quad(args[0])?,
            CurveBy => self.curve_by(args[0], args[1], args[2], args[3], args[4], args[5])?,
            CurveTo => self.curve_to(args[0], args[1], args[2], args[3], args[4], args[5])?,
            SmoothBy => self.smooth_by(args[0], args[1], args[2], args[3])?,
            SmoothTo => self.smooth_to(args[0], args[1], args[2], args[3])?,

            AdjacentForHypotenuse => self.adjacent_for_hypotenuse(args[0], args[1])?,
            AdjacentForOpposite => self.adjacent_for_opposite(args[0], args[1])?,
            HypotenuseForAdjacent => self.hypotenuse_for_adjacent(args[0], args[1])?,
            HypotenuseForOpposite => self.hypotenuse_for_opposite(args[0], args[1])?,
            HypotenuseForBoth => self.hypotenuse_for_both(args[0], args[1])?,

            Aim => self.aim(args[0], args[1]),
            Orbit => self.orbit(args[0], args[1], args[2])?,
            Ellipse => self.ellipse(args[0], args[1])?,

            PenUp => self.pen_up(),
            PenDown => self.pen_down(),
            Push => self.push(),
            Pop => self.pop()?,

            Newline => self.newline()?,
            Space => self.space()?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{OutputSink, PathWriter};

    #[test]
    fn dispatch_matches_direct_calls() {
        let (sink, buf) = OutputSink::buffer();
        let mut writer = PathWriter::new(sink);
        writer.set_decimal_places(2);
        let mut t = PathTurtle::new(writer);

        t.run_op(TurtleOp::Forward, &[10.0]).unwrap();
        t.run_op(TurtleOp::Right, &[90.0]).unwrap();
        t.run_op(TurtleOp::Forward, &[10.0]).unwrap();
        t.run_op(TurtleOp::Close, &[]).unwrap();
        t.finish().unwrap();

        assert_eq!(buf.contents(), "M0 0 L10 0 L10 10 Z\n");
    }

    #[test]
    fn arity_table_is_consistent() {
        assert_eq!(TurtleOp::Close.arity(), 0);
        assert_eq!(TurtleOp::Forward.arity(), 1);
        assert_eq!(TurtleOp::MoveBy.arity(), 2);
        assert_eq!(TurtleOp::QuadBy.arity(), 3);
        assert_eq!(TurtleOp::SmoothBy.arity(), 4);
        assert_eq!(TurtleOp::CurveBy.arity(), 6);
    }

    #[test]
    fn errors_propagate_through_dispatch() {
        let (sink, _buf) = OutputSink::buffer();
        let mut t = PathTurtle::new(PathWriter::new(sink));

        assert!(matches!(
            t.run_op(TurtleOp::Pop, &[]),
            Err(TurtleError::EmptyTurtleStack)
        ));
    }
}
