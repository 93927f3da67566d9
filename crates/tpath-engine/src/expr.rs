//! The expression tree.
//!
//! An [`Expr`] is either a compile-time constant or a closed nullary
//! evaluator over the runtime state (stack reads, turtle properties, the
//! `unique` counter). The combiners fold aggressively: when every operand is
//! constant the primitive runs at parse time and the result is a constant.
//!
//! `&&` and `||` are strict — both operands are always evaluated — which
//! keeps `unique` consumption independent of operand values.

use crate::chunk::ValueDomain;

/// A compiled expression.
#[derive(Clone, Debug)]
pub enum Expr {
    Const(f64),
    Eval(Box<Eval>),
}

/// A non-constant expression node.
#[derive(Clone, Debug)]
pub enum Eval {
    /// Read a local, relative to the current frame.
    Local(i32),
    /// Read a local by absolute index.
    Global(i32),
    /// Read through the current closure.
    Capture(i32),

    TurtleX,
    TurtleY,
    TurtleDir,
    /// The next monotonic integer, starting at 1.
    Unique,

    Unary(UnaryOp, Expr),
    Binary(BinaryOp, Expr, Expr),
    /// Condition, then-arm, else-arm. Only the winning arm is evaluated.
    Ternary(Expr, Expr, Expr),
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn apply(self, rhs: f64) -> f64 {
        match self {
            UnaryOp::Neg => -rhs,
            UnaryOp::Not => {
                if rhs != 0.0 {
                    0.0
                } else {
                    1.0
                }
            }
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        fn bool_val(b: bool) -> f64 {
            if b {
                1.0
            } else {
                0.0
            }
        }

        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            // IEEE semantics pass through; no zero check.
            BinaryOp::Div => lhs / rhs,
            BinaryOp::Pow => lhs.powf(rhs),
            BinaryOp::Eq => bool_val(lhs == rhs),
            BinaryOp::Ne => bool_val(lhs != rhs),
            BinaryOp::Lt => bool_val(lhs < rhs),
            BinaryOp::Gt => bool_val(lhs > rhs),
            BinaryOp::Le => bool_val(lhs <= rhs),
            BinaryOp::Ge => bool_val(lhs >= rhs),
            BinaryOp::And => {
                if lhs != 0.0 && rhs != 0.0 {
                    rhs
                } else {
                    0.0
                }
            }
            BinaryOp::Or => {
                if lhs != 0.0 {
                    lhs
                } else if rhs != 0.0 {
                    rhs
                } else {
                    0.0
                }
            }
        }
    }
}

impl Expr {
    pub fn constant(val: f64) -> Expr {
        Expr::Const(val)
    }

    /// A read from the given domain at a fixed offset.
    pub fn read(domain: ValueDomain, offset: i32) -> Expr {
        let node = match domain {
            ValueDomain::Local => Eval::Local(offset),
            ValueDomain::Global => Eval::Global(offset),
            ValueDomain::Capture => Eval::Capture(offset),
        };

        Expr::Eval(Box::new(node))
    }

    pub fn as_const(&self) -> Option<f64> {
        match self {
            Expr::Const(v) => Some(*v),
            Expr::Eval(_) => None,
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(self, Expr::Const(_))
    }

    /// Build a unary expression, folding constants.
    pub fn unary(op: UnaryOp, rhs: Expr) -> Expr {
        match rhs {
            Expr::Const(v) => Expr::Const(op.apply(v)),
            rhs => Expr::Eval(Box::new(Eval::Unary(op, rhs))),
        }
    }

    /// Build a binary expression, folding constants.
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        match (lhs, rhs) {
            (Expr::Const(a), Expr::Const(b)) => Expr::Const(op.apply(a, b)),
            (lhs, rhs) => Expr::Eval(Box::new(Eval::Binary(op, lhs, rhs))),
        }
    }

    /// Build a conditional expression, folding when all three operands are
    /// constant.
    pub fn ternary(cond: Expr, then: Expr, otherwise: Expr) -> Expr {
        match (cond, then, otherwise) {
            (Expr::Const(c), Expr::Const(t), Expr::Const(o)) => {
                Expr::Const(if c != 0.0 { t } else { o })
            }
            (cond, then, otherwise) => Expr::Eval(Box::new(Eval::Ternary(cond, then, otherwise))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cst(v: f64) -> Expr {
        Expr::constant(v)
    }

    #[test]
    fn binary_folding_is_lossless() {
        let cases = [
            (BinaryOp::Add, 2.0, 3.0, 5.0),
            (BinaryOp::Sub, 2.0, 3.0, -1.0),
            (BinaryOp::Mul, 4.0, 2.5, 10.0),
            (BinaryOp::Div, 9.0, 2.0, 4.5),
            (BinaryOp::Pow, 2.0, 10.0, 1024.0),
            (BinaryOp::Eq, 1.0, 1.0, 1.0),
            (BinaryOp::Ne, 1.0, 1.0, 0.0),
            (BinaryOp::Lt, 1.0, 2.0, 1.0),
            (BinaryOp::Gt, 1.0, 2.0, 0.0),
            (BinaryOp::Le, 2.0, 2.0, 1.0),
            (BinaryOp::Ge, 1.0, 2.0, 0.0),
        ];

        for (op, a, b, want) in cases {
            match Expr::binary(op, cst(a), cst(b)) {
                Expr::Const(v) => assert_eq!(v, want, "{:?}", op),
                other => panic!("{:?} did not fold: {:?}", op, other),
            }
        }
    }

    #[test]
    fn logic_keeps_operand_values() {
        // a || b yields a if truthy, else b if truthy, else 0.
        assert_eq!(Expr::binary(BinaryOp::Or, cst(3.0), cst(5.0)).as_const(), Some(3.0));
        assert_eq!(Expr::binary(BinaryOp::Or, cst(0.0), cst(5.0)).as_const(), Some(5.0));
        assert_eq!(Expr::binary(BinaryOp::Or, cst(0.0), cst(0.0)).as_const(), Some(0.0));

        // a && b yields b when both are truthy.
        assert_eq!(Expr::binary(BinaryOp::And, cst(3.0), cst(5.0)).as_const(), Some(5.0));
        assert_eq!(Expr::binary(BinaryOp::And, cst(0.0), cst(5.0)).as_const(), Some(0.0));
    }

    #[test]
    fn unary_folding() {
        assert_eq!(Expr::unary(UnaryOp::Neg, cst(4.0)).as_const(), Some(-4.0));
        assert_eq!(Expr::unary(UnaryOp::Not, cst(4.0)).as_const(), Some(0.0));
        assert_eq!(Expr::unary(UnaryOp::Not, cst(0.0)).as_const(), Some(1.0));
    }

    #[test]
    fn ternary_folds_when_fully_constant() {
        assert_eq!(
            Expr::ternary(cst(1.0), cst(10.0), cst(20.0)).as_const(),
            Some(10.0)
        );
        assert_eq!(
            Expr::ternary(cst(0.0), cst(10.0), cst(20.0)).as_const(),
            Some(20.0)
        );
    }

    #[test]
    fn non_constant_operands_defer() {
        let e = Expr::binary(BinaryOp::Add, Expr::read(ValueDomain::Local, 0), cst(1.0));
        assert!(!e.is_const());

        let e = Expr::ternary(Expr::read(ValueDomain::Local, 0), cst(1.0), cst(2.0));
        assert!(!e.is_const());
    }

    #[test]
    fn division_passes_ieee_through() {
        assert_eq!(
            Expr::binary(BinaryOp::Div, cst(1.0), cst(0.0)).as_const(),
            Some(f64::INFINITY)
        );
    }
}
