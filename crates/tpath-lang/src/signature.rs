//! Function signatures.
//!
//! A signature is a string over `{v, (, )}`:
//!
//! ```text
//! def fn(a b f1(c) f2(x y f3(z w)))   has signature   "vv(v)(vv(vv))"
//! ```
//!
//! `v` is a value parameter; `(...)` a lambda parameter with its own nested
//! signature. The [`Checker`] walks a signature while call arguments parse.

/// A function's parameter shape.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Signature {
    sig: String,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_value_param(&mut self) {
        self.sig.push('v');
    }

    pub fn start_lambda_param(&mut self) {
        self.sig.push('(');
    }

    pub fn finish_lambda_param(&mut self) {
        self.sig.push(')');
    }

    /// Splice a nested signature in (between start and finish of a lambda
    /// parameter).
    pub fn add_signature(&mut self, other: &Signature) {
        self.sig.push_str(&other.sig);
    }

    pub fn as_str(&self) -> &str {
        &self.sig
    }

    pub fn checker(&self) -> Checker<'_> {
        Checker {
            sig: self.sig.as_bytes(),
            pos: 0,
            paren_depth: 0,
        }
    }
}

/// Walks a signature while the call site's arguments are parsed.
pub struct Checker<'a> {
    sig: &'a [u8],
    pos: usize,
    paren_depth: i32,
}

impl Checker<'_> {
    fn current(&self) -> Option<u8> {
        self.sig.get(self.pos).copied()
    }

    fn next(&mut self) {
        match self.current() {
            Some(b'(') => self.paren_depth += 1,
            Some(b')') => self.paren_depth -= 1,
            _ => {}
        }

        self.pos += 1;
    }

    fn consume(&mut self, ch: u8) -> bool {
        if self.current() != Some(ch) {
            return false;
        }

        self.next();
        true
    }

    /// More parameters expected?
    pub fn more(&self) -> bool {
        self.current().is_some()
    }

    /// The next slot is a value parameter.
    pub fn consume_value(&mut self) -> bool {
        self.consume(b'v')
    }

    /// The next slot is a lambda parameter.
    pub fn consume_lambda_start(&mut self) -> bool {
        self.consume(b'(')
    }

    /// Check a passed function's signature against the lambda parameter's.
    /// The function may declare fewer parameters (extra call-site arguments
    /// are truncated at call entry) but not more.
    pub fn consume_lambda_sig(&mut self, sig: &Signature) -> bool {
        let mut other = sig.checker();

        loop {
            let a = self.current();
            let b = other.current();

            match (a, b) {
                (Some(x), Some(y)) if x == y => {
                    self.next();
                    other.next();
                }
                _ => break,
            }
        }

        !other.more()
    }

    /// Skip whatever remains of the current lambda parameter.
    pub fn consume_lambda_end(&mut self) -> bool {
        debug_assert!(self.paren_depth > 0);

        while self.more() && self.paren_depth > 0 {
            self.next();
        }

        self.paren_depth == 0
    }
}
