//! Name definitions.
//!
//! Names live in an arena ([`NameTable`]) and are addressed by [`NameId`];
//! scope maps and capture lists store ids, so "same definition" is id
//! equality. Definitions are mutated only while parsing (offset assignment,
//! constant folding, capture collection) and are effectively frozen once
//! their enclosing chunk is finished.

use smallvec::SmallVec;

use tpath_core::Location;

use crate::signature::Signature;

/// Index into the [`NameTable`] arena.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct NameId(u32);

#[derive(Default)]
pub struct NameTable {
    defs: Vec<NameDef>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, def: NameDef) -> NameId {
        let id = NameId(self.defs.len() as u32);
        self.defs.push(def);
        id
    }

    pub fn get(&self, id: NameId) -> &NameDef {
        &self.defs[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: NameId) -> &mut NameDef {
        &mut self.defs[id.0 as usize]
    }
}

/// Data shared by everything callable: user functions, builtins, and lambda
/// parameters.
#[derive(Clone, Debug, Default)]
pub struct CallableData {
    /// Chunk index; unused for lambda parameters (their chunk index arrives
    /// on the stack at call time).
    pub chunk: usize,
    pub signature: Signature,
    /// One descriptive entry per parameter, for error messages.
    pub param_names: Vec<String>,
}

#[derive(Clone, Debug)]
pub enum NameKind {
    Value {
        /// Set when the definition folded to a compile-time constant.
        constexpr_value: Option<f64>,
    },

    Function {
        data: CallableData,
        /// Captured outer names, in first-seen order, no duplicates.
        captures: SmallVec<[NameId; 4]>,
    },

    /// A lambda parameter: callable, but bound at call time.
    Lambda { data: CallableData },
}

#[derive(Clone, Debug)]
pub struct NameDef {
    pub name: String,
    pub loc: Location,

    /// 0 for builtins, 1 for the global file context, +1 per nested body.
    pub context_depth: i32,

    /// Locals-frame offset; -1 until assigned.
    pub stack_offset: i32,

    /// True while a value definition's right-hand side is being parsed, so
    /// self-reference is caught.
    pub uninitialized: bool,

    pub kind: NameKind,
}

impl NameDef {
    fn new(kind: NameKind) -> Self {
        Self {
            name: String::new(),
            loc: Location::NONE,
            context_depth: 0,
            stack_offset: -1,
            uninitialized: false,
            kind,
        }
    }

    pub fn value() -> Self {
        Self::new(NameKind::Value {
            constexpr_value: None,
        })
    }

    pub fn function() -> Self {
        Self::new(NameKind::Function {
            data: CallableData::default(),
            captures: SmallVec::new(),
        })
    }

    pub fn lambda() -> Self {
        Self::new(NameKind::Lambda {
            data: CallableData::default(),
        })
    }

    pub fn setup_decl(&mut self, name: &str, loc: Location, context_depth: i32) {
        self.name = name.to_string();
        self.loc = loc;
        self.context_depth = context_depth;
    }

    pub fn is_value(&self) -> bool {
        matches!(self.kind, NameKind::Value { .. })
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, NameKind::Function { .. })
    }

    pub fn is_lambda(&self) -> bool {
        matches!(self.kind, NameKind::Lambda { .. })
    }

    pub fn constexpr_value(&self) -> Option<f64> {
        match &self.kind {
            NameKind::Value { constexpr_value } => *constexpr_value,
            _ => None,
        }
    }

    pub fn set_constexpr_value(&mut self, val: f64) {
        debug_assert_eq!(self.stack_offset, -1);

        match &mut self.kind {
            NameKind::Value { constexpr_value } => *constexpr_value = Some(val),
            _ => debug_assert!(false, "constexpr on a non-value"),
        }
    }

    /// Callable view of a function or lambda parameter.
    pub fn callable(&self) -> Option<&CallableData> {
        match &self.kind {
            NameKind::Function { data, .. } | NameKind::Lambda { data } => Some(data),
            NameKind::Value { .. } => None,
        }
    }

    pub fn callable_mut(&mut self) -> Option<&mut CallableData> {
        match &mut self.kind {
            NameKind::Function { data, .. } | NameKind::Lambda { data } => Some(data),
            NameKind::Value { .. } => None,
        }
    }

    pub fn captures(&self) -> &[NameId] {
        match &self.kind {
            NameKind::Function { captures, .. } => captures,
            _ => &[],
        }
    }

    pub fn add_capture(&mut self, id: NameId) {
        match &mut self.kind {
            NameKind::Function { captures, .. } => captures.push(id),
            _ => debug_assert!(false, "captures on a non-function"),
        }
    }

    /// Slots the name occupies when pushed as a value: 1 for a plain value,
    /// 2 for anything callable (chunk index + closure position).
    pub fn value_size(&self) -> i32 {
        match &self.kind {
            NameKind::Value { .. } => 1,
            NameKind::Function { .. } | NameKind::Lambda { .. } => 2,
        }
    }
}
