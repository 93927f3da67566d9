//! The lexical context stack.
//!
//! A stack of ordered name maps. The bottom context is the global file
//! context; each function or block body pushes one. Imports extract a
//! finished module's innermost context and merge it into the importer's.

use std::collections::BTreeMap;

use crate::names::NameId;

/// One lexical context: name to definition.
pub type Context = BTreeMap<String, NameId>;

#[derive(Default)]
pub struct ScopeStack {
    stack: Vec<Context>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_context(&mut self) {
        self.stack.push(Context::new());
    }

    pub fn pop_context(&mut self) {
        debug_assert!(!self.stack.is_empty());

        self.stack.pop();
    }

    /// Define in the innermost context; false if the name already exists
    /// there.
    pub fn define(&mut self, name: &str, id: NameId) -> bool {
        debug_assert!(!self.stack.is_empty());

        match self.stack.last_mut() {
            Some(context) => {
                if context.contains_key(name) {
                    false
                } else {
                    context.insert(name.to_string(), id);
                    true
                }
            }
            None => false,
        }
    }

    /// Innermost-out lookup.
    pub fn lookup(&self, name: &str) -> Option<NameId> {
        for context in self.stack.iter().rev() {
            if let Some(id) = context.get(name) {
                return Some(*id);
            }
        }

        None
    }

    /// Remove and return the innermost context (for storing a finished
    /// module's names).
    pub fn extract_innermost(&mut self) -> Context {
        debug_assert!(!self.stack.is_empty());

        self.stack.pop().unwrap_or_default()
    }

    /// Merge names into the innermost context. Duplicates are not copied
    /// (the existing definition wins) and are returned for reporting.
    pub fn import_names(&mut self, other: &Context) -> Vec<String> {
        debug_assert!(!self.stack.is_empty());

        let mut duplicates = Vec::new();

        if let Some(context) = self.stack.last_mut() {
            for (name, id) in other {
                if context.contains_key(name) {
                    duplicates.push(name.clone());
                } else {
                    context.insert(name.clone(), *id);
                }
            }
        }

        duplicates
    }
}
