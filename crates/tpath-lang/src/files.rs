//! Source file registry.
//!
//! All parsers of one compilation (the main file and every imported module)
//! share a single map, so file ids stay consistent across the engine and
//! the debugger. A finished module's global context is stored here for
//! merging; a second import of the same path finds the id registered and
//! becomes a no-op.

use std::collections::BTreeMap;

use crate::scope::Context;

pub struct FileEntry {
    pub name: String,
    /// The module's extracted global context, once it finished parsing.
    pub global_context: Option<Context>,
}

#[derive(Default)]
pub struct FileMap {
    by_id: Vec<FileEntry>,
    by_name: BTreeMap<String, usize>,
}

impl FileMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file; returns `(file_id, is_new)`.
    pub fn add_file(&mut self, name: &str) -> (usize, bool) {
        if let Some(&id) = self.by_name.get(name) {
            return (id, false);
        }

        let id = self.by_id.len();

        self.by_id.push(FileEntry {
            name: name.to_string(),
            global_context: None,
        });
        self.by_name.insert(name.to_string(), id);

        (id, true)
    }

    pub fn entry(&self, id: usize) -> &FileEntry {
        &self.by_id[id]
    }

    pub fn entry_mut(&mut self, id: usize) -> &mut FileEntry {
        &mut self.by_id[id]
    }

    pub fn name(&self, id: usize) -> &str {
        &self.by_id[id].name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_stable() {
        let mut files = FileMap::new();

        let (a, new_a) = files.add_file("main.tp");
        let (b, new_b) = files.add_file("lib.tp");
        let (a2, new_a2) = files.add_file("main.tp");

        assert!(new_a && new_b && !new_a2);
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(files.name(a), "main.tp");
    }
}
