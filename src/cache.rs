use std::cell::RefCell;
use std::collections::HashMap;

/// In-memory memo of captured command output, keyed by the exact argument tokens.
///
/// Entries are write-once: the history is treated as immutable for the lifetime
/// of one analysis, so nothing is ever invalidated. Each analysis owns its own
/// cache, which keeps repeated runs in one process from seeing each other's output.
#[derive(Debug, Default)]
pub struct CommandCache {
    entries: RefCell<HashMap<Vec<String>, String>>,
}

impl CommandCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, args: &[String]) -> Option<String> {
        self.entries.borrow().get(args).cloned()
    }

    /// Store `output` unless the key is already present. Returns the cached value.
    pub fn insert(&self, args: &[String], output: String) -> String {
        self.entries
            .borrow_mut()
            .entry(args.to_vec())
            .or_insert(output)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
