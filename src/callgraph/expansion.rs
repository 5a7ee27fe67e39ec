use std::collections::HashSet;

use super::record::FunctionKey;

/// Keys of the nodes currently expanded. Empty by default.
///
/// Expansion is keyed by identity, so a function shared by several callers is
/// open under all of them at once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpansionSet {
    expanded: HashSet<FunctionKey>,
}

impl ExpansionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership and returns whether the key is now expanded.
    pub fn toggle(&mut self, key: &FunctionKey) -> bool {
        if self.expanded.remove(key) {
            false
        } else {
            self.expanded.insert(key.clone());
            true
        }
    }

    pub fn expand(&mut self, key: FunctionKey) {
        self.expanded.insert(key);
    }

    pub fn is_expanded(&self, key: &FunctionKey) -> bool {
        self.expanded.contains(key)
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}
