//! Named list containers: per-entry lists and sets, and the immutable
//! global lists loaded at startup.

use dj_core::values::ListKind;
use std::collections::HashSet;

/// A per-entry named container populated through block sinks and read by
/// `use`. Reset at the start of every input entry.
#[derive(Debug, Clone)]
pub struct NamedList {
    kind: ListKind,
    items: Vec<String>,
    seen: HashSet<String>,
}

impl NamedList {
    pub fn new(kind: ListKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn kind(&self) -> ListKind {
        self.kind
    }

    pub fn push(&mut self, entry: String) {
        match self.kind {
            ListKind::List => self.items.push(entry),
            ListKind::Set => {
                if self.seen.insert(entry.clone()) {
                    self.items.push(entry);
                }
            }
        }
    }

    pub fn extend<I: IntoIterator<Item = String>>(&mut self, entries: I) {
        for entry in entries {
            self.push(entry);
        }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.seen.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A process-wide list loaded from a file at startup; immutable afterwards.
#[derive(Debug, Clone)]
pub struct GlobalList {
    items: Vec<String>,
}

impl GlobalList {
    /// Builds from already-filtered lines, collapsing duplicates for sets.
    pub fn new(kind: ListKind, entries: Vec<String>) -> Self {
        let items = match kind {
            ListKind::List => entries,
            ListKind::Set => {
                let mut seen = HashSet::new();
                entries
                    .into_iter()
                    .filter(|e| seen.insert(e.clone()))
                    .collect()
            }
        };
        Self { items }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_keeps_duplicates() {
        let mut list = NamedList::new(ListKind::List);
        list.extend(["a".to_string(), "a".to_string(), "b".to_string()]);
        assert_eq!(list.items(), ["a", "a", "b"]);
    }

    #[test]
    fn test_set_collapses_duplicates_in_order() {
        let mut set = NamedList::new(ListKind::Set);
        set.extend(["b".to_string(), "a".to_string(), "b".to_string()]);
        assert_eq!(set.items(), ["b", "a"]);
    }

    #[test]
    fn test_clear_resets_set_membership() {
        let mut set = NamedList::new(ListKind::Set);
        set.push("a".to_string());
        set.clear();
        set.push("a".to_string());
        assert_eq!(set.items(), ["a"]);
    }

    #[test]
    fn test_global_set_dedups() {
        let g = GlobalList::new(
            ListKind::Set,
            vec!["x".to_string(), "y".to_string(), "x".to_string()],
        );
        assert_eq!(g.items(), ["x", "y"]);
    }
}
