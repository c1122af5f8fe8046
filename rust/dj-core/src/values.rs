//! The result value of applying one operation to one entry.

use serde::{Deserialize, Serialize};

/// What a single operation produced for a single input entry.
///
/// `NotApplicable` and an empty entry list are distinct outcomes: a
/// transformer that would return its input verbatim is not applicable,
/// while an extractor whose matches were all empty produced an empty list.
/// Combinators test the two cases separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Applied {
    NotApplicable,
    Entries(Vec<String>),
}

impl Applied {
    /// The operation did not apply.
    pub fn na() -> Self {
        Applied::NotApplicable
    }

    /// A single-entry result. An empty string collapses to an empty list.
    pub fn one(entry: String) -> Self {
        if entry.is_empty() {
            Applied::Entries(Vec::new())
        } else {
            Applied::Entries(vec![entry])
        }
    }

    /// Collect entries, dropping empty strings in situ.
    pub fn from_entries<I: IntoIterator<Item = String>>(entries: I) -> Self {
        Applied::Entries(entries.into_iter().filter(|e| !e.is_empty()).collect())
    }

    /// A transformer result: not applicable when the output equals the input.
    pub fn changed(input: &str, output: String) -> Self {
        if output == input {
            Applied::NotApplicable
        } else {
            Applied::one(output)
        }
    }

    /// A filter verdict: the unmodified input on pass, N/A on reject.
    pub fn verdict(input: &str, pass: bool) -> Self {
        if pass {
            Applied::Entries(vec![input.to_string()])
        } else {
            Applied::NotApplicable
        }
    }

    pub fn is_na(&self) -> bool {
        matches!(self, Applied::NotApplicable)
    }

    /// True for a non-N/A result with no entries.
    pub fn is_empty(&self) -> bool {
        matches!(self, Applied::Entries(es) if es.is_empty())
    }

    /// True for a result carrying at least one entry.
    pub fn is_productive(&self) -> bool {
        matches!(self, Applied::Entries(es) if !es.is_empty())
    }

    pub fn entries(&self) -> &[String] {
        match self {
            Applied::NotApplicable => &[],
            Applied::Entries(es) => es,
        }
    }

    pub fn into_entries(self) -> Vec<String> {
        match self {
            Applied::NotApplicable => Vec::new(),
            Applied::Entries(es) => es,
        }
    }
}

/// Flavour of a declared named list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListKind {
    /// Ordered, duplicates retained.
    List,
    /// Insertion-ordered, duplicates collapsed on insert.
    Set,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_drops_empty() {
        assert!(Applied::one(String::new()).is_empty());
        assert!(Applied::one("a".into()).is_productive());
    }

    #[test]
    fn test_changed_detects_identity() {
        assert!(Applied::changed("abc", "abc".into()).is_na());
        assert!(Applied::changed("abc", "abd".into()).is_productive());
    }

    #[test]
    fn test_from_entries_filters_empties() {
        let r = Applied::from_entries(vec!["a".into(), String::new(), "b".into()]);
        assert_eq!(r.entries(), ["a", "b"]);
    }

    #[test]
    fn test_na_and_empty_are_distinct() {
        assert!(Applied::na().is_na());
        assert!(!Applied::na().is_empty());
        assert!(Applied::Entries(Vec::new()).is_empty());
        assert!(!Applied::Entries(Vec::new()).is_na());
    }
}
