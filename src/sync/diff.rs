//! Set-based diffing of rule attribute values.
//!
//! The synchronizer compares attribute values as sets, never as ordered
//! lists: an entry is identified by a canonical key (for dependencies, the
//! parsed label; for sources, the file name), and only genuine membership
//! changes touch the file. Entries that survive keep their original spelling
//! and their original position, so a hand-ordered list stays hand-ordered.

/// One attribute entry: how it is (or should be) spelled in the file, and
/// the canonical key it is compared under.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Text as written (existing entries) or as it would be written
    /// (required entries).
    pub text: String,
    /// Canonical comparison key.
    pub key: String,
}

impl Entry {
    /// An entry whose written form is its own key.
    pub fn verbatim(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            key: text.clone(),
            text,
        }
    }

    pub fn new(text: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            key: key.into(),
        }
    }
}

/// Outcome of diffing an existing value against a required set.
#[derive(Debug, Clone, Default)]
pub struct SetDiff {
    /// The new attribute value: surviving entries in their original order,
    /// then additions in sorted order.
    pub result: Vec<String>,
    /// Keys added.
    pub added: Vec<String>,
    /// Keys removed.
    pub removed: Vec<String>,
}

impl SetDiff {
    /// Whether applying this diff would change the attribute.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

/// Diffs `existing` against `required` by key membership.
///
/// - Existing entries whose key is in `required` stay, in place.
/// - Existing entries whose key is in `pinned` stay even when not required.
/// - Remaining existing entries (and duplicates) are removed.
/// - Required entries not present yet are appended in sorted order.
pub fn diff_entries(existing: &[Entry], required: &[Entry], pinned: &[String]) -> SetDiff {
    let required_keys: std::collections::HashSet<&str> =
        required.iter().map(|e| e.key.as_str()).collect();

    let mut diff = SetDiff::default();
    let mut present = std::collections::HashSet::new();
    for entry in existing {
        let duplicate = !present.insert(entry.key.clone());
        let wanted = required_keys.contains(entry.key.as_str())
            || pinned.iter().any(|p| p == &entry.key);
        if wanted && !duplicate {
            diff.result.push(entry.text.clone());
        } else {
            diff.removed.push(entry.key.clone());
        }
    }

    let mut additions: Vec<&Entry> =
        required.iter().filter(|e| !present.contains(&e.key)).collect();
    additions.sort_by(|a, b| a.text.cmp(&b.text));
    additions.dedup_by(|a, b| a.key == b.key);
    for entry in additions {
        diff.result.push(entry.text.clone());
        diff.added.push(entry.key.clone());
    }
    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verbatim(items: &[&str]) -> Vec<Entry> {
        items.iter().map(|s| Entry::verbatim(*s)).collect()
    }

    #[test]
    fn test_symmetric_difference() {
        let existing = verbatim(&["A", "B", "C"]);
        let required = verbatim(&["B", "C", "D"]);
        let diff = diff_entries(&existing, &required, &[]);
        assert_eq!(diff.result, vec!["B", "C", "D"]);
        assert_eq!(diff.added, vec!["D"]);
        assert_eq!(diff.removed, vec!["A"]);
        assert!(diff.is_changed());
    }

    #[test]
    fn test_unchanged_set_preserves_order() {
        // Hand-ordered entries stay exactly where they were.
        let existing = verbatim(&["C", "A", "B"]);
        let required = verbatim(&["A", "B", "C"]);
        let diff = diff_entries(&existing, &required, &[]);
        assert_eq!(diff.result, vec!["C", "A", "B"]);
        assert!(!diff.is_changed());
    }

    #[test]
    fn test_pinned_entries_survive_removal() {
        let existing = verbatim(&["A", "B"]);
        let required = verbatim(&["B"]);
        let diff = diff_entries(&existing, &required, &["A".to_string()]);
        assert_eq!(diff.result, vec!["A", "B"]);
        assert!(!diff.is_changed());
    }

    #[test]
    fn test_spelling_differences_compare_equal() {
        // `//foo` and `//foo:foo` have the same key; the original spelling
        // wins.
        let existing = vec![Entry::new("//foo", "//foo:foo")];
        let required = vec![Entry::new("//foo:foo", "//foo:foo")];
        let diff = diff_entries(&existing, &required, &[]);
        assert_eq!(diff.result, vec!["//foo"]);
        assert!(!diff.is_changed());
    }

    #[test]
    fn test_duplicates_are_dropped() {
        let existing = verbatim(&["A", "A", "B"]);
        let required = verbatim(&["A", "B"]);
        let diff = diff_entries(&existing, &required, &[]);
        assert_eq!(diff.result, vec!["A", "B"]);
        assert_eq!(diff.removed, vec!["A"]);
    }

    #[test]
    fn test_additions_are_sorted() {
        let existing = verbatim(&[]);
        let required = verbatim(&["z", "a", "m"]);
        let diff = diff_entries(&existing, &required, &[]);
        assert_eq!(diff.result, vec!["a", "m", "z"]);
    }
}
