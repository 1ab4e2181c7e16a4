//! Novelty filter.
//!
//! Remembers every item key processed during this run. The set only grows:
//! a key is marked the moment it is judged new, before enrichment or
//! notification, so a failed send is dropped rather than retried.

use std::collections::HashSet;

use crate::models::ItemKey;

/// In-memory set of already processed item keys.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    keys: HashSet<ItemKey>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the key has not been processed yet.
    pub fn is_new(&self, key: &ItemKey) -> bool {
        !self.keys.contains(key)
    }

    /// Remember a key. Marking twice is a no-op.
    pub fn mark_seen(&mut self, key: ItemKey) {
        self.keys.insert(key);
    }

    /// Mark the key and report whether it was new.
    pub fn check_and_mark(&mut self, key: ItemKey) -> bool {
        self.keys.insert(key)
    }

    pub fn contains(&self, key: &ItemKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_then_seen() {
        let mut seen = SeenSet::new();
        let key = ItemKey::new("Dune", "2024");

        assert!(seen.is_new(&key));
        seen.mark_seen(key.clone());
        assert!(!seen.is_new(&key));
        assert!(seen.contains(&key));
    }

    #[test]
    fn test_check_and_mark_once() {
        let mut seen = SeenSet::new();
        assert!(seen.check_and_mark(ItemKey::new("Dune", "2024")));
        assert!(!seen.check_and_mark(ItemKey::new("Dune", "2024")));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_year_is_part_of_identity() {
        let mut seen = SeenSet::new();
        assert!(seen.check_and_mark(ItemKey::new("Dune", "1984")));
        assert!(seen.check_and_mark(ItemKey::new("Dune", "2021")));
        assert!(seen.check_and_mark(ItemKey::new("Dune", "Unknown")));
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_only_grows() {
        let mut seen = SeenSet::new();
        for round in 0..3 {
            for name in ["A", "B", "C"] {
                seen.mark_seen(ItemKey::new(name, "2024"));
            }
            assert_eq!(seen.len(), 3, "round {round}");
        }
        assert!(!seen.is_empty());
    }
}
