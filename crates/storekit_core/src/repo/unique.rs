//! Order-preserving deduplication.

use std::collections::HashMap;
use std::hash::Hash;

/// Keeps the last element for every key.
///
/// Retained elements stay in the input order of their own positions.
pub fn unique_last_wins<T, K, F>(items: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut last_index = HashMap::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        last_index.insert(key(item), index);
    }
    items
        .into_iter()
        .enumerate()
        .filter(|(index, item)| last_index.get(&key(item)) == Some(index))
        .map(|(_, item)| item)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::unique_last_wins;

    #[test]
    fn keeps_last_occurrence_at_its_own_position() {
        let items = vec![("a", 1), ("b", 2), ("a", 3), ("c", 4)];
        let unique = unique_last_wins(items, |(key, _)| *key);
        assert_eq!(unique, vec![("b", 2), ("a", 3), ("c", 4)]);
    }

    #[test]
    fn empty_input_stays_empty() {
        let unique = unique_last_wins(Vec::<i32>::new(), |value| *value);
        assert!(unique.is_empty());
    }
}
