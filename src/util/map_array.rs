use std::collections::HashMap;
use std::hash::Hash;

/// A one-to-many association, e.g. model id -> the placements using it. Both the keys and the values of every key
/// keep their insertion order, so iterating it is deterministic between frames.
#[derive(Debug, Clone)]
pub struct MapArray<K, V> {
    index: HashMap<K, usize>,
    entries: Vec<(K, Vec<V>)>,
}

impl<K, V> Default for MapArray<K, V> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<K: Hash + Eq + Clone, V> MapArray<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: K, value: V) {
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot].1.push(value),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, vec![value]));
            }
        }
    }

    pub fn get(&self, key: &K) -> &[V] {
        self.index
            .get(key)
            .map(|&slot| self.entries[slot].1.as_slice())
            .unwrap_or_default()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &[V])> {
        self.entries
            .iter()
            .map(|(key, values)| (key, values.as_slice()))
    }

    /// The amount of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes all values but keeps the allocations of the value lists, for per-frame reuse.
    pub fn clear_values(&mut self) {
        for (_, values) in &mut self.entries {
            values.clear();
        }
    }
}

impl<K: Hash + Eq + Clone, V> FromIterator<(K, V)> for MapArray<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = MapArray::new();
        for (key, value) in iter {
            map.push(key, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use crate::util::map_array::MapArray;

    #[test]
    fn values_keep_their_insertion_order() {
        let map: MapArray<u32, &str> = [(7, "a"), (3, "b"), (7, "c")].into_iter().collect();

        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![7, 3]);
        assert_eq!(map.get(&7), &["a", "c"]);
        assert_eq!(map.get(&3), &["b"]);
        assert!(map.get(&1).is_empty());
    }

    #[test]
    fn clearing_values_keeps_the_keys() {
        let mut map = MapArray::new();
        map.push("tree", 1);
        map.clear_values();

        assert!(map.contains_key(&"tree"));
        assert!(map.get(&"tree").is_empty());
        map.push("tree", 2);
        assert_eq!(map.get(&"tree"), &[2]);
    }
}
