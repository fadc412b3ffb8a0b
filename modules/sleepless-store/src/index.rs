// Capability traits for the two maps the store is built on.
//
// AuthorTable: handle-keyed table addressed by a precomputed AuthorKey.
// OrderedIndex: ordered map with insert-if-absent semantics (timelines).
//
// The store and the heuristic only use these traits. ChainedTable and
// BTreeMap are the implementations shipped here.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::key::{AuthorKey, KeySpace};

// ---------------------------------------------------------------------------
// AuthorTable
// ---------------------------------------------------------------------------

pub trait AuthorTable<V> {
    /// Look up by precomputed key and exact handle.
    fn get(&self, key: AuthorKey, handle: &str) -> Option<&V>;

    /// Return the entry for `handle`, inserting `make()` first if absent.
    /// `make` is not called when the handle is already present.
    fn get_or_insert_with<F>(&mut self, key: AuthorKey, handle: &str, make: F) -> &mut V
    where
        F: FnOnce() -> V;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn values<'a>(&'a self) -> impl Iterator<Item = &'a V> + 'a
    where
        V: 'a;

    fn values_mut<'a>(&'a mut self) -> impl Iterator<Item = &'a mut V> + 'a
    where
        V: 'a;
}

/// Separate-chaining hash table with a bucket count fixed at construction.
pub struct ChainedTable<V> {
    buckets: Vec<Vec<(String, V)>>,
    len: usize,
}

impl<V> ChainedTable<V> {
    pub fn new(space: KeySpace) -> Self {
        Self {
            buckets: (0..space.size()).map(|_| Vec::new()).collect(),
            len: 0,
        }
    }

    fn slot(&self, key: AuthorKey) -> usize {
        key.bucket() % self.buckets.len()
    }

    /// Length of the longest chain, for load diagnostics.
    pub fn longest_chain(&self) -> usize {
        self.buckets.iter().map(Vec::len).max().unwrap_or(0)
    }
}

impl<V> AuthorTable<V> for ChainedTable<V> {
    fn get(&self, key: AuthorKey, handle: &str) -> Option<&V> {
        self.buckets[self.slot(key)]
            .iter()
            .find(|(h, _)| h == handle)
            .map(|(_, v)| v)
    }

    fn get_or_insert_with<F>(&mut self, key: AuthorKey, handle: &str, make: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let slot = self.slot(key);
        let chain = &mut self.buckets[slot];
        let pos = match chain.iter().position(|(h, _)| h == handle) {
            Some(pos) => pos,
            None => {
                chain.push((handle.to_string(), make()));
                self.len += 1;
                chain.len() - 1
            }
        };
        &mut chain[pos].1
    }

    fn len(&self) -> usize {
        self.len
    }

    fn values<'a>(&'a self) -> impl Iterator<Item = &'a V> + 'a
    where
        V: 'a,
    {
        self.buckets.iter().flatten().map(|(_, v)| v)
    }

    fn values_mut<'a>(&'a mut self) -> impl Iterator<Item = &'a mut V> + 'a
    where
        V: 'a,
    {
        self.buckets.iter_mut().flatten().map(|(_, v)| v)
    }
}

// ---------------------------------------------------------------------------
// OrderedIndex
// ---------------------------------------------------------------------------

pub trait OrderedIndex<K: Ord, V> {
    /// Insert unless `key` is taken. Returns true if the index grew; an
    /// existing value is never overwritten.
    fn insert_if_absent(&mut self, key: K, value: V) -> bool;

    fn lookup(&self, key: &K) -> Option<&V>;

    fn size(&self) -> usize;

    /// Values in ascending key order.
    fn ascending<'a>(&'a self) -> impl Iterator<Item = &'a V> + 'a
    where
        K: 'a,
        V: 'a;
}

impl<K: Ord, V> OrderedIndex<K, V> for BTreeMap<K, V> {
    fn insert_if_absent(&mut self, key: K, value: V) -> bool {
        match self.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    fn lookup(&self, key: &K) -> Option<&V> {
        self.get(key)
    }

    fn size(&self) -> usize {
        self.len()
    }

    fn ascending<'a>(&'a self) -> impl Iterator<Item = &'a V> + 'a
    where
        K: 'a,
        V: 'a,
    {
        self.values()
    }
}
