//! HashTable: fixed bucket count, one multi-buffer sub-buffer per bucket.
//!
//! Each bucket is a sub-buffer of `PairKey`s. A key maps to bucket
//! `hash % bucket_count` and collisions chain inside that bucket, scanned
//! linearly with `K: Eq`. The key/value pairs themselves live in a
//! generational arena owned by the table, so bucket growth only ever moves
//! small keys, never the pairs.

use crate::config::TableConfig;
use crate::multi_buffer::{MultiBuffer, SubBufferHandle};
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;
use slotmap::{new_key_type, SlotMap};
use thiserror::Error;
use tracing::{debug, warn};

new_key_type! {
    /// Arena key of a key/value pair; this is what buckets store.
    pub struct PairKey;
}

#[derive(Debug)]
struct Pair<K, V> {
    key: K,
    value: V,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InsertError {
    /// An equal key is already present; the stored value was left as is.
    #[error("a key equal to the inserted one already exists in the hash table")]
    DuplicateKey,
}

pub struct HashTable<K, V, S = DefaultHashBuilder> {
    hasher: S,
    pub(crate) buckets: MultiBuffer<PairKey>,
    bucket_handles: Vec<SubBufferHandle>,
    pairs: SlotMap<PairKey, Pair<K, V>>,
}

impl<K, V> HashTable<K, V>
where
    K: Eq + Hash,
{
    /// Create a table with `bucket_count` buckets and the default hasher.
    ///
    /// # Panics
    ///
    /// Panics if `bucket_count` is zero.
    pub fn new(bucket_count: usize) -> Self {
        Self::with_hasher(bucket_count, Default::default())
    }
}

impl<K, V> Default for HashTable<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::with_config(TableConfig::default(), Default::default())
    }
}

/// Iterator over mutable entries of a [`HashTable`], in arena order.
pub struct IterMut<'a, K, V> {
    it: slotmap::basic::IterMut<'a, PairKey, Pair<K, V>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, p)| (&p.key, &mut p.value))
    }
}

impl<K, V, S> HashTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(bucket_count: usize, hasher: S) -> Self {
        Self::with_config(TableConfig::new(bucket_count), hasher)
    }

    /// Create a table from `config`. Every bucket starts as a sub-buffer of
    /// capacity 1; `config.capacity` is reserved as raw storage shared by
    /// all of them.
    ///
    /// # Panics
    ///
    /// Panics if `config.bucket_count` is zero.
    pub fn with_config(config: TableConfig, hasher: S) -> Self {
        assert!(config.bucket_count >= 1, "bucket count must always be >= 1");
        let mut buckets = MultiBuffer::new(config.capacity);
        let bucket_handles = (0..config.bucket_count)
            .map(|_| buckets.sub_buffer_create(1))
            .collect();
        debug!(
            bucket_count = config.bucket_count,
            capacity = config.capacity,
            "created hash table"
        );
        Self {
            hasher,
            buckets,
            bucket_handles,
            pairs: SlotMap::with_capacity_and_key(config.capacity),
        }
    }

    fn bucket_of<Q>(&self, q: &Q) -> SubBufferHandle
    where
        Q: ?Sized + Hash,
    {
        let hash = self.hasher.hash_one(q);
        self.bucket_handles[(hash % self.bucket_handles.len() as u64) as usize]
    }

    fn find_in<Q>(&self, bucket: SubBufferHandle, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let pairs = &self.pairs;
        self.buckets
            .sub_buffer_find_index_of(bucket, |&pk| pairs[pk].key.borrow() == q)
    }

    fn find<Q>(&self, q: &Q) -> Option<PairKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let bucket = self.bucket_of(q);
        let i = self.find_in(bucket, q)?;
        Some(self.buckets.sub_buffer_get_at(bucket, i))
    }

    /// Number of key/value pairs in the table.
    pub fn len(&self) -> usize {
        debug_assert_eq!(self.pairs.len(), self.buckets.combined_sub_buffers_count());
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_handles.len()
    }

    /// Number of pairs chained in bucket `index`.
    pub fn bucket_len(&self, index: usize) -> usize {
        self.buckets.sub_buffer_len(self.bucket_handles[index])
    }

    /// Add `key -> value` and return the stored value.
    ///
    /// An existing equal key is never overwritten: the call logs a warning,
    /// leaves the table unchanged and fails with
    /// [`InsertError::DuplicateKey`].
    pub fn add_get(&mut self, key: K, value: V) -> Result<&mut V, InsertError> {
        let bucket = self.bucket_of(&key);
        if self.find_in(bucket, &key).is_some() {
            warn!(
                bucket = bucket.id(),
                "refusing to add key: an equal key already exists in the hash table"
            );
            return Err(InsertError::DuplicateKey);
        }
        let pk = self.pairs.insert(Pair { key, value });
        self.buckets.sub_buffer_push(bucket, pk);
        Ok(&mut self.pairs[pk].value)
    }

    pub fn add(&mut self, key: K, value: V) -> Result<(), InsertError> {
        self.add_get(key, value).map(|_| ())
    }

    /// Like [`add_get`](Self::add_get), but only builds the value once the
    /// key is known to be absent.
    pub fn add_with<F>(&mut self, key: K, default: F) -> Result<&mut V, InsertError>
    where
        F: FnOnce() -> V,
    {
        let bucket = self.bucket_of(&key);
        if self.find_in(bucket, &key).is_some() {
            warn!(
                bucket = bucket.id(),
                "refusing to add key: an equal key already exists in the hash table"
            );
            return Err(InsertError::DuplicateKey);
        }
        let pk = self.pairs.insert(Pair {
            key,
            value: default(),
        });
        self.buckets.sub_buffer_push(bucket, pk);
        Ok(&mut self.pairs[pk].value)
    }

    /// Remove the pair for `q`. Returns false if it was absent.
    pub fn remove<Q>(&mut self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(q).is_some()
    }

    /// Remove the pair for `q` and hand it back. The rest of the bucket
    /// keeps its order.
    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let bucket = self.bucket_of(q);
        let i = self.find_in(bucket, q)?;
        let pk = self.buckets.sub_buffer_remove_at(bucket, i);
        let pair = self
            .pairs
            .remove(pk)
            .expect("bucket entries must refer to live pairs");
        Some((pair.key, pair.value))
    }

    pub fn contains<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let bucket = self.bucket_of(q);
        self.find_in(bucket, q).is_some()
    }

    pub fn get_value<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let pk = self.find(q)?;
        Some(&self.pairs[pk].value)
    }

    pub fn get_value_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let pk = self.find(q)?;
        Some(&mut self.pairs[pk].value)
    }

    /// Visit every pair, bucket by bucket, in chain order.
    pub fn foreach<F>(&self, mut visitor: F)
    where
        F: FnMut(&K, &V),
    {
        for (k, v) in self.iter() {
            visitor(k, v);
        }
    }

    /// Visit pairs in the same order as [`foreach`](Self::foreach) until
    /// `visitor` returns false.
    pub fn foreach_until<F>(&self, mut visitor: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        for (k, v) in self.iter() {
            if !visitor(k, v) {
                return;
            }
        }
    }

    /// Iterate pairs bucket by bucket, in chain order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.bucket_handles
            .iter()
            .flat_map(move |&h| self.buckets.sub_buffer_as_slice(h).iter())
            .map(move |&pk| {
                let p = &self.pairs[pk];
                (&p.key, &p.value)
            })
    }

    /// Iterate pairs mutably. Order is unspecified.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.pairs.iter_mut(),
        }
    }

    /// Drop every pair and empty every bucket. Bucket capacities are kept.
    pub fn clear(&mut self) {
        for &h in &self.bucket_handles {
            self.buckets.sub_buffer_clear(h);
        }
        self.pairs.clear();
        debug!(bucket_count = self.bucket_handles.len(), "cleared hash table");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::BTreeSet;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct ConstBuildHasher;
    struct ConstHasher;
    impl BuildHasher for ConstBuildHasher {
        type Hasher = ConstHasher;
        fn build_hasher(&self) -> Self::Hasher {
            ConstHasher
        }
    }
    impl core::hash::Hasher for ConstHasher {
        fn write(&mut self, _bytes: &[u8]) {}
        fn finish(&self) -> u64 {
            0
        } // every key lands in bucket 0
    }

    /// Invariant: duplicate keys are refused and the stored value is kept.
    #[test]
    fn duplicate_add_refused_without_overwrite() {
        let mut t: HashTable<String, i32> = HashTable::new(4);
        t.add("dup".to_string(), 1).unwrap();
        assert_eq!(t.add("dup".to_string(), 2), Err(InsertError::DuplicateKey));
        assert!(t.add_get("dup".to_string(), 3).is_err());
        assert_eq!(t.get_value("dup"), Some(&1));
        assert_eq!(t.len(), 1);
    }

    /// Invariant: `add_get` hands back the stored value, and writes through it
    /// are visible to later lookups.
    #[test]
    fn add_get_returns_stored_value() {
        let mut t: HashTable<u32, f32> = HashTable::new(3);
        let v = t.add_get(7, 1.5).unwrap();
        assert_eq!(*v, 1.5);
        *v = 2.5;
        assert_eq!(t.get_value(&7), Some(&2.5));
        *t.get_value_mut(&7).unwrap() += 1.0;
        assert_eq!(t.get_value(&7), Some(&3.5));
    }

    /// Invariant: after remove, the key is gone and the call reports whether
    /// anything was removed.
    #[test]
    fn remove_round_trip() {
        let mut t: HashTable<String, i32> = HashTable::new(2);
        t.add("a".to_string(), 1).unwrap();
        t.add("b".to_string(), 2).unwrap();
        assert!(t.remove("a"));
        assert!(!t.remove("a"));
        assert!(!t.contains("a"));
        assert_eq!(t.get_value("a"), None);
        assert_eq!(t.remove_entry("b"), Some(("b".to_string(), 2)));
        assert!(t.is_empty());
    }

    /// Invariant: with every key in one bucket, equality still resolves the
    /// right pair and removal keeps the chain order of the others.
    #[test]
    fn single_chain_removal_preserves_order() {
        let mut t: HashTable<u32, u32, ConstBuildHasher> = HashTable::with_hasher(5, ConstBuildHasher);
        for k in 0..6 {
            t.add(k, k * 10).unwrap();
        }
        assert_eq!(t.bucket_len(0), 6);
        assert!(t.remove(&2));
        assert!(t.remove(&4));
        let order: Vec<u32> = t.iter().map(|(k, _)| *k).collect();
        assert_eq!(order, vec![0, 1, 3, 5]);
        assert_eq!(t.get_value(&5), Some(&50));
    }

    /// Invariant: `bucket_count` is fixed, and the bucket of a key is
    /// `hash % bucket_count` even when the count is not a power of two.
    #[test]
    fn bucket_index_is_hash_modulo_count() {
        let t: HashTable<u64, ()> = HashTable::new(7);
        assert_eq!(t.bucket_count(), 7);
        for k in 0..50u64 {
            let expected = (t.hasher.hash_one(k) % 7) as usize;
            assert_eq!(t.bucket_of(&k), t.bucket_handles[expected]);
        }
    }

    #[test]
    fn zero_buckets_panics() {
        let res = std::panic::catch_unwind(|| {
            let _t: HashTable<u32, u32> = HashTable::new(0);
        });
        assert!(res.is_err());
    }

    /// Invariant: `foreach_until` stops at the first false; `foreach` sees
    /// every pair once.
    #[test]
    fn foreach_and_foreach_until() {
        let mut t: HashTable<u32, u32> = HashTable::new(3);
        for k in 0..10 {
            t.add(k, k).unwrap();
        }
        let mut seen = BTreeSet::new();
        t.foreach(|k, v| {
            assert_eq!(k, v);
            assert!(seen.insert(*k));
        });
        assert_eq!(seen.len(), 10);

        let mut visited = 0;
        t.foreach_until(|_, _| {
            visited += 1;
            visited < 4
        });
        assert_eq!(visited, 4);
    }

    /// Invariant: `iter_mut` updates are visible through lookups.
    #[test]
    fn iter_mut_updates_values() {
        let mut t: HashTable<u32, u32> = HashTable::new(4);
        for k in 0..8 {
            t.add(k, k).unwrap();
        }
        for (_, v) in t.iter_mut() {
            *v += 100;
        }
        for k in 0..8 {
            assert_eq!(t.get_value(&k), Some(&(k + 100)));
        }
    }

    /// Invariant: `add_with` only builds the value when the key is absent.
    #[test]
    fn add_with_is_lazy() {
        let mut t: HashTable<&'static str, i32> = HashTable::new(2);
        let calls = Cell::new(0);
        t.add_with("k", || {
            calls.set(calls.get() + 1);
            1
        })
        .unwrap();
        let r = t.add_with("k", || {
            calls.set(calls.get() + 1);
            2
        });
        assert_eq!(r, Err(InsertError::DuplicateKey));
        assert_eq!(calls.get(), 1);
        assert_eq!(t.get_value(&"k"), Some(&1));
    }

    /// Invariant: `clear` drops every value exactly once and is idempotent.
    #[test]
    fn clear_drops_values_once() {
        let token = Rc::new(());
        let mut t: HashTable<u32, Rc<()>> = HashTable::new(3);
        for k in 0..20 {
            t.add(k, token.clone()).unwrap();
        }
        assert_eq!(Rc::strong_count(&token), 21);
        t.clear();
        assert_eq!(Rc::strong_count(&token), 1);
        assert_eq!(t.len(), 0);
        t.clear();
        assert_eq!(t.len(), 0);
        assert_eq!(t.bucket_count(), 3);
        t.add(1, token.clone()).unwrap();
        drop(t);
        assert_eq!(Rc::strong_count(&token), 1);
    }

    /// Invariant: the `Display` text of the duplicate error is stable.
    #[test]
    fn insert_error_display() {
        assert_eq!(
            InsertError::DuplicateKey.to_string(),
            "a key equal to the inserted one already exists in the hash table"
        );
    }
}
