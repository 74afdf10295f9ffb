#![cfg(test)]

// Property tests for HashTable kept inside the crate so they can reach
// bucket internals.

use crate::hash_table::{HashTable, InsertError};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations so shrinking moves toward earlier keys.
#[derive(Clone, Debug)]
enum Op {
    Add(usize, i32),
    AddGet(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    Iterate,
    Clear,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (usize, Vec<String>, Vec<Op>)> {
    let pool = proptest::collection::vec("[a-z]{0,5}", 1..=8);
    (1usize..=7, pool).prop_flat_map(|(buckets, pool)| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Add(i, v)),
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::AddGet(i, v)),
            4 => idx.clone().prop_map(Op::Remove),
            3 => idx.clone().prop_map(Op::Get),
            2 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(Op::Contains),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
            1 => Just(Op::Iterate),
            1 => Just(Op::Clear),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (buckets, pool.clone(), ops))
    })
}

fn run<S: BuildHasher>(mut sut: HashTable<Key, i32, S>, pool: Vec<String>, ops: Vec<Op>) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();
    for op in ops {
        match op {
            Op::Add(i, v) => {
                let k = key_from(&pool, i);
                let already = model.contains_key(&k);
                match sut.add(k.clone(), v) {
                    Ok(()) => {
                        prop_assert!(!already, "add must fail on duplicate");
                        model.insert(k, v);
                    }
                    Err(InsertError::DuplicateKey) => {
                        prop_assert!(already, "duplicate error only when key exists");
                    }
                }
            }
            Op::AddGet(i, v) => {
                let k = key_from(&pool, i);
                let already = model.contains_key(&k);
                match sut.add_get(k.clone(), v) {
                    Ok(stored) => {
                        prop_assert!(!already);
                        prop_assert_eq!(*stored, v);
                        model.insert(k, v);
                    }
                    Err(InsertError::DuplicateKey) => prop_assert!(already),
                }
            }
            Op::Remove(i) => {
                let k = key_from(&pool, i);
                let removed = sut.remove_entry(&k);
                match model.remove(&k) {
                    Some(mv) => prop_assert_eq!(removed, Some((k, mv))),
                    None => prop_assert!(removed.is_none()),
                }
            }
            Op::Get(i) => {
                let k = key_from(&pool, i);
                prop_assert_eq!(sut.get_value(&k), model.get(&k));
            }
            Op::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains(s.as_str()), has_model);
            }
            Op::Mutate(i, d) => {
                let k = key_from(&pool, i);
                if let Some(v) = sut.get_value_mut(&k) {
                    *v = v.wrapping_add(d);
                    let mv = model.get_mut(&k).expect("present in model");
                    *mv = mv.wrapping_add(d);
                } else {
                    prop_assert!(!model.contains_key(&k));
                }
            }
            Op::Iterate => {
                let s_keys: BTreeSet<_> = sut.iter().map(|(k, _)| k.clone()).collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
            }
            Op::Clear => {
                sut.clear();
                model.clear();
            }
        }

        // Post-conditions after each op
        // 1) Size parity
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        // 2) Bucket sizes add up and the backing regions still tile
        let chained: usize = (0..sut.bucket_count()).map(|b| sut.bucket_len(b)).sum();
        prop_assert_eq!(chained, model.len());
        prop_assert!(sut.buckets.is_tiled());
        // 3) No bucket holds two equal keys
        let mut seen = BTreeSet::new();
        for (k, _) in sut.iter() {
            prop_assert!(seen.insert(k.clone()), "key {:?} chained twice", k);
        }
    }
    Ok(())
}

// Property: State-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - Duplicate keys are refused and never overwrite.
// - `get_value`/`contains` parity with the model; borrowed `&str` lookup.
// - `remove_entry` returns the owned pair matching the model.
// - `iter` yields each live pair exactly once; `clear` empties everything.
// - Bucket lengths sum to `len`, and the multi-buffer stays tiled.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((buckets, pool, ops) in arb_scenario()) {
        run(HashTable::new(buckets), pool, ops)?;
    }
}

// Collision variant using a constant hasher: every key chains in bucket 0.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: Same state-machine invariants as above, under worst-case
// collision behavior (constant hasher). This stresses equality scans and
// order-preserving removal inside a single chain.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((buckets, pool, ops) in arb_scenario()) {
        run(HashTable::with_hasher(buckets, ConstBuildHasher), pool, ops)?;
    }
}

// Property: removing one key from a single chain keeps the relative order
// of every other key in that chain.
proptest! {
    #[test]
    fn prop_chain_order_preserved(n in 1u32..40, victim in 0u32..40) {
        let mut t: HashTable<u32, u32, ConstBuildHasher> = HashTable::with_hasher(3, ConstBuildHasher);
        for k in 0..n {
            t.add(k, k).unwrap();
        }
        let victim = victim % n;
        prop_assert!(t.remove(&victim));
        let order: Vec<u32> = t.iter().map(|(k, _)| *k).collect();
        let expected: Vec<u32> = (0..n).filter(|&k| k != victim).collect();
        prop_assert_eq!(order, expected);
    }
}
