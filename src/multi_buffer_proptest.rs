#![cfg(test)]

// Model-based property tests for MultiBuffer: every live sub-buffer is
// mirrored by a Vec, and the handle ids are predicted from a LIFO free list.

use crate::multi_buffer::{MultiBuffer, SubBufferHandle};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Create(usize),
    Destroy(usize),
    Push(usize, i32),
    Remove(usize, i32),
    RemoveAt(usize, usize),
    SetAt(usize, usize, i32),
    ClearSub(usize),
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        3 => (0usize..6).prop_map(Op::Create),
        2 => any::<usize>().prop_map(Op::Destroy),
        8 => (any::<usize>(), 0i32..8).prop_map(|(i, v)| Op::Push(i, v)),
        2 => (any::<usize>(), 0i32..8).prop_map(|(i, v)| Op::Remove(i, v)),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(i, p)| Op::RemoveAt(i, p)),
        2 => (any::<usize>(), any::<usize>(), any::<i32>()).prop_map(|(i, p, v)| Op::SetAt(i, p, v)),
        1 => any::<usize>().prop_map(Op::ClearSub),
    ];
    proptest::collection::vec(op, 1..80)
}

struct Model {
    // indexed by handle id; None once destroyed
    subs: Vec<Option<Vec<i32>>>,
    free: Vec<u32>,
}

impl Model {
    fn live(&self) -> Vec<u32> {
        self.subs
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| i as u32)
            .collect()
    }

    fn pick(&self, raw: usize) -> Option<u32> {
        let live = self.live();
        if live.is_empty() {
            None
        } else {
            Some(live[raw % live.len()])
        }
    }
}

// Property: against a Vec-per-sub-buffer model, after every operation
// - regions tile the backing buffer and `len()` equals the sum of capacities,
// - every live sub-buffer holds exactly the model's elements, in order,
// - growth never loses or reorders earlier elements,
// - destroyed ids are reissued last-in first-out,
// - `flatcopy_to` equals the concatenation of live sub-buffers by id.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_multi_buffer_matches_model(initial in 0usize..8, ops in arb_ops()) {
        let mut sut: MultiBuffer<i32> = MultiBuffer::new(initial);
        let mut model = Model { subs: Vec::new(), free: Vec::new() };

        for op in ops {
            match op {
                Op::Create(cap) => {
                    let expected = model.free.pop().unwrap_or(model.subs.len() as u32);
                    let h = sut.sub_buffer_create(cap);
                    prop_assert_eq!(h.id(), expected);
                    prop_assert!(sut.sub_buffer_capacity(h) >= cap);
                    prop_assert_eq!(sut.sub_buffer_len(h), 0);
                    if (expected as usize) < model.subs.len() {
                        model.subs[expected as usize] = Some(Vec::new());
                    } else {
                        model.subs.push(Some(Vec::new()));
                    }
                }
                Op::Destroy(raw) => {
                    if let Some(id) = model.pick(raw) {
                        sut.sub_buffer_destroy(SubBufferHandle::new(id));
                        model.subs[id as usize] = None;
                        model.free.push(id);
                    }
                }
                Op::Push(raw, v) => {
                    if let Some(id) = model.pick(raw) {
                        let h = SubBufferHandle::new(id);
                        let before = sut.sub_buffer_capacity(h);
                        let len = sut.sub_buffer_len(h);
                        sut.sub_buffer_push(h, v);
                        let after = sut.sub_buffer_capacity(h);
                        if len == before {
                            let doubled = if before == 0 { 1 } else { before * 2 };
                            prop_assert_eq!(after, doubled);
                        } else {
                            prop_assert_eq!(after, before);
                        }
                        if let Some(sub) = model.subs[id as usize].as_mut() {
                            sub.push(v);
                        }
                    }
                }
                Op::Remove(raw, v) => {
                    if let Some(id) = model.pick(raw) {
                        let removed = sut.sub_buffer_remove(SubBufferHandle::new(id), |&x| x == v);
                        if let Some(sub) = model.subs[id as usize].as_mut() {
                            match sub.iter().position(|&x| x == v) {
                                Some(p) => {
                                    prop_assert!(removed);
                                    sub.remove(p);
                                }
                                None => prop_assert!(!removed),
                            }
                        }
                    }
                }
                Op::RemoveAt(raw, pos) => {
                    if let Some(id) = model.pick(raw) {
                        if let Some(sub) = model.subs[id as usize].as_mut() {
                            if !sub.is_empty() {
                                let p = pos % sub.len();
                                let got = sut.sub_buffer_remove_at(SubBufferHandle::new(id), p);
                                prop_assert_eq!(got, sub.remove(p));
                            }
                        }
                    }
                }
                Op::SetAt(raw, pos, v) => {
                    if let Some(id) = model.pick(raw) {
                        if let Some(sub) = model.subs[id as usize].as_mut() {
                            if !sub.is_empty() {
                                let p = pos % sub.len();
                                sut.sub_buffer_set_at(SubBufferHandle::new(id), p, v);
                                sub[p] = v;
                            }
                        }
                    }
                }
                Op::ClearSub(raw) => {
                    if let Some(id) = model.pick(raw) {
                        let h = SubBufferHandle::new(id);
                        let cap = sut.sub_buffer_capacity(h);
                        sut.sub_buffer_clear(h);
                        prop_assert_eq!(sut.sub_buffer_capacity(h), cap);
                        if let Some(sub) = model.subs[id as usize].as_mut() {
                            sub.clear();
                        }
                    }
                }
            }

            prop_assert!(sut.is_tiled());
            let live = model.live();
            prop_assert_eq!(sut.sub_buffer_count(), live.len());
            let handles: Vec<u32> = sut.handles().map(|h| h.id()).collect();
            prop_assert_eq!(&handles, &live);

            let mut expected_flat = Vec::new();
            for &id in &live {
                let h = SubBufferHandle::new(id);
                let sub = model.subs[id as usize].as_ref().expect("live in model");
                prop_assert_eq!(sut.sub_buffer_as_slice(h), sub.as_slice());
                prop_assert!(sut.sub_buffer_capacity(h) >= sub.len());
                expected_flat.extend_from_slice(sub);
            }
            let mut flat = Vec::new();
            sut.flatcopy_to(&mut flat);
            prop_assert_eq!(sut.combined_sub_buffers_count(), expected_flat.len());
            prop_assert_eq!(flat, expected_flat);
        }
    }
}
