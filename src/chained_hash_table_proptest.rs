#![cfg(test)]

// Property tests for ChainedHashTable kept inside the crate so they can
// check chain structure directly after every operation.

use crate::chained_hash_table::{ChainedHashTable, Handle, Insertion};
use crate::error::Error;
use crate::hash::HashFunction;
use crate::policy::{CapacityMode, GrowthPolicy};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Set(usize, i32),
    SetWith(usize, i32),
    Update(usize, i32),
    UpdateByHandle(usize, i32),
    Remove(usize),
    RemoveByHandle(usize),
    Find(usize),
    Contains(String),
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Set(i, v)),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::SetWith(i, v)),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Update(i, v)),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::UpdateByHandle(i, v)),
            1 => idx.clone().prop_map(OpI::Remove),
            1 => idx.clone().prop_map(OpI::RemoveByHandle),
            1 => idx.clone().prop_map(OpI::Find),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(OpI::Contains),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn fnv1a(key: &[u8]) -> u32 {
    key.iter()
        .fold(0x811c_9dc5u32, |h, &b| (h ^ b as u32).wrapping_mul(0x0100_0193))
}

fn constant(_: &[u8]) -> u32 {
    0x5a5a_5a5a
}

// State-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - Duplicate keys are rejected without state change; handles stay stable.
// - `update`/`remove` by key fail with KeyNotFound exactly when the model lacks the key.
// - By-handle operations on removed items fail with StaleHandle.
// - After each op the chains are consistent: every item sits in the bucket its
//   cached hash selects, back links are intact, and the count equals the chain total.
// - The size exponent never decreases.
fn run_state_machine<H: HashFunction>(
    policy: GrowthPolicy,
    hash: H,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut sut: ChainedHashTable<String, i32, H> =
        ChainedHashTable::with_policy_and_hash_function(policy, hash).expect("valid policy");
    let mut model: HashMap<String, i32> = HashMap::new();
    let mut live: HashMap<String, Handle> = HashMap::new();
    let mut stale: Vec<Handle> = Vec::new();
    let mut exponent = sut.size_exponent();

    for op in ops {
        match op {
            OpI::Set(i, v) | OpI::SetWith(i, v) => {
                let k = pool[i].clone();
                let already = model.contains_key(&k);
                let res = match op {
                    OpI::Set(..) => sut.set(k.clone(), v),
                    _ => sut.set_with(k.clone(), || v),
                };
                match res {
                    Ok(Insertion::Complete(h)) => {
                        prop_assert!(!already, "set must fail on duplicate");
                        prop_assert!(live.insert(k.clone(), h).is_none());
                        model.insert(k, v);
                    }
                    Ok(Insertion::CapacityUnchanged(_)) => {
                        prop_assert!(false, "no allocation failure expected");
                    }
                    Err(Error::Duplicate) => prop_assert!(already),
                    Err(e) => prop_assert!(false, "unexpected error {:?}", e),
                }
            }
            OpI::Update(i, v) => {
                let k = &pool[i];
                match (sut.update(k, v), model.get_mut(k)) {
                    (Ok(old), Some(mv)) => {
                        prop_assert_eq!(old, *mv);
                        *mv = v;
                    }
                    (Err(Error::KeyNotFound), None) => {}
                    (r, m) => prop_assert!(false, "update mismatch {:?} vs {:?}", r, m),
                }
            }
            OpI::UpdateByHandle(i, v) => {
                let k = &pool[i];
                if let Some(&h) = live.get(k) {
                    let old = sut.update_by_handle(h, v).expect("live handle resolves");
                    let mv = model.get_mut(k).expect("present in model");
                    prop_assert_eq!(old, *mv);
                    *mv = v;
                    prop_assert_eq!(sut.get(k), Some(&v));
                } else if let Some(&h) = stale.last() {
                    prop_assert_eq!(sut.update_by_handle(h, v), Err(Error::StaleHandle));
                }
            }
            OpI::Remove(i) => {
                let k = &pool[i];
                match sut.remove(k) {
                    Ok((kk, vv)) => {
                        prop_assert_eq!(&kk, k);
                        prop_assert_eq!(Some(vv), model.remove(k));
                        stale.push(live.remove(k).expect("tracked handle"));
                    }
                    Err(Error::KeyNotFound) => prop_assert!(!model.contains_key(k)),
                    Err(e) => prop_assert!(false, "unexpected error {:?}", e),
                }
            }
            OpI::RemoveByHandle(i) => {
                let k = &pool[i];
                if let Some(h) = live.remove(k) {
                    let (kk, vv) = sut.remove_by_handle(h).expect("handle valid for removal");
                    prop_assert_eq!(&kk, k);
                    prop_assert_eq!(Some(vv), model.remove(k));
                    prop_assert!(sut.find(k).is_none());
                    stale.push(h);
                } else {
                    prop_assert!(sut.find(k).is_none());
                }
            }
            OpI::Find(i) => {
                let k = &pool[i];
                let found = sut.find(k);
                prop_assert_eq!(found.is_some(), model.contains_key(k));
                if let Some(h) = found {
                    prop_assert_eq!(Some(&h), live.get(k));
                    prop_assert_eq!(h.value(&sut), model.get(k));
                }
            }
            OpI::Contains(s) => {
                prop_assert_eq!(sut.contains_key(&s), model.contains_key(&s));
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<_> = sut.iter().map(|(_, k, _)| k.clone()).collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
            }
        }

        for &h in &stale {
            prop_assert!(h.value(&sut).is_none());
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert!(sut.size_exponent() >= exponent, "bucket array shrank");
        exponent = sut.size_exponent();
        sut.chains.assert_consistent();
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn prop_state_machine_doubling((pool, ops) in arb_scenario()) {
        run_state_machine(GrowthPolicy::new(0, 6), fnv1a, pool, ops)?;
    }

    #[test]
    fn prop_state_machine_multi_step_early_trigger((pool, ops) in arb_scenario()) {
        let policy = GrowthPolicy::new(1, 9).with_extend_step(2).with_extend_trigger(1);
        run_state_machine(policy, fnv1a, pool, ops)?;
    }

    // Worst-case collisions: every key shares one hash and one chain.
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(GrowthPolicy::new(0, 3), constant, pool, ops)?;
    }

    // Reject mode refuses inserts once the ceiling is full, and only then.
    #[test]
    fn prop_reject_mode_caps_item_count(keys in proptest::collection::btree_set("[a-z]{1,6}", 1..40)) {
        let policy = GrowthPolicy::new(0, 2).with_capacity_mode(CapacityMode::Reject);
        let mut sut: ChainedHashTable<String, usize, _> =
            ChainedHashTable::with_policy_and_hash_function(policy, fnv1a).expect("valid policy");
        for (i, k) in keys.iter().enumerate() {
            let r = sut.set(k.clone(), i);
            if i < 4 {
                prop_assert!(r.is_ok());
            } else {
                prop_assert_eq!(r, Err(Error::CapacityExceeded));
            }
        }
        prop_assert_eq!(sut.len(), keys.len().min(4));
        // Growth is lazy: 1 item stays at 2^0, 2 items reach 2^1, 3+ reach 2^2.
        let expected_exponent = match keys.len() {
            1 => 0,
            2 => 1,
            _ => 2,
        };
        prop_assert_eq!(sut.size_exponent(), expected_exponent);
        sut.chains.assert_consistent();
    }
}
