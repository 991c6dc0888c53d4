// ChainedHashTable integration suite.
//
// Each test documents the behavior verified and the invariants it relies on.
// The core invariants exercised:
// - Round trip: a stored key yields its value until removed or updated.
// - Uniqueness: a second `set` of a key fails and changes nothing.
// - Growth: the bucket array follows the growth policy exactly, and every
//   item sits in the bucket its hash selects after each resize.
// - Handles: by-handle update/remove act on the same item a lookup finds.
// - Capacity: at the maximum exponent the table degrades or rejects per
//   its configured mode.
use chained_hashtable::{
    CapacityMode, ChainedHashTable, ConfigError, Error, GrowthPolicy, HashFunction, Insertion,
};

const TEST_KEYS: [&str; 10] = [
    "yki3coJRshu4ohKu",
    "aevaeiaevae1Fi",
    "Si12341evae7nohT2thai",
    "zae6ajklfsdoY6eQuie8uph",
    "FieVe1giaX7ahkor",
    "ahtecBa",
    "hayawe84",
    "iet0ooGh uTee1aiz aeShou0H Aepie5ma fie0Nool",
    "beemoh8Ooh6AiD",
    "Moo",
];

fn fnv1a(key: &[u8]) -> u32 {
    key.iter()
        .fold(0x811c_9dc5u32, |h, &b| (h ^ b as u32).wrapping_mul(0x0100_0193))
}

fn small_policy(mode: CapacityMode) -> GrowthPolicy {
    GrowthPolicy::new(0, 3)
        .with_extend_step(1)
        .with_extend_trigger(0)
        .with_capacity_mode(mode)
}

/// Every item must sit in the bucket its hash selects under the current mask.
fn assert_bucket_placement<V, H: HashFunction>(t: &ChainedHashTable<&'static str, V, H>) {
    let mask = t.bucket_count() as u32 - 1;
    let mut total = 0;
    for bucket in 0..t.bucket_count() {
        for (_, k, _) in t.chain(bucket) {
            assert_eq!(
                (t.hash_function().hash(k.as_bytes()) & mask) as usize,
                bucket,
                "{k:?} stored in the wrong bucket"
            );
            total += 1;
        }
    }
    assert_eq!(total, t.len(), "chain total differs from len");
}

// Test: growth schedule with initial=0, maximum=3, step=1, trigger=0.
// Assumes: growth fires when the count reaches one item per bucket.
// Verifies: the table reaches 8 buckets by the 8th insert, stays there for
// the 9th, and every key stays retrievable throughout.
#[test]
fn growth_schedule_then_degrade_at_ceiling() {
    let mut t = ChainedHashTable::with_policy_and_hash_function(
        small_policy(CapacityMode::Degrade),
        fnv1a,
    )
    .expect("valid policy");
    assert_eq!(t.size_exponent(), 0);

    let expected_exponent_after = [0u8, 1, 2, 2, 3, 3, 3, 3, 3];
    for (i, key) in TEST_KEYS[..9].iter().enumerate() {
        let outcome = t.set(*key, i).expect("insert accepted");
        assert!(outcome.is_complete());
        assert_eq!(t.size_exponent(), expected_exponent_after[i], "after insert {}", i + 1);
        for (j, earlier) in TEST_KEYS[..=i].iter().enumerate() {
            assert_eq!(t.get(earlier), Some(&j));
        }
        assert_bucket_placement(&t);
    }
    assert_eq!(t.bucket_count(), 8);
    assert_eq!(t.len(), 9);
}

// Test: same schedule under the reject mode.
// Verifies: the 9th insert is refused, nothing changes, and the table
// accepts again once an item is removed.
#[test]
fn reject_mode_refuses_insert_at_ceiling() {
    let mut t = ChainedHashTable::with_policy_and_hash_function(
        small_policy(CapacityMode::Reject),
        fnv1a,
    )
    .expect("valid policy");
    for (i, key) in TEST_KEYS[..8].iter().enumerate() {
        t.set(*key, i).expect("insert below ceiling");
    }
    assert_eq!(t.size_exponent(), 3);

    assert_eq!(t.set(TEST_KEYS[8], 8), Err(Error::CapacityExceeded));
    assert_eq!(t.len(), 8);
    assert!(!t.contains_key(TEST_KEYS[8]));
    for (i, key) in TEST_KEYS[..8].iter().enumerate() {
        assert_eq!(t.get(key), Some(&i));
    }

    t.remove(TEST_KEYS[0]).expect("present");
    assert!(t.set(TEST_KEYS[8], 8).is_ok());
    assert_eq!(t.len(), 8);
    assert_bucket_placement(&t);
}

// Test: Reject mode with a step that overshoots the maximum exponent.
// Assumes: growth moves only by whole steps.
// Verifies: the table stops at 2^2 under a maximum of 2^3 and refuses the
// 5th item there, leaving stored items and placement intact.
#[test]
fn reject_mode_with_overshooting_step_stops_below_maximum() {
    let policy = GrowthPolicy::new(0, 3)
        .with_extend_step(2)
        .with_capacity_mode(CapacityMode::Reject);
    let mut t = ChainedHashTable::with_policy_and_hash_function(policy, fnv1a).unwrap();
    for (i, key) in TEST_KEYS[..4].iter().enumerate() {
        t.set(*key, i).expect("insert below ceiling");
    }
    assert_eq!(t.size_exponent(), 2);

    assert_eq!(t.set(TEST_KEYS[4], 4), Err(Error::CapacityExceeded));
    assert_eq!(t.size_exponent(), 2);
    assert_eq!(t.len(), 4);
    for (i, key) in TEST_KEYS[..4].iter().enumerate() {
        assert_eq!(t.get(key), Some(&i));
    }
    assert_bucket_placement(&t);
}

// Test: a handle issued by one table, used on another.
// Verifies: the receiving table stays structurally sound whatever the
// handle resolves to, and the issuing table is untouched.
#[test]
fn foreign_handle_leaves_both_tables_consistent() {
    let mut a: ChainedHashTable<&'static str, u32> = ChainedHashTable::new();
    let mut b: ChainedHashTable<&'static str, u32> = ChainedHashTable::new();
    let ha = a.set("a-key", 1).unwrap().handle();
    b.set("b-key", 2).unwrap();

    match b.remove_by_handle(ha) {
        Ok((k, v)) => {
            assert_eq!((k, v), ("b-key", 2));
            assert!(b.is_empty());
            assert!(b.find("b-key").is_none());
        }
        Err(e) => {
            assert_eq!(e, Error::StaleHandle);
            assert_eq!(b.get("b-key"), Some(&2));
        }
    }
    assert_bucket_placement(&b);
    assert_eq!(a.len(), 1);
    assert_eq!(ha.value(&a), Some(&1));
    assert_bucket_placement(&a);
}

// Test: the handle walk-through: lookup, update via handle and via key,
// removal via handle and via key.
// Verifies: values, counts, and absence after each step.
#[test]
fn handle_and_key_mutations() {
    let mut t = ChainedHashTable::with_policy_and_hash_function(
        small_policy(CapacityMode::Degrade),
        fnv1a,
    )
    .expect("valid policy");
    for (i, key) in TEST_KEYS[..9].iter().enumerate() {
        t.set(*key, i).unwrap();
    }

    let eighth = t.find(TEST_KEYS[7]).expect("8th item present");
    assert_eq!(t.update_by_handle(eighth, 2), Ok(7));
    assert_eq!(t.get(TEST_KEYS[7]), Some(&2));

    // Query with bytes cut from a longer buffer rather than the stored key.
    let joined = format!("{}{}", TEST_KEYS[4], TEST_KEYS[8]);
    let (fifth, ninth) = joined.as_bytes().split_at(TEST_KEYS[4].len());
    assert_eq!(t.update(fifth, 3), Ok(4));

    assert_eq!(t.remove_by_handle(eighth), Ok((TEST_KEYS[7], 2)));
    assert_eq!(t.remove(TEST_KEYS[0]), Ok((TEST_KEYS[0], 0)));

    assert_eq!(t.len(), 7);
    assert!(t.get(TEST_KEYS[0]).is_none());
    assert_eq!(t.remove(TEST_KEYS[0]), Err(Error::KeyNotFound));
    assert_eq!(t.get(fifth), Some(&3));
    assert_eq!(t.get(ninth), Some(&8));
    assert!(t.get(TEST_KEYS[7]).is_none());
    assert_eq!(t.remove_by_handle(eighth), Err(Error::StaleHandle));
    assert_bucket_placement(&t);
}

// Test: removal via handle.
// Verifies: lookup of the former key fails and the count drops by one.
#[test]
fn remove_by_handle_then_lookup_fails() {
    let mut t: ChainedHashTable<&'static str, u32> = ChainedHashTable::new();
    for (i, key) in TEST_KEYS.iter().enumerate() {
        t.set(*key, i as u32).unwrap();
    }
    let before = t.len();
    let h = t.find("ahtecBa").unwrap();
    t.remove_by_handle(h).unwrap();
    assert_eq!(t.len(), before - 1);
    assert!(t.find("ahtecBa").is_none());
    assert_eq!(t.update("ahtecBa", 1), Err(Error::KeyNotFound));
}

// Test: duplicates leave the table untouched.
#[test]
fn duplicate_does_not_change_count_or_value() {
    let mut t: ChainedHashTable<String, i32> = ChainedHashTable::new();
    t.set("k".to_string(), 1).unwrap();
    assert_eq!(t.set("k".to_string(), 2), Err(Error::Duplicate));
    assert_eq!(t.len(), 1);
    assert_eq!(t.get("k"), Some(&1));
}

// Test: multi-level growth with an anticipatory trigger.
// Assumes: threshold = 2^(size_exponent - trigger).
// Verifies: growth happens at the documented counts and by `extend_step`.
#[test]
fn early_trigger_and_multi_step_growth() {
    let policy = GrowthPolicy::new(2, 12)
        .with_extend_step(2)
        .with_extend_trigger(1);
    let mut t = ChainedHashTable::with_policy_and_hash_function(policy, fnv1a).unwrap();
    let keys: Vec<&'static str> = (0..40)
        .map(|i| &*Box::leak(format!("key-{i}").into_boxed_str()))
        .collect();

    let mut exponents = Vec::new();
    for (i, k) in keys.iter().enumerate() {
        t.set(*k, i).unwrap();
        exponents.push(t.size_exponent());
    }
    // Thresholds: 2 items at 2^2 buckets, 8 at 2^4, 32 at 2^6.
    assert_eq!(exponents[1], 2);
    assert_eq!(exponents[2], 4);
    assert_eq!(exponents[7], 4);
    assert_eq!(exponents[8], 6);
    assert_eq!(exponents[32], 8);
    for (i, k) in keys.iter().enumerate() {
        assert_eq!(t.get(k), Some(&i));
    }
    assert_bucket_placement(&t);
}

// Test: configuration errors surface at creation.
#[test]
fn invalid_configurations_fail_creation() {
    let cases = [
        (GrowthPolicy::new(32, 32), ConfigError::InitialTooLarge(32)),
        (GrowthPolicy::new(1, 32), ConfigError::MaximumTooLarge(32)),
        (GrowthPolicy::new(1, 5).with_extend_step(0), ConfigError::ZeroExtendStep),
    ];
    for (policy, expected) in cases {
        let r: Result<ChainedHashTable<String, ()>, Error> = ChainedHashTable::with_policy(policy);
        assert_eq!(r.err(), Some(Error::InvalidConfiguration(expected)));
    }
}

// Test: closures serve as hash functions; an all-colliding hash still
// gives correct answers.
#[test]
fn closure_hash_with_total_collisions() {
    let mut t = ChainedHashTable::with_policy_and_hash_function(
        GrowthPolicy::new(0, 4),
        |_: &[u8]| 42u32,
    )
    .unwrap();
    for (i, key) in TEST_KEYS.iter().enumerate() {
        assert!(matches!(t.set(*key, i), Ok(Insertion::Complete(_))));
    }
    assert_eq!(t.chain(42 & (t.bucket_count() - 1)).count(), TEST_KEYS.len());
    for (i, key) in TEST_KEYS.iter().enumerate() {
        assert_eq!(t.get(key), Some(&i));
    }
}

// Test: the default table works end to end.
#[test]
fn default_table_round_trip() {
    let mut t: ChainedHashTable<Vec<u8>, usize> = ChainedHashTable::default();
    for i in 0..1000usize {
        t.set(i.to_le_bytes().to_vec(), i).unwrap();
    }
    assert_eq!(t.len(), 1000);
    for i in 0..1000usize {
        assert_eq!(t.get(&i.to_le_bytes()), Some(&i));
    }
    assert!(t.size_exponent() >= 10);
}
