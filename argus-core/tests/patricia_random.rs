//! Randomized differential test of the patricia tree against a reference
//! map.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{
    Rng,
    SeedableRng,
};

use argus_core::patricia::PatriciaTree;

#[test]
fn matches_a_reference_map() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut tree: PatriciaTree<u64> = PatriciaTree::new();
    let mut reference: BTreeMap<u64, u64> = BTreeMap::new();

    for step in 0..20_000u64 {
        let key = rng.gen_range(0..512u64) * rng.gen_range(1..1_000_000u64);
        if rng.gen_bool(0.7) {
            tree = tree.insert(key, step);
            reference.insert(key, step);
        } else {
            tree = tree.remove(key);
            reference.remove(&key);
        }
        if step % 1024 == 0 {
            assert_eq!(tree.len(), reference.len());
        }
    }

    assert_eq!(tree.len(), reference.len());
    let collected: Vec<(u64, u64)> = tree.iter().map(|(k, v)| (k, *v)).collect();
    let expected: Vec<(u64, u64)> = reference.into_iter().collect();
    assert_eq!(collected, expected);
}

#[test]
fn snapshots_are_independent() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut tree: PatriciaTree<u64> = PatriciaTree::new();
    for _ in 0..256 {
        let key = rng.gen::<u64>() % 4096;
        tree = tree.insert(key, key);
    }
    let snapshot = tree.clone();
    let before: Vec<u64> = snapshot.iter().map(|(k, _)| k).collect();

    for _ in 0..256 {
        let key = rng.gen::<u64>() % 4096;
        tree = tree.remove(key);
    }
    let after: Vec<u64> = snapshot.iter().map(|(k, _)| k).collect();
    assert_eq!(before, after, "updates do not disturb snapshots");
}
