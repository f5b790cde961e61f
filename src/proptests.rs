use super::*;

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
enum Op {
    Insert(i64, u64),
    Remove(i64),
    Get(i64),
}

fn key_strategy() -> impl Strategy<Value = i64> + Clone {
    // A narrow key range keeps duplicate inserts and hits on removes common,
    // which is where the rebalancing paths actually get exercised.
    -64i64..=64
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        50 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        30 => key.clone().prop_map(Op::Remove),
        20 => key.prop_map(Op::Get),
    ];
    prop::collection::vec(op, 0..=400)
}

fn run_against_oracle<E: OrderedMapEngine<i64, u64>>(
    mut engine: E,
    ops: Vec<Op>,
    validate: impl Fn(&E),
) -> Result<(), TestCaseError> {
    let mut oracle: BTreeMap<i64, u64> = BTreeMap::new();

    for op in ops {
        match op {
            Op::Insert(k, v) => {
                engine.insert(k, v);
                oracle.insert(k, v);
            }
            Op::Remove(k) => {
                prop_assert_eq!(engine.remove(&k), oracle.remove(&k).is_some());
            }
            Op::Get(k) => {
                prop_assert_eq!(engine.get(&k).copied(), oracle.get(&k).copied());
            }
        }

        prop_assert_eq!(engine.len(), oracle.len());
    }

    validate(&engine);
    prop_assert!(engine.is_balanced());

    let mut got: Vec<(i64, u64)> = Vec::new();
    engine.for_each(|k, v| got.push((*k, *v)));
    let expected: Vec<(i64, u64)> = oracle.iter().map(|(k, v)| (*k, *v)).collect();
    prop_assert_eq!(got, expected);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_avl(ops in ops_strategy()) {
        run_against_oracle(AvlMap::new(), ops, |m: &AvlMap<i64, u64>| m.check_invariants())?;
    }

    #[test]
    fn prop_equivalence_avl_leaf(ops in ops_strategy()) {
        run_against_oracle(AvlLeafMap::new(), ops, |m: &AvlLeafMap<i64, u64>| m.check_invariants())?;
    }

    #[test]
    fn prop_equivalence_rb(ops in ops_strategy()) {
        run_against_oracle(RedBlackMap::new(), ops, |m: &RedBlackMap<i64, u64>| m.check_invariants())?;
    }

    #[test]
    fn prop_equivalence_rb_leaf(ops in ops_strategy()) {
        run_against_oracle(RedBlackLeafMap::new(), ops, |m: &RedBlackLeafMap<i64, u64>| {
            m.check_invariants()
        })?;
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

const SMALL_KEYS: [i64; 6] = [10, 20, 30, 40, 50, 25];

fn exhaustive_insert_orders<E: OrderedMapEngine<i64, u64>>(
    make: impl Fn() -> E,
    validate: impl Fn(&E),
) {
    for_each_permutation(&SMALL_KEYS, |perm| {
        let mut engine = make();
        let mut oracle: BTreeMap<i64, u64> = BTreeMap::new();

        for (i, k) in perm.into_iter().enumerate() {
            let v = i as u64;
            engine.insert(k, v);
            oracle.insert(k, v);
        }

        validate(&engine);
        assert!(engine.is_balanced());
        let mut got: Vec<(i64, u64)> = Vec::new();
        engine.for_each(|k, v| got.push((*k, *v)));
        let expected: Vec<(i64, u64)> = oracle.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(got, expected);
    });
}

fn exhaustive_remove_orders<E: OrderedMapEngine<i64, u64>>(
    make: impl Fn() -> E,
    validate: impl Fn(&E),
) {
    // Insert in a fixed order, then remove in all permutations.
    for_each_permutation(&SMALL_KEYS, |perm| {
        let mut engine = make();
        let mut oracle: BTreeMap<i64, u64> = BTreeMap::new();
        for (i, k) in SMALL_KEYS.into_iter().enumerate() {
            let v = i as u64;
            engine.insert(k, v);
            oracle.insert(k, v);
        }

        for k in perm {
            assert_eq!(engine.remove(&k), oracle.remove(&k).is_some());
            assert_eq!(engine.len(), oracle.len());
            validate(&engine);
            assert!(engine.is_balanced());
        }
        assert!(engine.is_empty());
        assert_eq!(engine.height(), 0);
    });
}

#[test]
fn exhaustive_insert_order_small_set() {
    exhaustive_insert_orders(AvlMap::new, |m: &AvlMap<i64, u64>| m.check_invariants());
    exhaustive_insert_orders(AvlLeafMap::new, |m: &AvlLeafMap<i64, u64>| m.check_invariants());
    exhaustive_insert_orders(RedBlackMap::new, |m: &RedBlackMap<i64, u64>| m.check_invariants());
    exhaustive_insert_orders(RedBlackLeafMap::new, |m: &RedBlackLeafMap<i64, u64>| {
        m.check_invariants()
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    exhaustive_remove_orders(AvlMap::new, |m: &AvlMap<i64, u64>| m.check_invariants());
    exhaustive_remove_orders(AvlLeafMap::new, |m: &AvlLeafMap<i64, u64>| m.check_invariants());
    exhaustive_remove_orders(RedBlackMap::new, |m: &RedBlackMap<i64, u64>| m.check_invariants());
    exhaustive_remove_orders(RedBlackLeafMap::new, |m: &RedBlackLeafMap<i64, u64>| {
        m.check_invariants()
    });
}

fn seeded_churn<E: OrderedMapEngine<i64, u64>>(mut engine: E, validate: impl Fn(&E)) {
    let mut rng = StdRng::seed_from_u64(0x5eed_ba1a);
    let mut oracle: BTreeMap<i64, u64> = BTreeMap::new();

    for step in 0..10_000u32 {
        let k = rng.gen_range(-512i64..512);
        if rng.gen_bool(0.6) {
            let v = rng.gen();
            engine.insert(k, v);
            oracle.insert(k, v);
        } else {
            assert_eq!(engine.remove(&k), oracle.remove(&k).is_some());
        }
        assert_eq!(engine.len(), oracle.len());
        if step % 1024 == 0 {
            validate(&engine);
        }
    }

    validate(&engine);
    assert!(engine.is_balanced());
    let mut got: Vec<(i64, u64)> = Vec::new();
    engine.for_each(|k, v| got.push((*k, *v)));
    let expected: Vec<(i64, u64)> = oracle.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(got, expected);
}

#[test]
fn stress_churn_avl() {
    seeded_churn(AvlMap::new(), |m: &AvlMap<i64, u64>| m.check_invariants());
}

#[test]
fn stress_churn_avl_leaf() {
    seeded_churn(AvlLeafMap::new(), |m: &AvlLeafMap<i64, u64>| m.check_invariants());
}

#[test]
fn stress_churn_rb() {
    seeded_churn(RedBlackMap::new(), |m: &RedBlackMap<i64, u64>| m.check_invariants());
}

#[test]
fn stress_churn_rb_leaf() {
    seeded_churn(RedBlackLeafMap::new(), |m: &RedBlackLeafMap<i64, u64>| m.check_invariants());
}
