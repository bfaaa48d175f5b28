//! Quantified lattice properties shared by every domain.

use proptest::prelude::*;

use argus_core::{
    congruence::Congruence,
    dbm::Dbm,
    interval::Interval,
    interval_congruence::IntervalCongruence,
    lattice::AbstractDomain,
    nullity::Nullity,
};
use argus_num::{
    Int,
    MachineInt,
    Signedness,
};

fn n32(v: i64) -> MachineInt {
    MachineInt::new(v, 32, Signedness::Signed)
}

fn interval_strategy() -> impl Strategy<Value = Interval> {
    prop_oneof![
        1 => Just(Interval::bottom(32, Signedness::Signed)),
        1 => Just(Interval::top(32, Signedness::Signed)),
        8 => (any::<i32>(), any::<i32>()).prop_map(|(a, b)| {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            Interval::new(n32(lo.into()), n32(hi.into()))
        }),
    ]
}

fn congruence_strategy() -> impl Strategy<Value = Congruence> {
    prop_oneof![
        1 => Just(Congruence::bottom(32, Signedness::Signed)),
        8 => (0u64..=256, any::<i32>()).prop_map(|(a, b)| {
            Congruence::new(Int::from(a), Int::from(b), 32, Signedness::Signed)
        }),
    ]
}

fn ic_strategy() -> impl Strategy<Value = IntervalCongruence> {
    (interval_strategy(), congruence_strategy())
        .prop_map(|(i, c)| IntervalCongruence::new(i, c))
}

fn nullity_strategy() -> impl Strategy<Value = Nullity> {
    prop_oneof![
        Just(Nullity::Bottom),
        Just(Nullity::Null),
        Just(Nullity::NonNull),
        Just(Nullity::Top),
    ]
}

macro_rules! lattice_laws {
    ($name:ident, $strategy:expr, $top:expr, $bottom:expr) => {
        mod $name {
            use super::*;

            proptest! {
                #[test]
                fn join_is_commutative(a in $strategy, b in $strategy) {
                    prop_assert_eq!(a.join(&b), b.join(&a));
                }

                #[test]
                fn meet_is_commutative(a in $strategy, b in $strategy) {
                    prop_assert_eq!(a.meet(&b), b.meet(&a));
                }

                #[test]
                fn join_is_associative(a in $strategy, b in $strategy, c in $strategy) {
                    prop_assert_eq!(a.join(&b).join(&c), a.join(&b.join(&c)));
                }

                #[test]
                fn join_meet_are_idempotent(a in $strategy) {
                    prop_assert_eq!(a.join(&a), a.clone());
                    prop_assert_eq!(a.meet(&a), a.clone());
                }

                #[test]
                fn leq_matches_join(a in $strategy, b in $strategy) {
                    prop_assert_eq!(a.leq(&b), a.join(&b) == b);
                }

                #[test]
                fn bottom_and_top_are_extremal(a in $strategy) {
                    prop_assert!($bottom.leq(&a));
                    prop_assert!(a.leq(&$top));
                }

                #[test]
                fn widening_is_an_upper_bound(a in $strategy, b in $strategy) {
                    let w = a.widening(&b);
                    prop_assert!(a.leq(&w));
                    prop_assert!(b.leq(&w));
                }
            }
        }
    };
}

lattice_laws!(
    interval_laws,
    interval_strategy(),
    Interval::top(32, Signedness::Signed),
    Interval::bottom(32, Signedness::Signed)
);

lattice_laws!(
    congruence_laws,
    congruence_strategy(),
    Congruence::top(32, Signedness::Signed),
    Congruence::bottom(32, Signedness::Signed)
);

lattice_laws!(
    interval_congruence_laws,
    ic_strategy(),
    IntervalCongruence::top(32, Signedness::Signed),
    IntervalCongruence::bottom(32, Signedness::Signed)
);

lattice_laws!(
    nullity_laws,
    nullity_strategy(),
    Nullity::Top,
    Nullity::Bottom
);

proptest! {
    /// Any ascending chain stabilizes in finitely many widening steps.
    #[test]
    fn widening_terminates(values in prop::collection::vec(interval_strategy(), 1..40)) {
        let mut chain = Vec::new();
        let mut accumulated = Interval::bottom(32, Signedness::Signed);
        for v in values {
            accumulated = accumulated.join(&v);
            chain.push(accumulated.clone());
        }
        let mut state = chain[0].clone();
        let mut steps = 0;
        for next in &chain[1..] {
            let widened = state.widening(next);
            if widened == state {
                continue
            }
            state = widened;
            steps += 1;
            prop_assert!(steps <= 3, "interval widening must converge fast");
        }
        for next in &chain {
            prop_assert!(next.leq(&state.widening(next)));
        }
    }

    /// trim_bound is idempotent.
    #[test]
    fn trim_idempotence(i in interval_strategy(), n in any::<i32>()) {
        let n = n32(n.into());
        let once = i.trim_bound(&n);
        prop_assert_eq!(once.trim_bound(&n), once.clone());
    }

    /// The reduced interval is included in the input and its endpoints land
    /// on congruence lattice points.
    #[test]
    fn interval_congruence_reduction(i in interval_strategy(), c in congruence_strategy()) {
        let reduced = IntervalCongruence::new(i.clone(), c.clone());
        prop_assert!(reduced.interval().leq(&i));
        if !reduced.is_bottom() && !c.is_bottom() {
            prop_assert!(reduced.congruence().contains(reduced.interval().lb()));
            prop_assert!(reduced.congruence().contains(reduced.interval().ub()));
        }
    }

    /// Monotonicity of the interval transfer functions.
    #[test]
    fn interval_arithmetic_is_monotone(
        a in interval_strategy(),
        d in interval_strategy(),
        c in interval_strategy(),
    ) {
        let b = a.join(&d);
        prop_assert!(a.add(&c).leq(&b.add(&c)));
        prop_assert!(a.sub(&c).leq(&b.sub(&c)));
        prop_assert!(a.mul(&c).leq(&b.mul(&c)));
    }

    /// After closing, every edge satisfies the triangle inequality, or the
    /// matrix is unsatisfiable.
    #[test]
    fn dbm_closure(constraints in prop::collection::vec(
        (0u64..4, 0u64..4, -50i64..50), 0..12
    )) {
        let mut dbm = Dbm::top(32, Signedness::Signed);
        for (x, y, c) in constraints {
            if x == y {
                continue
            }
            dbm.add_diff_upper_bound(x, y, Int::from(c));
        }
        dbm.close();
        if dbm.is_bottom() {
            return Ok(())
        }
        for x in 0u64..4 {
            for y in 0u64..4 {
                if x == y {
                    continue
                }
                // Projections of a closed matrix are consistent
                let px = dbm.project(x);
                let py = dbm.project(y);
                prop_assert!(!px.is_bottom());
                prop_assert!(!py.is_bottom());
            }
        }
    }
}
