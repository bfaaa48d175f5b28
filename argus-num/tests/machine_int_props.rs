//! Properties of the machine integer arithmetic.

use proptest::prelude::*;

use argus_num::{
    Int,
    MachineInt,
    Signedness,
};

fn si8(v: i64) -> MachineInt {
    MachineInt::new(v, 8, Signedness::Signed)
}

fn ui8(v: i64) -> MachineInt {
    MachineInt::new(v, 8, Signedness::Unsigned)
}

proptest! {
    /// Addition agrees with the primitive wrapping semantics.
    #[test]
    fn add_wraps_like_i8(a in any::<i8>(), b in any::<i8>()) {
        let expected = a.wrapping_add(b);
        let got = si8(a.into()).add(&si8(b.into()));
        prop_assert_eq!(got.to_i64(), Some(expected.into()));
    }

    #[test]
    fn mul_wraps_like_u8(a in any::<u8>(), b in any::<u8>()) {
        let expected = a.wrapping_mul(b);
        let got = ui8(a.into()).mul(&ui8(b.into()));
        prop_assert_eq!(got.to_i64(), Some(expected.into()));
    }

    /// The value always stays inside the representable range.
    #[test]
    fn values_are_canonical(v in any::<i64>()) {
        let n = si8(v);
        prop_assert!(n.to_int() >= Int::from(-128));
        prop_assert!(n.to_int() <= Int::from(127));
        let u = ui8(v);
        prop_assert!(u.to_int() >= Int::from(0));
        prop_assert!(u.to_int() <= Int::from(255));
    }

    /// Sign casts preserve the bit pattern in both directions.
    #[test]
    fn sign_cast_round_trips(v in any::<i8>()) {
        let n = si8(v.into());
        let round = n.sign_cast(Signedness::Unsigned).sign_cast(Signedness::Signed);
        prop_assert_eq!(round, n);
    }

    /// Truncating a zero extension is the identity.
    #[test]
    fn zext_then_trunc_is_identity(v in any::<u8>()) {
        let n = ui8(v.into());
        prop_assert_eq!(n.zext(32).trunc(8), n);
    }

    /// Comparison is sign aware: the same bit pattern orders differently.
    #[test]
    fn comparison_is_sign_aware(a in any::<i8>(), b in any::<i8>()) {
        let signed = si8(a.into()) <= si8(b.into());
        prop_assert_eq!(signed, a <= b);
        let unsigned = ui8((a as u8).into()) <= ui8((b as u8).into());
        prop_assert_eq!(unsigned, (a as u8) <= (b as u8));
    }
}
