use memory::{Comp4, Comp4Error};
use proptest::prelude::*;

proptest! {
    // Construction preserves the raw integer and declaration bit-exactly.
    #[test]
    fn construction_round_trips(raw in any::<i64>(), scale in 0u8..=18, signed in any::<bool>()) {
        let raw = if signed { raw } else { raw.unsigned_abs().min(i64::MAX as u64) as i64 };
        let v = Comp4::new(signed, scale, raw).unwrap();
        prop_assert_eq!(v.raw(), raw);
        prop_assert_eq!(v.scale(), scale);
        prop_assert_eq!(v.is_signed(), signed);
    }

    // a + b - b == a whenever both steps succeed.
    #[test]
    fn add_sub_cancel(a in -1_000_000_000i64..1_000_000_000, b in -1_000_000_000i64..1_000_000_000, scale in 0u8..=6) {
        let va = Comp4::new(true, scale, a).unwrap();
        let vb = Comp4::new(true, scale, b).unwrap();
        let sum = va.checked_add(&vb).unwrap();
        prop_assert_eq!(sum.checked_sub(&vb).unwrap().raw(), a);
    }

    // Mixed scales never silently rescale.
    #[test]
    fn mixed_scales_always_fail(a in any::<i64>(), s1 in 0u8..=9, s2 in 10u8..=18) {
        let va = Comp4::new(true, s1, a).unwrap();
        let vb = Comp4::new(true, s2, 1).unwrap();
        prop_assert_eq!(va.checked_add(&vb), Err(Comp4Error::ScaleMismatch { lhs: s1, rhs: s2 }));
    }
}
