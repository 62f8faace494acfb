//! Property-based tests for fmsynth-core arithmetic and CC scaling.

use fmsynth_core::{CcScale, Fp32, ParamValue};
use proptest::prelude::*;

fn unit() -> impl Strategy<Value = Fp32> {
    (-(1i32 << 16)..=(1i32 << 16)).prop_map(Fp32::from_raw)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Chained products of unit-range values never leave the unit range.
    #[test]
    fn mul_chain_stays_in_unit_range(values in prop::collection::vec(unit(), 1..32)) {
        let mut acc = Fp32::ONE;
        for v in values {
            acc = acc.mul(v);
            prop_assert!(
                acc.abs() <= Fp32::ONE,
                "product {:?} escaped unit range",
                acc
            );
        }
    }

    /// Multiplying by one is exact.
    #[test]
    fn mul_by_one_is_identity(raw in any::<i32>()) {
        let v = Fp32::from_raw(raw);
        prop_assert_eq!(v.mul(Fp32::ONE), v);
    }

    /// `to_i16` is monotone and agrees with the in-range formula.
    #[test]
    fn to_i16_monotone(a in any::<i32>(), b in any::<i32>()) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(Fp32::from_raw(lo).to_i16() <= Fp32::from_raw(hi).to_i16());

        if (-(1 << 16)..(1 << 16)).contains(&a) {
            prop_assert_eq!(i32::from(Fp32::from_raw(a).to_i16()), a >> 1);
        }
    }

    /// Float conversion is within half a step.
    #[test]
    fn from_f64_within_half_step(f in -1000.0f64..1000.0) {
        let err = (Fp32::from_f64(f).to_f64() - f).abs();
        prop_assert!(err <= 0.5 / 65536.0 + f64::EPSILON * 1000.0);
    }

    /// Ranged CC conversions land inside their declared range.
    #[test]
    fn ranged_cc_stays_in_range(min in 0u16..30000, width in 0u16..30000, val in 0u8..=255) {
        let max = min + width;
        match (CcScale::Uint16 { min, max }).convert(val) {
            ParamValue::Uint16(v) => prop_assert!(v >= min && v <= max, "{} not in {}..={}", v, min, max),
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }

    /// Byte CC ranges with a non-trivial span stay inside their bounds.
    #[test]
    fn byte_cc_stays_in_range(min in 0u8..100, width in 0u8..100, val in 0u8..=127) {
        let max = min + width;
        prop_assume!(!(min == 0 && (max == 127 || max == 255)));
        match (CcScale::Byte { min, max }).convert(val) {
            ParamValue::Byte(v) => prop_assert!(v >= min && v <= max),
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }
}
