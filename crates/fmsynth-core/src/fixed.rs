//! 16.16 fixed-point sample type.
//!
//! Every audio-rate value in the engine (samples, frequencies, envelope
//! levels, modulation indices) is an [`Fp32`]: the upper 16 bits hold the
//! integer part and the lower 16 bits the fraction. Full-scale amplitude is
//! `1 << 16`, so the type carries one extra bit of amplitude headroom over a
//! 16-bit PCM sample. Sums may exceed full scale internally; they are only
//! clipped on the way out in [`Fp32::to_i16`].
//!
//! ```rust
//! use fmsynth_core::Fp32;
//!
//! let half = Fp32::from_f64(0.5);
//! assert_eq!(half.mul(Fp32::ONE), half);
//! assert_eq!(Fp32::ONE.to_i16(), i16::MAX);
//! ```

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Neg, Shl, Shr, Sub, SubAssign};

/// Number of fractional bits.
pub const FRAC_BITS: u32 = 16;

/// A 32-bit fixed-point value with 16 fractional bits.
///
/// Addition and subtraction saturate at the `i32` bounds instead of wrapping.
/// Multiplication goes through an `i64` intermediate. Neither clamps to the
/// ±1.0 amplitude range; that happens once, in [`to_i16`](Self::to_i16).
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Fp32(i32);

impl Fp32 {
    /// Zero.
    pub const ZERO: Self = Self(0);
    /// Full-scale amplitude, 1.0.
    pub const ONE: Self = Self(1 << FRAC_BITS);
    /// Negative full-scale amplitude, -1.0.
    pub const MINUS_ONE: Self = Self(-(1 << FRAC_BITS));

    /// Wrap a raw 16.16 bit pattern.
    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// The raw 16.16 bit pattern.
    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// An integer value, e.g. a frequency in whole Hz.
    #[inline]
    pub const fn from_int(value: i16) -> Self {
        Self((value as i32) << FRAC_BITS)
    }

    /// Convert from floating point, rounding to the nearest step.
    ///
    /// Values beyond the representable range saturate.
    pub fn from_f64(value: f64) -> Self {
        let scaled = libm::round(value * f64::from(1u32 << FRAC_BITS));
        if scaled >= f64::from(i32::MAX) {
            Self(i32::MAX)
        } else if scaled <= f64::from(i32::MIN) {
            Self(i32::MIN)
        } else {
            Self(scaled as i32)
        }
    }

    /// Convert from `f32`, rounding to the nearest step.
    pub fn from_f32(value: f32) -> Self {
        Self::from_f64(f64::from(value))
    }

    /// Convert to floating point.
    #[inline]
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / f64::from(1u32 << FRAC_BITS)
    }

    /// Convert to `f32`.
    #[inline]
    pub fn to_f32(self) -> f32 {
        self.to_f64() as f32
    }

    /// Fixed-point product, `(a * b) >> 16` computed in 64 bits.
    ///
    /// The result saturates at the `i32` bounds if the true product does not
    /// fit.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn mul(self, rhs: Self) -> Self {
        let wide = (i64::from(self.0) * i64::from(rhs.0)) >> FRAC_BITS;
        Self(wide.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
    }

    /// Convert to a 16-bit PCM sample.
    ///
    /// Hard-clips to `[-1.0, 1.0]`, drops the headroom bit, and saturates so
    /// that `+1.0` becomes `i16::MAX` rather than wrapping.
    #[inline]
    pub fn to_i16(self) -> i16 {
        let clipped = self.0.clamp(Self::MINUS_ONE.0, Self::ONE.0) >> 1;
        clipped.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
    }

    /// Absolute value, saturating for `i32::MIN`.
    #[inline]
    pub fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    /// Returns `true` if the value is exactly zero.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for Fp32 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Fp32 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Fp32 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Fp32 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Fp32 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl Shr<u32> for Fp32 {
    type Output = Self;

    /// Arithmetic shift, i.e. division by a power of two rounding toward -inf.
    #[inline]
    fn shr(self, rhs: u32) -> Self {
        Self(self.0 >> rhs)
    }
}

impl Shl<u32> for Fp32 {
    type Output = Self;

    #[inline]
    fn shl(self, rhs: u32) -> Self {
        Self(self.0 << rhs)
    }
}

impl Sum for Fp32 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc + x)
    }
}

impl fmt::Debug for Fp32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fp32({:#x} = {:.5})", self.0, self.to_f64())
    }
}

impl fmt::Display for Fp32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.to_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_is_full_scale() {
        assert_eq!(Fp32::ONE.raw(), 65536);
        assert_eq!(Fp32::from_f64(1.0), Fp32::ONE);
        assert_eq!(Fp32::from_f64(-1.0), Fp32::MINUS_ONE);
    }

    #[test]
    fn test_from_f64_rounds() {
        // 0.25 / 65536 is exactly a quarter step: rounds down
        assert_eq!(Fp32::from_f64(0.25 / 65536.0).raw(), 0);
        // 0.75 of a step rounds up
        assert_eq!(Fp32::from_f64(0.75 / 65536.0).raw(), 1);
        assert_eq!(Fp32::from_f64(440.0).raw(), 440 << 16);
    }

    #[test]
    fn test_from_f64_saturates() {
        assert_eq!(Fp32::from_f64(1.0e9).raw(), i32::MAX);
        assert_eq!(Fp32::from_f64(-1.0e9).raw(), i32::MIN);
    }

    #[test]
    fn test_mul() {
        let half = Fp32::from_f64(0.5);
        let quarter = Fp32::from_f64(0.25);
        assert_eq!(half.mul(half), quarter);
        assert_eq!(Fp32::ONE.mul(Fp32::ONE), Fp32::ONE);
        assert_eq!(Fp32::MINUS_ONE.mul(half), Fp32::from_f64(-0.5));
        // 440 Hz times ratio 2.0 needs the wide intermediate
        let freq = Fp32::from_int(440);
        assert_eq!(freq.mul(Fp32::from_int(2)), Fp32::from_int(880));
    }

    #[test]
    fn test_mul_saturates_instead_of_wrapping() {
        let big = Fp32::from_int(30000);
        assert_eq!(big.mul(big).raw(), i32::MAX);
        assert_eq!(big.mul(-big).raw(), i32::MIN);
    }

    #[test]
    fn test_to_i16_clips() {
        assert_eq!(Fp32::ZERO.to_i16(), 0);
        assert_eq!(Fp32::ONE.to_i16(), i16::MAX);
        assert_eq!(Fp32::MINUS_ONE.to_i16(), i16::MIN);
        assert_eq!(Fp32::from_f64(0.5).to_i16(), 16384);
        assert_eq!(Fp32::from_int(3).to_i16(), i16::MAX);
        assert_eq!(Fp32::from_int(-3).to_i16(), i16::MIN);
        assert_eq!(Fp32::from_raw(i32::MAX).to_i16(), i16::MAX);
        assert_eq!(Fp32::from_raw(i32::MIN).to_i16(), i16::MIN);
    }

    #[test]
    fn test_add_saturates() {
        let max = Fp32::from_raw(i32::MAX);
        assert_eq!(max + Fp32::ONE, max);
        let min = Fp32::from_raw(i32::MIN);
        assert_eq!(min - Fp32::ONE, min);
        assert_eq!(-min, max);
    }

    #[test]
    fn test_shift_is_arithmetic() {
        assert_eq!(Fp32::MINUS_ONE >> 1, Fp32::from_f64(-0.5));
        assert_eq!(Fp32::ONE >> 1, Fp32::from_f64(0.5));
        assert_eq!(Fp32::from_f64(0.5) << 1, Fp32::ONE);
    }

    #[test]
    fn test_sum() {
        let total: Fp32 = [Fp32::from_f64(0.25); 4].into_iter().sum();
        assert_eq!(total, Fp32::ONE);
    }

    #[test]
    fn test_f32_roundtrip() {
        let v = Fp32::from_f32(0.125);
        assert_eq!(v.to_f32(), 0.125);
    }
}
