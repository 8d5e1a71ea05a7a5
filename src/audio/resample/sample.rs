//! Numeric representations the engine is instantiated for.
//!
//! The same polyphase algorithm runs over `f32` (floating point) and `i16`
//! (Q15 fixed point). Coefficients are stored in the sample type itself and
//! convolution sums go into a wider accumulator.

use std::fmt::Debug;
use std::ops::Add;

use crate::audio::constants::{Q15_HALF, Q15_ONE};

pub trait Sample: Copy + Default + Debug + PartialEq + Send + Sync + 'static {
    /// Convolution accumulator.
    type Acc: Copy + Default + Add<Output = Self::Acc>;

    /// Quantise a designed filter coefficient.
    fn coefficient(value: f64) -> Self;

    /// `acc + sample * coefficient`.
    fn mac(acc: Self::Acc, sample: Self, coefficient: Self) -> Self::Acc;

    /// Turn a direct-table convolution sum into an output sample.
    fn from_acc(acc: Self::Acc) -> Self;

    /// Blend the four partial sums of an interpolated convolution with the
    /// cubic weights.
    fn combine(weights: [f64; 4], accum: [Self::Acc; 4]) -> Self;

    /// Value on the same scale as [`Sample::coefficient`]'s input.
    fn to_f64(self) -> f64;
}

impl Sample for f32 {
    type Acc = f64;

    #[inline]
    fn coefficient(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn mac(acc: f64, sample: f32, coefficient: f32) -> f64 {
        acc + sample as f64 * coefficient as f64
    }

    #[inline]
    fn from_acc(acc: f64) -> Self {
        acc as f32
    }

    #[inline]
    fn combine(weights: [f64; 4], accum: [f64; 4]) -> Self {
        (weights[0] * accum[0] + weights[1] * accum[1] + weights[2] * accum[2] + weights[3] * accum[3])
            as f32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
}

/// Q15: coefficients are scaled by 2^15, sums are 30 fractional bits wide
/// before the final shift.
impl Sample for i16 {
    type Acc = i64;

    #[inline]
    fn coefficient(value: f64) -> Self {
        (value * Q15_ONE as f64)
            .round()
            .clamp(i16::MIN as f64, i16::MAX as f64) as i16
    }

    #[inline]
    fn mac(acc: i64, sample: i16, coefficient: i16) -> i64 {
        acc + sample as i64 * coefficient as i64
    }

    #[inline]
    fn from_acc(acc: i64) -> Self {
        saturate((acc + Q15_HALF) >> 15)
    }

    #[inline]
    fn combine(weights: [f64; 4], accum: [i64; 4]) -> Self {
        let w0 = (weights[0] * Q15_ONE as f64).round() as i64;
        let w1 = (weights[1] * Q15_ONE as f64).round() as i64;
        let w3 = (weights[3] * Q15_ONE as f64).round() as i64;
        // Weights always sum to exactly one in Q15.
        let w2 = Q15_ONE - w0 - w1 - w3;
        let sum = w0 * accum[0] + w1 * accum[1] + w2 * accum[2] + w3 * accum[3];
        saturate((sum + (1 << 29)) >> 30)
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64 / Q15_ONE as f64
    }
}

#[inline]
fn saturate(value: i64) -> i16 {
    value.clamp(i16::MIN as i64, i16::MAX as i64) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_coefficient_is_q15() {
        assert_eq!(i16::coefficient(0.5), 16_384);
        assert_eq!(i16::coefficient(-1.0), i16::MIN);
        assert_eq!(i16::coefficient(2.0), i16::MAX);
    }

    #[test]
    fn fixed_unity_gain_roundtrip() {
        let half = i16::coefficient(0.5);
        let acc = i16::mac(0, 1_000, half);
        assert_eq!(i16::from_acc(acc), 500);
    }

    #[test]
    fn fixed_combine_saturates() {
        let big = i16::MAX as i64 * Q15_ONE * 2;
        assert_eq!(i16::combine([0.0, 0.0, 1.0, 0.0], [0, 0, big, 0]), i16::MAX);
    }

    #[test]
    fn float_combine_weights() {
        let out = f32::combine([0.25, 0.25, 0.25, 0.25], [1.0, 2.0, 3.0, 4.0]);
        assert!((out - 2.5).abs() < 1e-6);
    }
}
