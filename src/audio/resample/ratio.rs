//! `resample/ratio.rs`: exact rational rate ratio.
//!
//! The ratio is kept as `input : output` in lowest terms. Advancing through
//! the input is done in fixed point with base `den`: every output sample moves
//! the cursor by `num / den` whole samples plus `num % den` fractional units.

use crate::common::errors::{ResamplerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ratio {
    num: u32,
    den: u32,
}

/// Per-output advance of the input cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Whole input samples.
    pub integer: usize,
    /// Fractional part, in units of `1 / den`.
    pub fraction: u32,
}

impl Ratio {
    /// `num` is the input side, `den` the output side (e.g. 441 : 480 for
    /// 44.1 kHz to 48 kHz). Both must be non-zero.
    pub fn new(num: u32, den: u32) -> Result<Self> {
        if num == 0 || den == 0 {
            return Err(ResamplerError::InvalidRatio { num, den });
        }
        let g = gcd(num, den);
        Ok(Self {
            num: num / g,
            den: den / g,
        })
    }

    pub fn from_rates(in_rate: u32, out_rate: u32) -> Result<Self> {
        Self::new(in_rate, out_rate)
    }

    pub fn num(self) -> u32 {
        self.num
    }

    pub fn den(self) -> u32 {
        self.den
    }

    pub fn parts(self) -> (u32, u32) {
        (self.num, self.den)
    }

    pub fn step(self) -> Step {
        Step {
            integer: (self.num / self.den) as usize,
            fraction: self.num % self.den,
        }
    }

    /// More input samples than output samples.
    pub fn is_downsampling(self) -> bool {
        self.num > self.den
    }

    /// Map a fractional cursor expressed against `old_den` onto this ratio's
    /// denominator.
    pub fn rescale_fraction(self, fraction: u32, old_den: u32) -> u32 {
        if old_den == 0 {
            return 0;
        }
        let scaled = fraction as u64 * self.den as u64 / old_den as u64;
        scaled.min(self.den as u64 - 1) as u32
    }

    /// `ceil(input_len * den / num)`: how many outputs `input_len` inputs are
    /// worth at steady state.
    pub fn output_len_for(self, input_len: usize) -> usize {
        let num = self.num as u128;
        ((input_len as u128 * self.den as u128 + num - 1) / num) as usize
    }
}

impl Step {
    /// Advance `(position, fraction)` by one step, carrying into the integer
    /// part when the fraction wraps past `den`.
    #[inline]
    pub fn advance(self, position: &mut usize, fraction: &mut u32, den: u32) {
        *position += self.integer;
        // Both terms may be close to u32::MAX.
        let mut sum = *fraction as u64 + self.fraction as u64;
        if sum >= den as u64 {
            sum -= den as u64;
            *position += 1;
        }
        *fraction = sum as u32;
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduces_to_lowest_terms() {
        let r = Ratio::new(441_000, 480_000).unwrap();
        assert_eq!(r.parts(), (147, 160));
        assert_eq!(Ratio::from_rates(48_000, 16_000).unwrap().parts(), (3, 1));
    }

    #[test]
    fn rejects_zero() {
        assert!(matches!(
            Ratio::new(0, 10),
            Err(ResamplerError::InvalidRatio { .. })
        ));
        assert!(Ratio::from_rates(44_100, 0).is_err());
    }

    #[test]
    fn step_is_exact() {
        let r = Ratio::from_rates(44_100, 48_000).unwrap();
        let step = r.step();
        assert_eq!(step.integer, 0);
        assert_eq!(step.fraction, 147);

        // 160 outputs consume exactly 147 inputs.
        let (mut pos, mut frac) = (0usize, 0u32);
        for _ in 0..160 {
            step.advance(&mut pos, &mut frac, r.den());
        }
        assert_eq!((pos, frac), (147, 0));
    }

    #[test]
    fn step_carries_with_huge_denominator() {
        let r = Ratio::new(u32::MAX - 1, u32::MAX).unwrap();
        let step = r.step();
        assert_eq!(step.integer, 0);

        let (mut pos, mut frac) = (0usize, u32::MAX - 1);
        step.advance(&mut pos, &mut frac, r.den());
        assert_eq!((pos, frac), (1, u32::MAX - 2));
    }

    #[test]
    fn rescale_clamps_into_range() {
        let r = Ratio::new(3, 4).unwrap();
        assert_eq!(r.rescale_fraction(5, 10), 2);
        assert_eq!(r.rescale_fraction(9, 9), 3);
    }

    #[test]
    fn output_len_rounds_up() {
        let r = Ratio::from_rates(44_100, 48_000).unwrap();
        assert_eq!(r.output_len_for(441), 480);
        assert_eq!(r.output_len_for(1), 2);
    }
}
