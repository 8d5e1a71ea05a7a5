//! `resample/interpolator.rs`: cubic reconstruction of taps between table
//! entries.
//!
//! For an output phase `fraction / den` the prototype position of tap `j`
//! falls between two table entries. Rather than interpolating each tap before
//! the multiply, the convolution runs four times against the four nearest
//! entries and the partial sums are blended once with Lagrange weights.

use super::sample::Sample;
use crate::audio::constants::TABLE_PADDING;

/// Third-order Lagrange weights for a point at `frac ∈ [0, 1)` measured back
/// from the third of four evenly spaced entries.
///
/// `frac = 0` selects entry 2, `frac → 1` approaches entry 1.
#[inline]
pub fn cubic_weights(frac: f64) -> [f64; 4] {
    let f2 = frac * frac;
    let f3 = f2 * frac;
    let w0 = (f3 - frac) / 6.0;
    let w1 = frac + 0.5 * f2 - 0.5 * f3;
    let w3 = -frac / 3.0 + 0.5 * f2 - f3 / 6.0;
    [w0, w1, 1.0 - w0 - w1 - w3, w3]
}

/// Tap lookup for one output phase over an interpolated table.
pub struct TapInterpolator<'a, S: Sample> {
    table: &'a [S],
    oversample: usize,
    /// Whole table steps the phase sits below each tap.
    offset: usize,
    weights: [f64; 4],
}

impl<'a, S: Sample> TapInterpolator<'a, S> {
    /// `fraction / den` is the phase of the output sample within one input
    /// sample period.
    pub fn new(table: &'a [S], oversample: usize, fraction: u32, den: u32) -> Self {
        let scaled = fraction as u64 * oversample as u64;
        let offset = (scaled / den as u64) as usize;
        let frac = (scaled % den as u64) as f64 / den as f64;
        Self {
            table,
            oversample,
            offset,
            weights: cubic_weights(frac),
        }
    }

    /// Index of the entry paired with `accum[2]` for tap `j`.
    #[inline]
    fn base(&self, j: usize) -> isize {
        (TABLE_PADDING + (j + 1) * self.oversample) as isize - self.offset as isize
    }

    /// Out-of-range reads clamp to the nearest valid entry.
    #[inline]
    fn at(&self, index: isize) -> S {
        let last = self.table.len().saturating_sub(1) as isize;
        self.table[index.clamp(0, last) as usize]
    }

    /// Add `sample`'s contribution at tap `j` to the four partial sums.
    #[inline]
    pub fn accumulate(&self, accum: &mut [S::Acc; 4], j: usize, sample: S) {
        let base = self.base(j);
        accum[0] = S::mac(accum[0], sample, self.at(base - 2));
        accum[1] = S::mac(accum[1], sample, self.at(base - 1));
        accum[2] = S::mac(accum[2], sample, self.at(base));
        accum[3] = S::mac(accum[3], sample, self.at(base + 1));
    }

    #[inline]
    pub fn finish(&self, accum: [S::Acc; 4]) -> S {
        S::combine(self.weights, accum)
    }

    /// Reconstructed value of tap `j` on the coefficient scale.
    pub fn tap(&self, j: usize) -> f64 {
        let base = self.base(j);
        (0..4)
            .map(|k| self.weights[k] * self.at(base - 2 + k as isize).to_f64())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::resample::{
        filter::{FilterSpec, FilterTable, TableLayout},
        ratio::Ratio,
    };

    #[test]
    fn weights_sum_to_one() {
        for i in 0..10 {
            let w = cubic_weights(i as f64 / 10.0);
            assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn weights_hit_grid_points() {
        assert_eq!(cubic_weights(0.0), [0.0, 0.0, 1.0, 0.0]);
        let w = cubic_weights(1.0);
        assert!(w[0].abs() < 1e-12 && (w[1] - 1.0).abs() < 1e-12);
        assert!(w[2].abs() < 1e-12 && w[3].abs() < 1e-12);
    }

    #[test]
    fn cubic_is_exact_for_cubics() {
        // Entries at positions -2, -1, 0, 1 (relative), target at -frac.
        let poly = |x: f64| 0.3 * x * x * x - x * x + 2.0 * x + 0.5;
        let frac = 0.37;
        let w = cubic_weights(frac);
        let got: f64 = [-2.0, -1.0, 0.0, 1.0]
            .iter()
            .zip(w)
            .map(|(&x, wk)| wk * poly(x))
            .sum();
        assert!((got - poly(-frac)).abs() < 1e-12);
    }

    #[test]
    fn reconstructed_taps_track_the_kernel() {
        let r = Ratio::new(147, 160).unwrap();
        let spec = FilterSpec::design(6, r).unwrap();
        let table = FilterTable::<f32>::build(spec, r).unwrap();
        assert_eq!(table.layout(), TableLayout::Interpolated);

        let scale = table.coeffs()[TABLE_PADDING + spec.length / 2 * spec.oversample] as f64
            / spec.kernel(0.0);
        let n = spec.length;
        for fraction in [0u32, 1, 53, 80, 159] {
            let interp = TapInterpolator::new(table.coeffs(), spec.oversample, fraction, 160);
            for j in [0, n / 4, n / 2 - 1, n / 2, n - 1] {
                let x = j as f64 - (n / 2) as f64 + 1.0 - fraction as f64 / 160.0;
                let expected = spec.kernel(x) * scale;
                assert!(
                    (interp.tap(j) - expected).abs() < 2e-3,
                    "fraction {fraction} tap {j}: {} vs {expected}",
                    interp.tap(j)
                );
            }
        }
    }

    #[test]
    fn edge_reads_clamp() {
        let table = [1.0f32, 2.0, 3.0];
        let interp = TapInterpolator::new(&table, 1, 0, 1);
        assert_eq!(interp.at(-5), 1.0);
        assert_eq!(interp.at(10), 3.0);
    }
}
