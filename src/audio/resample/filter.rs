//! `resample/filter.rs`: windowed-sinc filter design and tap tables.
//!
//! A quality level picks a prototype length, a table oversampling factor,
//! a passband and a Kaiser window. The ratio then stretches the prototype
//! when decimating so the cutoff sits below the output Nyquist.
//!
//! Two table layouts exist:
//!
//! | Layout | Entries | Used when |
//! |---|---|---|
//! | [`TableLayout::Direct`] | `len × den` | `den ≤ oversample` |
//! | [`TableLayout::Interpolated`] | `len × oversample + 8` | otherwise |
//!
//! The direct layout stores one exact filter per output phase. The
//! interpolated layout stores the prototype at `oversample` points per tap
//! and reconstructs any phase with [`super::interpolator::TapInterpolator`].

use std::f64::consts::PI;

use tracing::debug;

use super::{ratio::Ratio, sample::Sample};
use crate::audio::constants::{
    BESSEL_MAX_TERMS, MAX_TABLE_LEN, QUALITY_MAX, SINC_EPSILON, TABLE_PADDING,
};
use crate::common::errors::{ResamplerError, Result};

/// Kaiser window shapes, named after their β.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Kaiser6,
    Kaiser8,
    Kaiser10,
    Kaiser12,
}

impl Window {
    pub fn beta(self) -> f64 {
        match self {
            Self::Kaiser6 => 6.0,
            Self::Kaiser8 => 8.0,
            Self::Kaiser10 => 10.0,
            Self::Kaiser12 => 12.0,
        }
    }

    /// Window value at `x ∈ [-1, 1]`; zero outside.
    pub fn value(self, x: f64) -> f64 {
        if x.abs() > 1.0 {
            return 0.0;
        }
        let beta = self.beta();
        bessel_i0(beta * (1.0 - x * x).sqrt()) / bessel_i0(beta)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityPreset {
    pub base_length: usize,
    pub oversample: usize,
    pub downsample_bandwidth: f64,
    pub upsample_bandwidth: f64,
    pub window: Window,
}

const fn preset(
    base_length: usize,
    oversample: usize,
    downsample_bandwidth: f64,
    upsample_bandwidth: f64,
    window: Window,
) -> QualityPreset {
    QualityPreset {
        base_length,
        oversample,
        downsample_bandwidth,
        upsample_bandwidth,
        window,
    }
}

/// Indexed by quality level.
pub const QUALITY_PRESETS: [QualityPreset; QUALITY_MAX as usize + 1] = [
    preset(8, 4, 0.830, 0.860, Window::Kaiser6),
    preset(16, 4, 0.850, 0.880, Window::Kaiser6),
    preset(32, 4, 0.882, 0.910, Window::Kaiser6),
    preset(48, 8, 0.895, 0.917, Window::Kaiser8),
    preset(64, 8, 0.921, 0.940, Window::Kaiser8),
    preset(80, 16, 0.922, 0.940, Window::Kaiser10),
    preset(96, 16, 0.940, 0.945, Window::Kaiser10),
    preset(128, 16, 0.950, 0.950, Window::Kaiser10),
    preset(160, 16, 0.960, 0.960, Window::Kaiser10),
    preset(192, 32, 0.968, 0.968, Window::Kaiser12),
    preset(256, 32, 0.975, 0.975, Window::Kaiser12),
];

/// Concrete filter parameters for one (quality, ratio) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    /// Taps per output sample; always a positive multiple of 4.
    pub length: usize,
    pub oversample: usize,
    /// Normalized to the input Nyquist.
    pub cutoff: f64,
    pub window: Window,
}

impl FilterSpec {
    pub fn design(quality: u8, ratio: Ratio) -> Result<Self> {
        let preset = QUALITY_PRESETS
            .get(quality as usize)
            .ok_or(ResamplerError::InvalidQuality(quality))?;

        let (num, den) = (ratio.num() as u64, ratio.den() as u64);
        let mut oversample = preset.oversample;
        let (length, cutoff) = if ratio.is_downsampling() {
            let stretched = (preset.base_length as u64)
                .checked_mul(num)
                .map(|l| l / den)
                .ok_or(ResamplerError::FilterBuildFailed)?;
            let length = usize::try_from(stretched & !0x3)
                .map_err(|_| ResamplerError::FilterBuildFailed)?;
            for factor in [2, 4, 8, 16] {
                if factor * den < num {
                    oversample >>= 1;
                }
            }
            (
                length.max(4),
                preset.downsample_bandwidth * den as f64 / num as f64,
            )
        } else {
            (preset.base_length, preset.upsample_bandwidth)
        };

        Ok(Self {
            length,
            oversample: oversample.max(1),
            cutoff,
            window: preset.window,
        })
    }

    /// Continuous kernel evaluated `x` input samples away from its centre.
    pub fn kernel(&self, x: f64) -> f64 {
        let half = self.length as f64 / 2.0;
        if x.abs() < SINC_EPSILON {
            return self.cutoff;
        }
        if x.abs() > half {
            return 0.0;
        }
        let arg = PI * x * self.cutoff;
        self.cutoff * arg.sin() / arg * self.window.value(x / half)
    }

    /// Cheapest table layout for these parameters at the given output denominator.
    pub fn layout_for(&self, den: u32) -> TableLayout {
        if den as usize <= self.oversample {
            TableLayout::Direct
        } else {
            TableLayout::Interpolated
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLayout {
    /// One row of `length` taps per fractional phase `0..den`.
    Direct,
    /// Prototype sampled every `1 / oversample` taps, padded on both sides.
    Interpolated,
}

/// Shared read-only tap table. Rebuilt, never patched.
#[derive(Debug, Clone)]
pub struct FilterTable<S: Sample> {
    spec: FilterSpec,
    layout: TableLayout,
    coeffs: Vec<S>,
}

impl<S: Sample> FilterTable<S> {
    pub fn build(spec: FilterSpec, ratio: Ratio) -> Result<Self> {
        let layout = spec.layout_for(ratio.den());
        let entries = match layout {
            TableLayout::Direct => spec.length.checked_mul(ratio.den() as usize),
            TableLayout::Interpolated => spec
                .length
                .checked_mul(spec.oversample)
                .and_then(|n| n.checked_add(2 * TABLE_PADDING)),
        }
        .filter(|&n| n <= MAX_TABLE_LEN)
        .ok_or(ResamplerError::FilterBuildFailed)?;

        let mut taps: Vec<f64> = Vec::new();
        taps.try_reserve_exact(entries)
            .map_err(|_| ResamplerError::FilterBuildFailed)?;

        match layout {
            TableLayout::Direct => fill_direct(&spec, ratio.den(), &mut taps),
            TableLayout::Interpolated => fill_interpolated(&spec, &mut taps),
        }

        let mut coeffs: Vec<S> = Vec::new();
        coeffs
            .try_reserve_exact(entries)
            .map_err(|_| ResamplerError::FilterBuildFailed)?;
        coeffs.extend(taps.iter().map(|&t| S::coefficient(t)));

        debug!(
            length = spec.length,
            oversample = spec.oversample,
            cutoff = spec.cutoff,
            window = ?spec.window,
            layout = ?layout,
            entries,
            "Filter table built"
        );

        Ok(Self {
            spec,
            layout,
            coeffs,
        })
    }

    pub fn len(&self) -> usize {
        self.spec.length
    }

    pub fn is_empty(&self) -> bool {
        self.spec.length == 0
    }

    pub fn layout(&self) -> TableLayout {
        self.layout
    }

    pub fn oversample(&self) -> usize {
        self.spec.oversample
    }

    pub fn coeffs(&self) -> &[S] {
        &self.coeffs
    }

    /// Taps for phase `fraction / den` in the direct layout.
    #[inline]
    pub fn row(&self, fraction: u32) -> &[S] {
        let n = self.spec.length;
        let start = fraction as usize * n;
        &self.coeffs[start..start + n]
    }
}

/// Row `i` holds the kernel sampled at `j − (len/2 − 1) − i/den`. Each row is
/// scaled to unity DC gain.
fn fill_direct(spec: &FilterSpec, den: u32, taps: &mut Vec<f64>) {
    let n = spec.length;
    let centre = (n / 2) as f64 - 1.0;
    for phase in 0..den {
        let start = taps.len();
        let offset = phase as f64 / den as f64;
        taps.extend((0..n).map(|j| spec.kernel(j as f64 - centre - offset)));
        normalize(&mut taps[start..], 1.0);
    }
}

/// Entry `i + PADDING` holds the kernel at `i / oversample − len/2` for
/// `i ∈ [−PADDING, len·oversample + PADDING)`. Scaled so the DC gain averaged
/// over all phases is one.
fn fill_interpolated(spec: &FilterSpec, taps: &mut Vec<f64>) {
    let n = spec.length as isize;
    let os = spec.oversample as isize;
    let pad = TABLE_PADDING as isize;
    let half = spec.length as f64 / 2.0;
    taps.extend(
        (-pad..n * os + pad).map(|i| spec.kernel(i as f64 / os as f64 - half)),
    );

    let core = &taps[TABLE_PADDING..TABLE_PADDING + (n * os) as usize];
    let gain: f64 = core.iter().sum::<f64>() / os as f64;
    if gain.abs() > f64::EPSILON {
        let scale = 1.0 / gain;
        taps.iter_mut().for_each(|t| *t *= scale);
    }
}

fn normalize(row: &mut [f64], target: f64) {
    let sum: f64 = row.iter().sum();
    if sum.abs() > f64::EPSILON {
        let scale = target / sum;
        row.iter_mut().for_each(|t| *t *= scale);
    }
}

/// Modified Bessel function of the first kind, order zero.
fn bessel_i0(x: f64) -> f64 {
    let quarter_x2 = x * x * 0.25;
    let mut sum = 1.0;
    let mut term = 1.0;
    for k in 1..BESSEL_MAX_TERMS {
        term *= quarter_x2 / (k * k) as f64;
        sum += term;
        if term < 1e-15 * sum {
            break;
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(num: u32, den: u32) -> Ratio {
        Ratio::new(num, den).unwrap()
    }

    #[test]
    fn length_grows_with_quality() {
        let r = ratio(147, 160);
        let lengths: Vec<usize> = (0..=QUALITY_MAX)
            .map(|q| FilterSpec::design(q, r).unwrap().length)
            .collect();
        assert!(lengths.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(lengths[0], 8);
        assert_eq!(lengths[10], 256);
    }

    #[test]
    fn downsampling_stretches_and_lowers_cutoff() {
        let spec = FilterSpec::design(4, ratio(3, 1)).unwrap();
        assert_eq!(spec.length, 192);
        assert_eq!(spec.length % 4, 0);
        assert!((spec.cutoff - 0.921 / 3.0).abs() < 1e-12);
        // 3:1 crosses the 2x threshold only.
        assert_eq!(spec.oversample, 4);
    }

    #[test]
    fn upsampling_keeps_base_length() {
        let spec = FilterSpec::design(10, ratio(1, 2)).unwrap();
        assert_eq!(spec.length, 256);
        assert_eq!(spec.cutoff, 0.975);
    }

    #[test]
    fn invalid_quality_is_rejected() {
        assert!(matches!(
            FilterSpec::design(11, ratio(1, 1)),
            Err(ResamplerError::InvalidQuality(11))
        ));
    }

    #[test]
    fn kaiser_window_shape() {
        let w = Window::Kaiser8;
        assert!((w.value(0.0) - 1.0).abs() < 1e-12);
        assert!(w.value(0.5) < 1.0);
        assert!(w.value(0.99) < 0.01);
        assert_eq!(w.value(1.5), 0.0);
        assert!((w.value(-0.3) - w.value(0.3)).abs() < 1e-12);
    }

    #[test]
    fn direct_rows_have_unity_dc() {
        let spec = FilterSpec::design(4, ratio(1, 2)).unwrap();
        let table = FilterTable::<f32>::build(spec, ratio(1, 2)).unwrap();
        assert_eq!(table.layout(), TableLayout::Direct);
        assert!(!table.is_empty());
        assert_eq!(table.coeffs().len(), table.len() * 2);
        for phase in 0..2 {
            let sum: f32 = table.row(phase).iter().sum();
            assert!((sum - 1.0).abs() < 1e-4, "phase {phase}: {sum}");
        }
    }

    #[test]
    fn interpolated_layout_for_large_denominator() {
        let r = ratio(147, 160);
        let spec = FilterSpec::design(4, r).unwrap();
        let table = FilterTable::<f32>::build(spec, r).unwrap();
        assert_eq!(table.layout(), TableLayout::Interpolated);
        assert_eq!(table.coeffs().len(), 64 * 8 + 8);
        // Centre of the prototype is the peak.
        let centre = TABLE_PADDING + 32 * 8;
        let peak = table.coeffs()[centre];
        assert!(table.coeffs().iter().all(|&c| c <= peak));
    }

    #[test]
    fn fixed_point_table_is_quantised() {
        let r = ratio(1, 1);
        let spec = FilterSpec::design(2, r).unwrap();
        let table = FilterTable::<i16>::build(spec, r).unwrap();
        let sum: i32 = table.row(0).iter().map(|&c| c as i32).sum();
        assert!((sum - 32_768).abs() < 32, "{sum}");
    }

    #[test]
    fn oversized_table_fails_cleanly() {
        let r = ratio(4_000_000, 1);
        let spec = FilterSpec::design(10, r).unwrap();
        assert!(matches!(
            FilterTable::<f32>::build(spec, r),
            Err(ResamplerError::FilterBuildFailed)
        ));
    }

    #[test]
    fn bessel_matches_known_value() {
        // I0(1) = 1.2660658777520082
        assert!((bessel_i0(1.0) - 1.266_065_877_752_008).abs() < 1e-12);
    }
}
