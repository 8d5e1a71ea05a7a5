use serde::{Deserialize, Serialize};

use crate::audio::constants::QUALITY_DEFAULT;
use crate::audio::resample::{FixedResampler, FloatResampler, Resampler, Sample};
use crate::common::errors::Result;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Representation {
    #[default]
    Float,
    Fixed,
}

/// `[resampler]` section. Strides are left at 1: the binary only feeds
/// interleaved frames, so library callers that need strided buffers set
/// them on the built [`Resampler`] directly.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct ResamplerConfig {
    pub channels: usize,
    pub in_rate: u32,
    pub out_rate: u32,
    /// Exact `[num, den]` ratio when the rates are not whole numbers of Hz.
    pub ratio: Option<[u32; 2]>,
    pub quality: u8,
    pub skip_zeros: bool,
    pub representation: Representation,
}

impl Default for ResamplerConfig {
    fn default() -> Self {
        Self {
            channels: 2,
            in_rate: 44_100,
            out_rate: 48_000,
            ratio: None,
            quality: QUALITY_DEFAULT,
            skip_zeros: false,
            representation: Representation::Float,
        }
    }
}

impl ResamplerConfig {
    pub fn build<S: Sample>(&self) -> Result<Resampler<S>> {
        let [num, den] = self.ratio.unwrap_or([self.in_rate, self.out_rate]);
        let mut resampler = Resampler::new_fractional(
            self.channels,
            num,
            den,
            self.in_rate,
            self.out_rate,
            self.quality,
        )?;
        if self.skip_zeros {
            resampler.skip_zeros();
        }
        Ok(resampler)
    }

    pub fn build_float(&self) -> Result<FloatResampler> {
        self.build()
    }

    pub fn build_fixed(&self) -> Result<FixedResampler> {
        self.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::errors::ResamplerError;

    #[test]
    fn parses_partial_section() {
        let cfg: ResamplerConfig = toml::from_str(
            r#"
            channels = 1
            in_rate = 22050
            out_rate = 16000
            representation = "fixed"
            skip_zeros = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.representation, Representation::Fixed);
        assert_eq!(cfg.quality, QUALITY_DEFAULT);

        let r = cfg.build_fixed().unwrap();
        assert_eq!(r.ratio(), (441, 320));
        assert!(r.is_primed());
    }

    #[test]
    fn explicit_ratio_wins_over_rates() {
        let cfg = ResamplerConfig {
            ratio: Some([441_000, 480_000]),
            ..Default::default()
        };
        let r = cfg.build_float().unwrap();
        assert_eq!(r.ratio(), (147, 160));
        assert_eq!(r.rate(), (44_100, 48_000));
    }

    #[test]
    fn bad_values_are_reported() {
        let cfg = ResamplerConfig {
            quality: 12,
            ..Default::default()
        };
        assert_eq!(cfg.build_float().err(), Some(ResamplerError::InvalidQuality(12)));

        let cfg = ResamplerConfig {
            channels: 0,
            ..Default::default()
        };
        assert_eq!(cfg.build_float().err(), Some(ResamplerError::InvalidChannelCount));
    }

    #[test]
    fn stride_keys_are_rejected() {
        let parsed: std::result::Result<ResamplerConfig, _> = toml::from_str("input_stride = 2");
        assert!(parsed.is_err());

        let r = ResamplerConfig::default().build_float().unwrap();
        assert_eq!((r.input_stride(), r.output_stride()), (1, 1));
    }

    #[test]
    fn unknown_representation_is_rejected() {
        let parsed: std::result::Result<ResamplerConfig, _> =
            toml::from_str(r#"representation = "double""#);
        assert!(parsed.is_err());
    }
}
