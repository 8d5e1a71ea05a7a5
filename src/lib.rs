pub mod audio;
pub mod common;
pub mod configs;

pub use audio::resample::{FixedResampler, FloatResampler, Processed, Resampler};
pub use common::errors::{ResamplerError, Result};
